//! Pass 1: resolve and lay out type declarations.
//!
//! `typedef` and `struct` declarations may appear anywhere and refer to each
//! other in any order. They are collected and removed from the tree (they
//! have no runtime representation), then resolved together.

use flint_ir::pass::rewrite_root;
use flint_ir::{NodeId, NodeKind, Pass, Rewrite, Tree};
use flint_types::{resolve_declarations, TypeDecl, TypeDeclKind};

use crate::{Compilation, CompileError};

#[derive(Default)]
struct CollectDecls {
    decls: Vec<TypeDecl>,
}

impl Pass for CollectDecls {
    type Error = CompileError;

    fn hook(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let span = tree.span(id);
        let kind = match tree.kind(id) {
            NodeKind::TypeAlias { name, ty } => (name.clone(), TypeDeclKind::Alias(ty.clone())),
            NodeKind::StructDecl { name, fields } => {
                (name.clone(), TypeDeclKind::Struct(fields.clone()))
            }
            _ => return Ok(Rewrite::Keep),
        };
        self.decls.push(TypeDecl {
            name: kind.0,
            kind: kind.1,
            span,
        });
        Ok(Rewrite::Delete)
    }
}

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(cx: &mut Compilation, tree: &mut Tree, root: NodeId) -> Result<NodeId, CompileError> {
    let mut pass = CollectDecls::default();
    let root = rewrite_root(&mut pass, tree, root)?;
    tracing::debug!(count = pass.decls.len(), "type declarations");
    resolve_declarations(&mut cx.pool, &pass.decls)?;
    Ok(root)
}
