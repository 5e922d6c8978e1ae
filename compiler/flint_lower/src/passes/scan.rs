//! Pass 2: build scopes and frames, and declare every variable.
//!
//! Declarations are collected before any expression is checked, so uses may
//! precede declarations within a scope. Address-of operators on plain names
//! are only recorded while walking; the named variables are moved to the
//! stack once the whole tree has been seen.

use flint_ir::pass::rewrite_root;
use flint_ir::{NodeId, NodeKind, Pass, Rewrite, Span, Tree, TypeExpr, TypeId};
use flint_types::Resolver;
use rustc_hash::FxHashMap;

use crate::scope::{NewVariable, ScopeId, VarKind};
use crate::{Compilation, CompileError};

struct Scan<'a> {
    cx: &'a mut Compilation,
    /// Open scopes and the nodes that opened them.
    open: Vec<(NodeId, ScopeId)>,
    /// Function bodies that share their function's root scope.
    shared: FxHashMap<NodeId, ScopeId>,
    promotions: Vec<(ScopeId, String, Span)>,
}

impl Scan<'_> {
    fn current(&self) -> ScopeId {
        self.open
            .last()
            .map_or_else(|| self.cx.scopes.root_scope(), |&(_, scope)| scope)
    }

    fn open_scope(&mut self, node: NodeId, scope: ScopeId) {
        self.cx.scope_of.insert(node, scope);
        self.open.push((node, scope));
    }

    fn reflect(&mut self, expr: Option<&TypeExpr>, span: Span) -> Result<TypeId, CompileError> {
        match expr {
            Some(expr) => Ok(Resolver::new(&mut self.cx.pool).reflect(expr, span)?),
            None => Ok(TypeId::DYN),
        }
    }

    fn by_value_check(&self, function: &str, ty: TypeId, span: Span) -> Result<(), CompileError> {
        if self.cx.pool.is_aggregate(ty) {
            return Err(CompileError::AggregateByValue {
                function: function.to_owned(),
                ty: self.cx.pool.display(ty),
                span,
            });
        }
        Ok(())
    }

    fn declare_function(&mut self, tree: &Tree, id: NodeId) -> Result<(), CompileError> {
        let NodeKind::FunctionDecl {
            name,
            params,
            ret,
            body,
        } = tree.kind(id)
        else {
            return Ok(());
        };
        let span = tree.span(id);

        let mut param_types = Vec::with_capacity(params.len());
        for param in params {
            let ty = self.reflect(param.ty.as_ref(), param.span)?;
            self.by_value_check(name, ty, param.span)?;
            param_types.push(ty);
        }
        let ret = self.reflect(ret.as_ref(), span)?;
        self.by_value_check(name, ret, span)?;
        let arrow = self.cx.pool.arrow(&param_types, ret);

        let enclosing = self.current();
        let var = self
            .cx
            .scopes
            .add_variable(enclosing, NewVariable::new(name.as_str(), arrow, VarKind::Function, span))?;
        self.cx.var_of.insert(id, var);

        let scope = self.cx.scopes.new_frame(enclosing, name, ret, span);
        for (param, ty) in params.iter().zip(param_types) {
            self.cx.scopes.add_variable(
                scope,
                NewVariable::new(param.name.as_str(), ty, VarKind::Param, param.span),
            )?;
        }
        self.open_scope(id, scope);
        self.shared.insert(*body, scope);
        Ok(())
    }

    fn declare_local(&mut self, tree: &Tree, id: NodeId) -> Result<(), CompileError> {
        let NodeKind::VarDeclarator { name, ty, .. } = tree.kind(id) else {
            return Ok(());
        };
        let span = tree.span(id);
        let ty = self.reflect(ty.as_ref(), span)?;
        let scope = self.current();
        let var = self
            .cx
            .scopes
            .add_variable(scope, NewVariable::new(name.as_str(), ty, VarKind::Local, span))?;
        if self.cx.pool.is_aggregate(ty) {
            self.cx.scopes.promote(var);
        }
        self.cx.var_of.insert(id, var);
        Ok(())
    }
}

impl Pass for Scan<'_> {
    type Error = CompileError;

    fn enter(&mut self, tree: &mut Tree, id: NodeId) -> Result<(), CompileError> {
        match tree.kind(id) {
            NodeKind::Program { .. } => {
                let root = self.cx.scopes.root_scope();
                self.open_scope(id, root);
            }
            NodeKind::FunctionDecl { .. } => self.declare_function(tree, id)?,
            NodeKind::Block { .. } => {
                let scope = match self.shared.remove(&id) {
                    Some(scope) => scope,
                    None => {
                        let parent = self.current();
                        self.cx.scopes.new_scope(parent)
                    }
                };
                self.open_scope(id, scope);
            }
            NodeKind::For { .. } | NodeKind::While { .. } | NodeKind::DoWhile { .. } => {
                let parent = self.current();
                let scope = self.cx.scopes.new_scope(parent);
                self.open_scope(id, scope);
            }
            NodeKind::VarDeclarator { .. } => self.declare_local(tree, id)?,
            NodeKind::Extern { names } => {
                let span = tree.span(id);
                let scope = self.current();
                for name in names {
                    self.cx.scopes.add_variable(
                        scope,
                        NewVariable::new(name.as_str(), TypeId::DYN, VarKind::External, span),
                    )?;
                }
            }
            NodeKind::AddressOf { arg } => {
                if let Some(name) = tree.ident_name(*arg) {
                    let scope = self.current();
                    self.promotions.push((scope, name.to_owned(), tree.span(id)));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn hook(&mut self, _tree: &mut Tree, _id: NodeId) -> Result<Rewrite, CompileError> {
        Ok(Rewrite::Keep)
    }

    fn leave(&mut self, _tree: &mut Tree, id: NodeId) {
        if self.open.last().is_some_and(|&(node, _)| node == id) {
            self.open.pop();
        }
    }
}

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(cx: &mut Compilation, tree: &mut Tree, root: NodeId) -> Result<NodeId, CompileError> {
    let mut pass = Scan {
        cx,
        open: Vec::new(),
        shared: FxHashMap::default(),
        promotions: Vec::new(),
    };
    let root = rewrite_root(&mut pass, tree, root)?;

    let Scan { cx, promotions, .. } = pass;
    for (scope, name, span) in promotions {
        let Some(var) = cx.scopes.get_variable(scope, &name, false) else {
            continue;
        };
        let (kind, ty) = {
            let variable = cx.scopes.variable(var);
            (variable.kind, variable.ty)
        };
        match kind {
            VarKind::Function | VarKind::External => {
                return Err(CompileError::access(
                    format!("cannot take the address of `{name}`"),
                    span,
                ));
            }
            VarKind::Local | VarKind::Param | VarKind::Temp if cx.pool.is_dyn(ty) => {
                return Err(CompileError::access(
                    format!("cannot take the address of untyped `{name}`"),
                    span,
                ));
            }
            VarKind::Local | VarKind::Param | VarKind::Temp => cx.scopes.promote(var),
        }
    }
    cx.scopes.assign_output_names();
    tracing::debug!(frames = cx.scopes.frame_count(), "scanned");
    Ok(root)
}
