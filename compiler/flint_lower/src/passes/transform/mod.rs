//! Pass 3: type every expression and desugar typed operations.
//!
//! Runs bottom-up, so each hook sees children that are already typed. Type
//! errors abort; conversions needed to keep stored values in range are
//! inserted as code. Statement-level rewrites live here, expressions in
//! [`expr`] and assignments in [`assign`].

mod assign;
mod expr;

use flint_diagnostic::{Diagnostic, ErrorCode};
use flint_ir::pass::rewrite_root;
use flint_ir::{DeclKind, Literal, NodeId, NodeKind, Pass, Rewrite, Span, Tree, TypeId};
use flint_types::convert::CastKind;
use flint_types::{assignable_from, Converter, Resolver, TypeData};

use crate::scope::{CachedLocal, FrameId, ScopeId, VarId};
use crate::{Compilation, CompileError};

pub(super) struct Transform<'a> {
    cx: &'a mut Compilation,
    open: Vec<(NodeId, ScopeId)>,
}

/// `Keep` when a hook handed back the node it was given.
fn settle(id: NodeId, new: NodeId) -> Rewrite {
    if new == id {
        Rewrite::Keep
    } else {
        Rewrite::Replace(new)
    }
}

impl Transform<'_> {
    fn scope(&self) -> ScopeId {
        self.open
            .last()
            .map_or_else(|| self.cx.scopes.root_scope(), |&(_, scope)| scope)
    }

    fn frame(&self) -> FrameId {
        self.cx.scopes.frame_of(self.scope())
    }

    fn reflect(&mut self, expr: &flint_ir::TypeExpr, span: Span) -> Result<TypeId, CompileError> {
        Ok(Resolver::new(&mut self.cx.pool).reflect(expr, span)?)
    }

    fn convert(&mut self, tree: &mut Tree, expr: NodeId, target: TypeId, kind: CastKind) -> NodeId {
        Converter {
            tree,
            pool: &self.cx.pool,
            diagnostics: &mut self.cx.diagnostics,
            warnings: self.cx.options.warnings,
        }
        .convert(expr, target, kind)
    }

    fn check_assignable(&self, tree: &Tree, to: TypeId, value: NodeId, span: Span) -> Result<(), CompileError> {
        let from = tree.ty(value);
        if assignable_from(&self.cx.pool, to, from) {
            return Ok(());
        }
        Err(CompileError::Assignability {
            to: self.cx.pool.display(to),
            from: self.cx.pool.display(from),
            span,
        })
    }

    /// A synthesized integer literal.
    fn literal(tree: &mut Tree, value: i64, ty: TypeId, span: Span) -> NodeId {
        tree.alloc_fixed(NodeKind::Literal(Literal::Int(value)), span, ty)
    }

    /// Reference to a runtime binding of type `ty` in the current frame.
    fn runtime(&mut self, tree: &mut Tree, local: CachedLocal, ty: TypeId, span: Span) -> NodeId {
        let frame = self.frame();
        let name = self.cx.scopes.cached_local(frame, local);
        tree.alloc_fixed(NodeKind::Ident { name }, span, ty)
    }

    /// Zero of a scalar type, if it has one.
    fn default_value(&self, tree: &mut Tree, ty: TypeId, span: Span) -> Option<NodeId> {
        let pool = &self.cx.pool;
        match pool.get(ty) {
            TypeData::Primitive(p) if p.size > 0 => Some(Self::literal(tree, p.default_value, ty, span)),
            TypeData::Pointer { .. } | TypeData::Array { length: None, .. } => {
                Some(Self::literal(tree, 0, ty, span))
            }
            _ => None,
        }
    }

    /// A read of `var` as an expression.
    ///
    /// Stack-allocated variables are read through their slot address; sized
    /// arrays decay to that address.
    fn variable_reference(&mut self, tree: &mut Tree, var: VarId, span: Span) -> NodeId {
        let variable = self.cx.scopes.variable(var);
        let (name, ty) = (variable.output_name.clone(), variable.ty);
        if !variable.is_stack_allocated {
            return tree.alloc_typed(NodeKind::Ident { name }, span, ty);
        }
        if self.cx.pool.is_aggregate(ty) && !self.cx.pool.is_struct(ty) {
            return tree.alloc_typed(NodeKind::StackAddress { name }, span, ty);
        }
        let pointer = self.cx.pool.pointer(ty);
        let address = tree.alloc_typed(NodeKind::StackAddress { name }, span, pointer);
        tree.alloc_typed(NodeKind::Deref { arg: address }, span, ty)
    }

    fn declarator(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::VarDeclarator { init, .. } = *tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let Some(&var) = self.cx.var_of.get(&id) else {
            return Ok(Rewrite::Keep);
        };
        let variable = self.cx.scopes.variable(var);
        let (name, ty, on_stack) = (variable.output_name.clone(), variable.ty, variable.is_stack_allocated);
        let span = tree.span(id);

        // Stack slots are initialized by the enclosing declaration.
        let init = if on_stack {
            init
        } else if let Some(init) = init {
            self.check_assignable(tree, ty, init, span)?;
            Some(self.convert(tree, init, ty, CastKind::Implicit))
        } else {
            self.default_value(tree, ty, span)
        };
        tree.replace_kind(id, NodeKind::VarDeclarator { name, ty: None, init });
        Ok(Rewrite::Keep)
    }

    /// Split a declaration with stack-allocated declarators into a plain
    /// declaration and the initializing stores, in source order.
    fn declaration(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::VarDecl { decls, .. } = tree.kind(id).clone() else {
            return Ok(Rewrite::Keep);
        };
        let on_stack = |this: &Self, decl: &NodeId| {
            this.cx
                .var_of
                .get(decl)
                .is_some_and(|&var| this.cx.scopes.variable(var).is_stack_allocated)
        };
        if !decls.iter().any(|decl| on_stack(self, decl)) {
            return Ok(Rewrite::Keep);
        }

        let span = tree.span(id);
        let mut kept = Vec::new();
        let mut stores = Vec::new();
        for decl in decls {
            let NodeKind::VarDeclarator { name, init, .. } = tree.kind(decl).clone() else {
                continue;
            };
            let decl_span = tree.span(decl);
            let Some(&var) = self.cx.var_of.get(&decl) else {
                kept.push(decl);
                continue;
            };
            let ty = self.cx.scopes.variable(var).ty;
            if on_stack(self, &decl) {
                let target = self.variable_reference(tree, var, decl_span);
                match init {
                    Some(init) => stores.push(self.store(tree, target, init, decl_span)?),
                    None if self.cx.pool.is_aggregate(ty) => {
                        stores.push(self.zero_aggregate(tree, target, decl_span)?);
                    }
                    None => {
                        if let Some(zero) = self.default_value(tree, ty, decl_span) {
                            stores.push(self.store(tree, target, zero, decl_span)?);
                        }
                    }
                }
                continue;
            }
            if let Some(init) = init {
                let target = tree.alloc_typed(NodeKind::Ident { name: name.clone() }, decl_span, ty);
                stores.push(tree.alloc_typed(
                    NodeKind::Assign {
                        op: None,
                        target,
                        value: init,
                    },
                    decl_span,
                    ty,
                ));
                tree.replace_kind(decl, NodeKind::VarDeclarator { name, ty: None, init: None });
            }
            kept.push(decl);
        }
        tracing::trace!(kept = kept.len(), stores = stores.len(), "split declaration");

        let mut body = Vec::with_capacity(2);
        if !kept.is_empty() {
            body.push(tree.alloc(
                NodeKind::VarDecl {
                    kind: DeclKind::Var,
                    decls: kept,
                },
                span,
            ));
        }
        let expr = match stores.len() {
            0 => None,
            1 => stores.pop(),
            _ => {
                let ty = stores.last().map_or(TypeId::DYN, |&last| tree.ty(last));
                Some(tree.alloc_typed(NodeKind::Sequence { exprs: stores }, span, ty))
            }
        };
        if let Some(expr) = expr {
            body.push(tree.alloc(NodeKind::ExprStmt { expr }, span));
        }
        Ok(match body.as_slice() {
            [] => Rewrite::Delete,
            [only] => Rewrite::Replace(*only),
            _ => Rewrite::Replace(tree.alloc(NodeKind::Block { body }, span)),
        })
    }

    /// A `for` whose declaration was split keeps the stores as its init
    /// expression, or is preceded by the whole split declaration.
    fn for_loop(tree: &mut Tree, id: NodeId) -> Rewrite {
        let NodeKind::For {
            init: Some(init),
            test,
            update,
            body,
        } = *tree.kind(id)
        else {
            return Rewrite::Keep;
        };
        match *tree.kind(init) {
            NodeKind::ExprStmt { expr } => {
                tree.replace_kind(
                    id,
                    NodeKind::For {
                        init: Some(expr),
                        test,
                        update,
                        body,
                    },
                );
                return Rewrite::Keep;
            }
            NodeKind::Block { .. } => {}
            _ => return Rewrite::Keep,
        }
        tree.replace_kind(
            id,
            NodeKind::For {
                init: None,
                test,
                update,
                body,
            },
        );
        let span = tree.span(id);
        Rewrite::Replace(tree.alloc(NodeKind::Block { body: vec![init, id] }, span))
    }

    fn return_stmt(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Return { arg: Some(arg) } = *tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let ret = self.cx.scopes.frame(self.frame()).return_type;
        if self.cx.pool.is_dyn(ret) {
            return Ok(Rewrite::Keep);
        }
        let span = tree.span(id);
        if self.cx.pool.is_void(ret) {
            return Err(CompileError::Assignability {
                to: self.cx.pool.display(ret),
                from: self.cx.pool.display(tree.ty(arg)),
                span,
            });
        }
        self.check_assignable(tree, ret, arg, span)?;
        let arg = self.convert(tree, arg, ret, CastKind::Implicit);
        tree.replace_kind(id, NodeKind::Return { arg: Some(arg) });
        Ok(Rewrite::Keep)
    }

    /// Give the function and its parameters their output names and drop
    /// the type syntax.
    fn function(&mut self, tree: &mut Tree, id: NodeId) -> Rewrite {
        let NodeKind::FunctionDecl { params, body, .. } = tree.kind(id).clone() else {
            return Rewrite::Keep;
        };
        let Some(&var) = self.cx.var_of.get(&id) else {
            return Rewrite::Keep;
        };
        let name = self.cx.scopes.variable(var).output_name.clone();
        let frame = self.cx.scopes.frame(self.frame());
        let params = params
            .into_iter()
            .zip(&frame.params)
            .map(|(mut param, &var)| {
                param.name = self.cx.scopes.variable(var).output_name.clone();
                param.ty = None;
                param
            })
            .collect();
        tree.replace_kind(
            id,
            NodeKind::FunctionDecl {
                name,
                params,
                ret: None,
                body,
            },
        );
        Rewrite::Keep
    }
}

impl Pass for Transform<'_> {
    type Error = CompileError;

    fn enter(&mut self, _tree: &mut Tree, id: NodeId) -> Result<(), CompileError> {
        if let Some(&scope) = self.cx.scope_of.get(&id) {
            self.open.push((id, scope));
        }
        Ok(())
    }

    fn hook(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        match tree.kind(id) {
            // Expressions
            NodeKind::Literal(_) => Ok(self.literal_type(tree, id)),
            NodeKind::Ident { .. } => self.ident(tree, id),
            NodeKind::Unary { .. } => self.unary(tree, id),
            NodeKind::Binary { .. } => Ok(settle(id, self.binary(tree, id)?)),
            NodeKind::Assign { .. } => Ok(settle(id, self.assign(tree, id)?)),
            NodeKind::Update { .. } => Ok(settle(id, self.update(tree, id)?)),
            NodeKind::Call { .. } => self.call(tree, id),
            NodeKind::Member { .. } => self.member(tree, id),
            NodeKind::Index { .. } => self.index(tree, id),
            NodeKind::Deref { .. } => self.deref(tree, id),
            NodeKind::AddressOf { arg } => {
                let (arg, span) = (*arg, tree.span(id));
                Ok(Rewrite::Replace(self.address_of(tree, arg, span)?))
            }
            NodeKind::Cast { .. } => self.cast(tree, id),
            NodeKind::Sizeof { .. } => self.size_of(tree, id),
            NodeKind::New { .. } => self.new_object(tree, id),
            NodeKind::Delete { .. } => self.delete(tree, id),
            NodeKind::Sequence { exprs } => {
                let ty = exprs.last().map_or(TypeId::DYN, |&last| tree.ty(last));
                tree.set_ty(id, ty);
                Ok(Rewrite::Keep)
            }
            NodeKind::Conditional { .. } => Ok(self.conditional(tree, id)),
            NodeKind::StackAddress { .. } => Ok(Rewrite::Keep),

            // Statements
            NodeKind::VarDeclarator { .. } => self.declarator(tree, id),
            NodeKind::VarDecl { .. } => self.declaration(tree, id),
            NodeKind::For { .. } => Ok(Self::for_loop(tree, id)),
            NodeKind::Return { .. } => self.return_stmt(tree, id),
            NodeKind::FunctionDecl { .. } => Ok(self.function(tree, id)),
            NodeKind::Extern { .. } => Ok(Rewrite::Delete),
            NodeKind::Program { .. }
            | NodeKind::Block { .. }
            | NodeKind::ExprStmt { .. }
            | NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::DoWhile { .. }
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Empty
            | NodeKind::TypeAlias { .. }
            | NodeKind::StructDecl { .. } => Ok(Rewrite::Keep),
        }
    }

    fn leave(&mut self, _tree: &mut Tree, id: NodeId) {
        if self.open.last().is_some_and(|&(node, _)| node == id) {
            self.open.pop();
        }
    }
}

/// Note an identifier that is not declared anywhere in scope.
fn undeclared(name: &str, span: Span) -> Diagnostic {
    Diagnostic::info(ErrorCode::I0002)
        .with_message(format!("`{name}` is not declared; it is treated as `dyn`"))
        .with_label(span, "undeclared")
}

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(cx: &mut Compilation, tree: &mut Tree, root: NodeId) -> Result<NodeId, CompileError> {
    let mut pass = Transform {
        cx,
        open: Vec::new(),
    };
    rewrite_root(&mut pass, tree, root)
}
