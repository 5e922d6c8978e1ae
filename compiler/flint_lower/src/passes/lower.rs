//! Pass 4: spell out memory access.
//!
//! After this pass no dereference, address-of or stack address is left:
//! scalars are read and written through the runtime's views, and aggregates
//! are represented by their address. An aggregate-typed node in the lowered
//! tree evaluates to the aggregate's address, counted in units of the
//! aggregate's alignment.
//!
//! Frames are closed on entry, and each program or function body gets a
//! prologue binding the runtime locals it used, declaring its temporaries
//! and reserving its stack words.

use flint_ir::pass::rewrite_root;
use flint_ir::{BinaryOp, DeclKind, Literal, NodeId, NodeKind, Pass, Rewrite, Span, Tree, TypeId};
use flint_types::memory::{element_address, realign, view_index};
use flint_types::{MemoryAccess, ViewKind, WORD_SIZE};

use crate::scope::{CachedLocal, FrameId, ScopeId};
use crate::{Compilation, CompileError};

/// Word index of the stack pointer in the `U32` view.
const STACK_POINTER_WORD: i64 = 1;

const FRAME_POINTER: &str = "$SP";

struct Lower<'a> {
    cx: &'a mut Compilation,
    open: Vec<(NodeId, ScopeId)>,
}

/// Mark `id` and everything below it as final.
fn fix(tree: &mut Tree, id: NodeId) -> NodeId {
    for node in tree.descendants(id) {
        tree.set_fixed(node);
    }
    id
}

fn int(tree: &mut Tree, value: i64, ty: TypeId, span: Span) -> NodeId {
    tree.alloc_fixed(NodeKind::Literal(Literal::Int(value)), span, ty)
}

fn expr_stmt(tree: &mut Tree, expr: NodeId, span: Span) -> NodeId {
    tree.alloc_fixed(NodeKind::ExprStmt { expr }, span, TypeId::NONE)
}

impl Lower<'_> {
    fn scope(&self) -> ScopeId {
        self.open
            .last()
            .map_or_else(|| self.cx.scopes.root_scope(), |&(_, scope)| scope)
    }

    fn frame(&self) -> FrameId {
        self.cx.scopes.frame_of(self.scope())
    }

    fn frame_size(&self) -> u32 {
        self.cx
            .scopes
            .frame(self.frame())
            .frame_size_in_words()
            .unwrap_or(0)
    }

    /// The local bound to a view, requested for the current frame.
    fn view(&mut self, tree: &mut Tree, kind: ViewKind, span: Span) -> NodeId {
        let frame = self.frame();
        let name = self.cx.scopes.cached_local(frame, CachedLocal::View(kind));
        tree.alloc_fixed(NodeKind::Ident { name }, span, TypeId::DYN)
    }

    /// `$U32[1]`, the stack pointer in words.
    fn stack_pointer(&mut self, tree: &mut Tree, span: Span) -> NodeId {
        let view = self.view(tree, ViewKind::U32, span);
        let word = int(tree, STACK_POINTER_WORD, TypeId::I32, span);
        tree.alloc_fixed(
            NodeKind::Index {
                object: view,
                index: word,
            },
            span,
            TypeId::U32,
        )
    }

    /// `$U32[1] op= words`
    fn adjust_stack(&mut self, tree: &mut Tree, op: BinaryOp, words: u32, span: Span) -> NodeId {
        let target = self.stack_pointer(tree, span);
        let value = int(tree, i64::from(words), TypeId::U32, span);
        tree.alloc_fixed(
            NodeKind::Assign {
                op: Some(op),
                target,
                value,
            },
            span,
            TypeId::U32,
        )
    }

    /// `$SP + offset`, in words.
    fn slot_address(tree: &mut Tree, word_offset: u32, span: Span) -> NodeId {
        let sp = tree.alloc_fixed(
            NodeKind::Ident {
                name: FRAME_POINTER.to_owned(),
            },
            span,
            TypeId::U32,
        );
        if word_offset == 0 {
            return sp;
        }
        let offset = int(tree, i64::from(word_offset), TypeId::I32, span);
        tree.alloc_fixed(
            NodeKind::Binary {
                op: BinaryOp::Add,
                left: sp,
                right: offset,
            },
            span,
            TypeId::U32,
        )
    }

    /// `VIEW[address]` for a scalar of type `elem` at `address`, counted in
    /// `unit`-byte units.
    fn scalar_access(
        &mut self,
        tree: &mut Tree,
        address: NodeId,
        unit: u32,
        byte_offset: u32,
        elem: TypeId,
        span: Span,
    ) -> Result<NodeId, CompileError> {
        let Some(kind) = ViewKind::for_type(&self.cx.pool, elem) else {
            return Err(CompileError::access(
                format!("cannot read a value of type `{}` from memory", self.cx.pool.display(elem)),
                span,
            ));
        };
        let access = MemoryAccess {
            address,
            unit,
            byte_offset,
            elem,
            span,
        };
        let index = element_address(tree, &self.cx.pool, &access)?;
        let view = self.view(tree, kind, span);
        let read = view_index(tree, view, index, elem, span);
        Ok(fix(tree, read))
    }

    fn stack_address(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::StackAddress { name } = tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let ty = tree.ty(id);
        let offset = self
            .cx
            .scopes
            .lookup_output(self.frame(), name)
            .and_then(|var| self.cx.scopes.variable(var).word_offset);
        let Some(offset) = offset else {
            return Err(CompileError::access(format!("`{name}` has no stack slot"), span));
        };
        let words = Self::slot_address(tree, offset, span);
        let unit = self.cx.pool.unit(ty);
        let address = realign(tree, words, WORD_SIZE, unit, ty);
        tree.set_ty(address, ty);
        Ok(Rewrite::Replace(fix(tree, address)))
    }

    fn deref(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Deref { arg } = *tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let ty = tree.ty(id);
        if self.cx.pool.is_aggregate(ty) {
            tree.set_ty(arg, ty);
            return Ok(Rewrite::Replace(arg));
        }
        let span = tree.span(id);
        let unit = self.cx.pool.unit(tree.ty(arg));
        let read = self.scalar_access(tree, arg, unit, 0, ty, span)?;
        Ok(Rewrite::Replace(read))
    }

    fn member(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Member {
            object, property, ..
        } = tree.kind(id)
        else {
            return Ok(Rewrite::Keep);
        };
        let object = *object;
        let object_ty = tree.ty(object);
        let Some(field) = self
            .cx
            .pool
            .struct_type(object_ty)
            .and_then(|s| s.field(property))
            .cloned()
        else {
            // Property access on an untyped value.
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let unit = self.cx.pool.align(object_ty);
        if self.cx.pool.is_aggregate(field.ty) {
            let access = MemoryAccess {
                address: object,
                unit,
                byte_offset: field.offset,
                elem: field.ty,
                span,
            };
            let address = element_address(tree, &self.cx.pool, &access)?;
            tree.set_ty(address, field.ty);
            return Ok(Rewrite::Replace(fix(tree, address)));
        }
        let read = self.scalar_access(tree, object, unit, field.offset, field.ty, span)?;
        Ok(Rewrite::Replace(read))
    }

    /// Address of a lowered field: the view index, or the aggregate's own
    /// address.
    fn address_of(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::AddressOf { arg } = *tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let ty = tree.ty(id);
        let address = if self.cx.pool.is_aggregate(tree.ty(arg)) {
            arg
        } else if let NodeKind::Index { index, .. } = *tree.kind(arg) {
            index
        } else {
            return Err(CompileError::access(
                "cannot take the address of this expression",
                tree.span(id),
            ));
        };
        tree.set_ty(address, ty);
        Ok(Rewrite::Replace(fix(tree, address)))
    }

    /// `return e` becomes `return ($t = e, $U32[1] += N, $t)`.
    fn return_stmt(&mut self, tree: &mut Tree, id: NodeId) -> Rewrite {
        let words = self.frame_size();
        if words == 0 {
            return Rewrite::Keep;
        }
        let NodeKind::Return { arg } = *tree.kind(id) else {
            return Rewrite::Keep;
        };
        let span = tree.span(id);
        let restore = self.adjust_stack(tree, BinaryOp::Add, words, span);
        let Some(arg) = arg else {
            let restore = expr_stmt(tree, restore, span);
            let ret = tree.alloc_fixed(NodeKind::Return { arg: None }, span, TypeId::NONE);
            return Rewrite::Replace(tree.alloc_fixed(
                NodeKind::Block {
                    body: vec![restore, ret],
                },
                span,
                TypeId::NONE,
            ));
        };

        let ty = tree.ty(arg);
        let frame = self.frame();
        let temp = self.cx.scopes.fresh_temp(frame, ty, span);
        let name = self.cx.scopes.variable(temp).output_name.clone();
        let target = tree.alloc_fixed(NodeKind::Ident { name: name.clone() }, span, ty);
        let save = tree.alloc_fixed(
            NodeKind::Assign {
                op: None,
                target,
                value: arg,
            },
            span,
            ty,
        );
        let result = tree.alloc_fixed(NodeKind::Ident { name }, span, ty);
        let sequence = tree.alloc_fixed(
            NodeKind::Sequence {
                exprs: vec![save, restore, result],
            },
            span,
            ty,
        );
        Rewrite::Replace(tree.alloc_fixed(NodeKind::Return { arg: Some(sequence) }, span, TypeId::NONE))
    }

    /// Wrap a frame's statements in its prologue and epilogue.
    fn frame_body(&mut self, tree: &mut Tree, body: Vec<NodeId>, span: Span) -> Result<Vec<NodeId>, CompileError> {
        let frame = self.frame();
        let words = self.frame_size();

        let mut reserve = Vec::new();
        let mut epilogue = None;
        if words > 0 {
            let init = self.adjust_stack(tree, BinaryOp::Sub, words, span);
            let sp = tree.alloc_fixed(
                NodeKind::VarDeclarator {
                    name: FRAME_POINTER.to_owned(),
                    ty: None,
                    init: Some(init),
                },
                span,
                TypeId::NONE,
            );
            reserve.push(tree.alloc_fixed(
                NodeKind::VarDecl {
                    kind: DeclKind::Const,
                    decls: vec![sp],
                },
                span,
                TypeId::NONE,
            ));

            let params = self.cx.scopes.frame(frame).params.clone();
            for param in params {
                let variable = self.cx.scopes.variable(param);
                let Some(offset) = variable.word_offset else {
                    continue;
                };
                let (name, ty, param_span) = (variable.output_name.clone(), variable.ty, variable.span);
                let words = Self::slot_address(tree, offset, param_span);
                let slot = self.scalar_access(tree, words, WORD_SIZE, 0, ty, param_span)?;
                let value = tree.alloc_fixed(NodeKind::Ident { name }, param_span, ty);
                let store = tree.alloc_fixed(
                    NodeKind::Assign {
                        op: None,
                        target: slot,
                        value,
                    },
                    param_span,
                    ty,
                );
                reserve.push(expr_stmt(tree, store, param_span));
            }

            let restore = self.adjust_stack(tree, BinaryOp::Add, words, span);
            epilogue = Some(expr_stmt(tree, restore, span));
        }

        // Runtime locals and temporaries are only known once everything
        // above has been built.
        let mut prologue = Vec::new();
        let frame_data = self.cx.scopes.frame(frame);
        let cached = frame_data.cached_locals().to_vec();
        let temps: Vec<String> = frame_data
            .temps()
            .iter()
            .map(|&temp| self.cx.scopes.variable(temp).output_name.clone())
            .collect();
        if !cached.is_empty() {
            let module = self.cx.options.runtime_module.clone();
            let decls = cached
                .into_iter()
                .map(|local| {
                    let object = tree.alloc_fixed(NodeKind::Ident { name: module.clone() }, span, TypeId::DYN);
                    let init = tree.alloc_fixed(
                        NodeKind::Member {
                            object,
                            property: local.member(),
                            arrow: false,
                        },
                        span,
                        TypeId::DYN,
                    );
                    tree.alloc_fixed(
                        NodeKind::VarDeclarator {
                            name: local.output_name(),
                            ty: None,
                            init: Some(init),
                        },
                        span,
                        TypeId::NONE,
                    )
                })
                .collect();
            prologue.push(tree.alloc_fixed(
                NodeKind::VarDecl {
                    kind: DeclKind::Const,
                    decls,
                },
                span,
                TypeId::NONE,
            ));
        }
        if !temps.is_empty() {
            let decls = temps
                .into_iter()
                .map(|name| {
                    tree.alloc_fixed(
                        NodeKind::VarDeclarator {
                            name,
                            ty: None,
                            init: None,
                        },
                        span,
                        TypeId::NONE,
                    )
                })
                .collect();
            prologue.push(tree.alloc_fixed(
                NodeKind::VarDecl {
                    kind: DeclKind::Var,
                    decls,
                },
                span,
                TypeId::NONE,
            ));
        }

        tracing::debug!(
            frame = %self.cx.scopes.frame(frame).name,
            words,
            prologue = prologue.len() + reserve.len(),
            "frame lowered"
        );
        prologue.extend(reserve);
        prologue.extend(body);
        prologue.extend(epilogue);
        Ok(prologue)
    }

    fn program(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Program { body } = tree.kind(id).clone() else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let body = self.frame_body(tree, body, span)?;
        tree.replace_kind(id, NodeKind::Program { body });
        Ok(Rewrite::Keep)
    }

    fn function(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::FunctionDecl { body: block, .. } = *tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let NodeKind::Block { body } = tree.kind(block).clone() else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let body = self.frame_body(tree, body, span)?;
        tree.replace_kind(block, NodeKind::Block { body });
        Ok(Rewrite::Keep)
    }
}

impl Pass for Lower<'_> {
    type Error = CompileError;

    fn enter(&mut self, tree: &mut Tree, id: NodeId) -> Result<(), CompileError> {
        let Some(&scope) = self.cx.scope_of.get(&id) else {
            return Ok(());
        };
        self.open.push((id, scope));
        if matches!(tree.kind(id), NodeKind::Program { .. } | NodeKind::FunctionDecl { .. }) {
            let frame = self.cx.scopes.frame_of(scope);
            let cx = &mut *self.cx;
            cx.scopes.close_frame(frame, &cx.pool, &mut cx.diagnostics);
        }
        Ok(())
    }

    fn hook(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        match tree.kind(id) {
            NodeKind::StackAddress { .. } => self.stack_address(tree, id),
            NodeKind::Deref { .. } => self.deref(tree, id),
            NodeKind::Member { .. } => self.member(tree, id),
            NodeKind::AddressOf { .. } => self.address_of(tree, id),
            NodeKind::Return { .. } => Ok(self.return_stmt(tree, id)),
            NodeKind::Program { .. } => self.program(tree, id),
            NodeKind::FunctionDecl { .. } => self.function(tree, id),
            _ => Ok(Rewrite::Keep),
        }
    }

    fn leave(&mut self, _tree: &mut Tree, id: NodeId) {
        if self.open.last().is_some_and(|&(node, _)| node == id) {
            self.open.pop();
        }
    }
}

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(cx: &mut Compilation, tree: &mut Tree, root: NodeId) -> Result<NodeId, CompileError> {
    let mut pass = Lower {
        cx,
        open: Vec::new(),
    };
    rewrite_root(&mut pass, tree, root)
}
