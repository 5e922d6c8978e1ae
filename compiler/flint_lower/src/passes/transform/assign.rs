//! Assignments, increments and aggregate copies.

use flint_ir::{NodeId, NodeKind, Span, Tree, TypeId};
use flint_types::convert::CastKind;
use flint_types::WORD_SIZE;

use super::Transform;
use crate::scope::CachedLocal;
use crate::CompileError;

impl Transform<'_> {
    fn check_lvalue(&self, tree: &Tree, target: NodeId, span: Span) -> Result<(), CompileError> {
        match tree.kind(target) {
            NodeKind::Ident { .. }
            | NodeKind::Deref { .. }
            | NodeKind::Member { .. }
            | NodeKind::Index { .. } => Ok(()),
            NodeKind::StackAddress { .. } if self.cx.pool.is_aggregate(tree.ty(target)) => Ok(()),
            _ => Err(CompileError::access("cannot assign to this expression", span)),
        }
    }

    pub(super) fn assign(&mut self, tree: &mut Tree, id: NodeId) -> Result<NodeId, CompileError> {
        let NodeKind::Assign { op, target, value } = *tree.kind(id) else {
            return Ok(id);
        };
        let span = tree.span(id);
        self.check_lvalue(tree, target, span)?;
        if self.cx.pool.is_dyn(tree.ty(target)) {
            tree.set_ty(id, TypeId::DYN);
            return Ok(id);
        }
        match op {
            None => self.store(tree, target, value, span),
            Some(op) => {
                let frame = self.frame();
                let reference = self.cx.scopes.cache_reference(tree, frame, target);
                let combined = tree.alloc(
                    NodeKind::Binary {
                        op,
                        left: reference.use_,
                        right: value,
                    },
                    span,
                );
                let combined = self.binary(tree, combined)?;
                tracing::trace!(op = op.as_symbol(), "desugared compound assignment");
                self.store(tree, reference.def, combined, span)
            }
        }
    }

    /// `target = value` for a typed target: checked, converted, and turned
    /// into a bulk copy for aggregates.
    pub(super) fn store(
        &mut self,
        tree: &mut Tree,
        target: NodeId,
        value: NodeId,
        span: Span,
    ) -> Result<NodeId, CompileError> {
        let to = tree.ty(target);
        self.check_assignable(tree, to, value, span)?;
        if self.cx.pool.is_aggregate(to) {
            return self.copy_aggregate(tree, target, value, span);
        }
        let value = self.convert(tree, value, to, CastKind::Implicit);
        Ok(tree.alloc_typed(
            NodeKind::Assign {
                op: None,
                target,
                value,
            },
            span,
            to,
        ))
    }

    /// Widest bulk unit for `ty`, with its element type.
    fn bulk_unit(&self, ty: TypeId) -> (u32, TypeId) {
        let unit = self.cx.pool.align(ty).min(WORD_SIZE);
        let elem = match unit {
            1 => TypeId::U8,
            2 => TypeId::U16,
            _ => TypeId::U32,
        };
        (unit, elem)
    }

    /// `$memsetN(&target, 0, size)` for an aggregate declared without an
    /// initializer.
    pub(super) fn zero_aggregate(&mut self, tree: &mut Tree, target: NodeId, span: Span) -> Result<NodeId, CompileError> {
        let ty = tree.ty(target);
        let (unit, elem) = self.bulk_unit(ty);
        let pointer = self.cx.pool.pointer(elem);

        let dst = self.address_of(tree, target, span)?;
        let dst = self.convert(tree, dst, pointer, CastKind::Explicit);
        let zero = Self::literal(tree, 0, elem, span);
        let size = Self::literal(tree, i64::from(self.cx.pool.size(ty)), TypeId::U32, span);

        let memset_ty = self.cx.pool.arrow(&[pointer, elem, TypeId::U32], TypeId::VOID);
        let callee = self.runtime(tree, CachedLocal::Memset(unit), memset_ty, span);
        Ok(tree.alloc_typed(
            NodeKind::Call {
                callee,
                args: vec![dst, zero, size],
            },
            span,
            TypeId::VOID,
        ))
    }

    /// `$memcpyN(&target, &value, size)`, copying in the widest unit the
    /// alignment allows.
    fn copy_aggregate(
        &mut self,
        tree: &mut Tree,
        target: NodeId,
        value: NodeId,
        span: Span,
    ) -> Result<NodeId, CompileError> {
        let ty = tree.ty(target);
        let (unit, elem) = self.bulk_unit(ty);
        let pointer = self.cx.pool.pointer(elem);

        let dst = self.address_of(tree, target, span)?;
        let src = self.address_of(tree, value, span)?;
        let dst = self.convert(tree, dst, pointer, CastKind::Explicit);
        let src = self.convert(tree, src, pointer, CastKind::Explicit);
        let size = Self::literal(tree, i64::from(self.cx.pool.size(ty)), TypeId::U32, span);

        let memcpy_ty = self.cx.pool.arrow(&[pointer, pointer, TypeId::U32], pointer);
        let callee = self.runtime(tree, CachedLocal::Memcpy(unit), memcpy_ty, span);
        tracing::trace!(bytes = self.cx.pool.size(ty), unit, "aggregate copy");
        Ok(tree.alloc_typed(
            NodeKind::Call {
                callee,
                args: vec![dst, src, size],
            },
            span,
            pointer,
        ))
    }

    /// `++x` is `x = x + 1`; `x++` keeps the old value in a temporary.
    pub(super) fn update(&mut self, tree: &mut Tree, id: NodeId) -> Result<NodeId, CompileError> {
        let NodeKind::Update { op, prefix, arg } = *tree.kind(id) else {
            return Ok(id);
        };
        let span = tree.span(id);
        self.check_lvalue(tree, arg, span)?;
        let ty = tree.ty(arg);
        let pool = &self.cx.pool;
        if pool.is_dyn(ty) {
            tree.set_ty(id, TypeId::DYN);
            return Ok(id);
        }
        if (!pool.is_numeric(ty) && !pool.is_pointer_like(ty)) || pool.is_aggregate(ty) {
            return Err(CompileError::Operand {
                op: op.as_symbol().to_owned(),
                ty: pool.display(ty),
                span,
            });
        }

        let frame = self.frame();
        let reference = self.cx.scopes.cache_reference(tree, frame, arg);
        let step = |this: &mut Self, tree: &mut Tree, base: NodeId| -> Result<NodeId, CompileError> {
            let one = Self::literal(tree, 1, TypeId::I32, span);
            let sum = tree.alloc(
                NodeKind::Binary {
                    op: op.binary_op(),
                    left: base,
                    right: one,
                },
                span,
            );
            let sum = this.binary(tree, sum)?;
            Ok(this.convert(tree, sum, ty, CastKind::Explicit))
        };

        if prefix {
            let value = step(self, tree, reference.use_)?;
            return Ok(tree.alloc_typed(
                NodeKind::Assign {
                    op: None,
                    target: reference.def,
                    value,
                },
                span,
                ty,
            ));
        }

        let temp = self.cx.scopes.fresh_temp(frame, ty, span);
        let name = self.cx.scopes.variable(temp).output_name.clone();
        let temp_ref = |tree: &mut Tree| tree.alloc_typed(NodeKind::Ident { name: name.clone() }, span, ty);

        let target = temp_ref(tree);
        let save = tree.alloc_typed(
            NodeKind::Assign {
                op: None,
                target,
                value: reference.def,
            },
            span,
            ty,
        );
        let old = temp_ref(tree);
        let value = step(self, tree, old)?;
        let write = tree.alloc_typed(
            NodeKind::Assign {
                op: None,
                target: reference.use_,
                value,
            },
            span,
            ty,
        );
        let result = temp_ref(tree);
        tracing::trace!(op = op.as_symbol(), "desugared postfix update");
        Ok(tree.alloc_typed(
            NodeKind::Sequence {
                exprs: vec![save, write, result],
            },
            span,
            ty,
        ))
    }
}
