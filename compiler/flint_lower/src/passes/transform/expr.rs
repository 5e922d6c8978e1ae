//! Expression typing and desugaring.

use flint_ir::{BinaryOp, Literal, NodeId, NodeKind, Rewrite, Span, Tree, TypeId, UnaryOp};
use flint_types::convert::{constant_value, is_null_literal, CastKind};
use flint_types::{assignable_from, TypeData};

use super::{undeclared, Transform};
use crate::scope::CachedLocal;
use crate::CompileError;

impl Transform<'_> {
    fn operand_error(&self, op: &str, ty: TypeId, span: Span) -> CompileError {
        CompileError::Operand {
            op: op.to_owned(),
            ty: self.cx.pool.display(ty),
            span,
        }
    }

    pub(super) fn literal_type(&mut self, tree: &mut Tree, id: NodeId) -> Rewrite {
        let ty = match tree.kind(id) {
            NodeKind::Literal(Literal::Int(v)) => {
                if i32::try_from(*v).is_ok() {
                    TypeId::I32
                } else if u32::try_from(*v).is_ok() {
                    TypeId::U32
                } else {
                    TypeId::F64
                }
            }
            NodeKind::Literal(Literal::Float(_)) => TypeId::F64,
            NodeKind::Literal(Literal::Null) => TypeId::VOID_PTR,
            _ => TypeId::DYN,
        };
        tree.set_ty(id, ty);
        Rewrite::Keep
    }

    pub(super) fn ident(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let Some(name) = tree.ident_name(id).map(str::to_owned) else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let Some(var) = self.cx.scopes.get_variable(self.scope(), &name, false) else {
            tree.set_ty(id, TypeId::DYN);
            self.cx.diagnostics.add(undeclared(&name, span));
            return Ok(Rewrite::Keep);
        };
        let variable = self.cx.scopes.variable(var);
        if !variable.is_stack_allocated {
            let (output, ty) = (variable.output_name.clone(), variable.ty);
            tree.replace_kind(id, NodeKind::Ident { name: output });
            tree.set_ty(id, ty);
            return Ok(Rewrite::Keep);
        }
        if variable.frame != self.frame() {
            return Err(CompileError::ScopeCapture {
                name,
                span,
                declared: variable.span,
            });
        }
        Ok(Rewrite::Replace(self.variable_reference(tree, var, span)))
    }

    pub(super) fn unary(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Unary { op, arg } = *tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let pool = &self.cx.pool;
        let at = tree.ty(arg);
        let span = tree.span(id);
        if pool.is_struct(at) {
            return Err(self.operand_error(op.as_symbol(), at, span));
        }
        let ty = match op {
            UnaryOp::Not | UnaryOp::BitNot => TypeId::I32,
            UnaryOp::TypeOf | UnaryOp::Void => TypeId::DYN,
            UnaryOp::Neg | UnaryOp::Plus if pool.is_dyn(at) => TypeId::DYN,
            UnaryOp::Neg | UnaryOp::Plus if pool.is_float(at) => at,
            UnaryOp::Plus if pool.is_integral(at) => at,
            UnaryOp::Neg if pool.is_integral(at) => TypeId::I32,
            UnaryOp::Neg | UnaryOp::Plus => return Err(self.operand_error(op.as_symbol(), at, span)),
        };
        tree.set_ty(id, ty);
        Ok(Rewrite::Keep)
    }

    /// Type a binary node. Pointer arithmetic is rewritten, so the result
    /// may be a different node.
    pub(super) fn binary(&mut self, tree: &mut Tree, id: NodeId) -> Result<NodeId, CompileError> {
        let NodeKind::Binary { op, left, right } = *tree.kind(id) else {
            return Ok(id);
        };
        let span = tree.span(id);
        let (lt, rt) = (tree.ty(left), tree.ty(right));
        for ty in [lt, rt] {
            if self.cx.pool.is_struct(ty) {
                return Err(self.operand_error(op.as_symbol(), ty, span));
            }
        }

        let pool = &self.cx.pool;
        let ty = if op.is_comparison() {
            self.comparison_operands(tree, id);
            TypeId::I32
        } else if op.is_logical() {
            if lt == rt {
                lt
            } else {
                TypeId::DYN
            }
        } else if op.is_bitwise() {
            if op == BinaryOp::UShr {
                TypeId::U32
            } else {
                TypeId::I32
            }
        } else if pool.is_pointer_like(lt) && pool.is_pointer_like(rt) {
            if op != BinaryOp::Sub {
                return Err(self.operand_error(op.as_symbol(), lt, span));
            }
            return Ok(self.pointer_difference(tree, left, right, span));
        } else if pool.is_pointer_like(lt) && matches!(op, BinaryOp::Add | BinaryOp::Sub) {
            return self.pointer_offset(tree, op, left, right, true, span);
        } else if pool.is_pointer_like(rt) && op == BinaryOp::Add {
            return self.pointer_offset(tree, op, right, left, false, span);
        } else {
            self.arithmetic_type(op, lt, rt, span)?
        };
        tree.set_ty(id, ty);
        Ok(id)
    }

    /// `null` compares against a pointer as `0`, and pointers of different
    /// units are compared in the left operand's unit.
    fn comparison_operands(&mut self, tree: &mut Tree, id: NodeId) {
        let NodeKind::Binary { op, left, right } = *tree.kind(id) else {
            return;
        };
        let (lt, rt) = (tree.ty(left), tree.ty(right));
        let pool = &self.cx.pool;
        let (left, right) = if is_null_literal(tree, left) && pool.is_pointer_like(rt) {
            (self.convert(tree, left, rt, CastKind::Implicit), right)
        } else if is_null_literal(tree, right) && pool.is_pointer_like(lt) {
            (left, self.convert(tree, right, lt, CastKind::Implicit))
        } else if pool.is_pointer_like(lt) && pool.is_pointer_like(rt) {
            (left, self.convert(tree, right, lt, CastKind::Explicit))
        } else {
            (left, right)
        };
        tree.replace_kind(id, NodeKind::Binary { op, left, right });
    }

    fn arithmetic_type(&self, op: BinaryOp, lt: TypeId, rt: TypeId, span: Span) -> Result<TypeId, CompileError> {
        let pool = &self.cx.pool;
        if pool.is_dyn(lt) || pool.is_dyn(rt) {
            return Ok(TypeId::DYN);
        }
        for ty in [lt, rt] {
            if !pool.is_numeric(ty) {
                return Err(self.operand_error(op.as_symbol(), ty, span));
            }
        }
        Ok(if pool.is_float(lt) || pool.is_float(rt) {
            if lt == TypeId::F64 || rt == TypeId::F64 {
                TypeId::F64
            } else {
                TypeId::F32
            }
        } else if op == BinaryOp::Div {
            TypeId::F64
        } else if lt == TypeId::U32 || rt == TypeId::U32 {
            TypeId::U32
        } else {
            TypeId::I32
        })
    }

    /// `p ± n`, with `n` scaled to the pointer's units.
    fn pointer_offset(
        &mut self,
        tree: &mut Tree,
        op: BinaryOp,
        pointer: NodeId,
        offset: NodeId,
        pointer_first: bool,
        span: Span,
    ) -> Result<NodeId, CompileError> {
        let pt = tree.ty(pointer);
        let ot = tree.ty(offset);
        if !self.cx.pool.is_integral(ot) && !self.cx.pool.is_dyn(ot) {
            return Err(self.operand_error(op.as_symbol(), ot, span));
        }
        let elem = self.cx.pool.elem(pt).unwrap_or(TypeId::VOID);
        let result = self.cx.pool.pointer(elem);
        let scale = self.cx.pool.pointer_scale(pt);

        let offset = if scale == 1 {
            offset
        } else if let Some(value) = constant_value(tree, offset) {
            Self::literal(tree, value as i64 * i64::from(scale), TypeId::I32, span)
        } else {
            let factor = Self::literal(tree, i64::from(scale), TypeId::I32, span);
            tree.alloc_typed(
                NodeKind::Binary {
                    op: BinaryOp::Mul,
                    left: offset,
                    right: factor,
                },
                span,
                TypeId::I32,
            )
        };
        let (left, right) = if pointer_first {
            (pointer, offset)
        } else {
            (offset, pointer)
        };
        Ok(tree.alloc_typed(NodeKind::Binary { op, left, right }, span, result))
    }

    /// `p - q` in elements.
    fn pointer_difference(&mut self, tree: &mut Tree, left: NodeId, right: NodeId, span: Span) -> NodeId {
        let lt = tree.ty(left);
        let right = self.convert(tree, right, lt, CastKind::Explicit);
        let scale = self.cx.pool.pointer_scale(lt);
        let diff = tree.alloc_typed(
            NodeKind::Binary {
                op: BinaryOp::Sub,
                left,
                right,
            },
            span,
            TypeId::I32,
        );
        if scale == 1 {
            return diff;
        }
        let divisor = Self::literal(tree, i64::from(scale), TypeId::I32, span);
        let quotient = tree.alloc_typed(
            NodeKind::Binary {
                op: BinaryOp::Div,
                left: diff,
                right: divisor,
            },
            span,
            TypeId::F64,
        );
        let zero = Self::literal(tree, 0, TypeId::I32, span);
        tree.alloc_typed(
            NodeKind::Binary {
                op: BinaryOp::BitOr,
                left: quotient,
                right: zero,
            },
            span,
            TypeId::I32,
        )
    }

    pub(super) fn call(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Call { callee, args } = tree.kind(id).clone() else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let TypeData::Arrow { params, ret } = self.cx.pool.get(tree.ty(callee)).clone() else {
            tree.set_ty(id, TypeId::DYN);
            return Ok(Rewrite::Keep);
        };
        if params.len() != args.len() {
            return Err(CompileError::ArgumentCount {
                expected: params.len(),
                found: args.len(),
                span,
            });
        }
        let mut converted = Vec::with_capacity(args.len());
        for (arg, param) in args.into_iter().zip(params) {
            let arg_span = tree.span(arg);
            self.check_assignable(tree, param, arg, arg_span)?;
            converted.push(self.convert(tree, arg, param, CastKind::Implicit));
        }
        tree.replace_kind(
            id,
            NodeKind::Call {
                callee,
                args: converted,
            },
        );
        tree.set_ty(id, ret);
        Ok(Rewrite::Keep)
    }

    /// `s.f`, `p.f` and `p->f` all become `Member` of a struct value;
    /// pointers are dereferenced explicitly.
    pub(super) fn member(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Member {
            object,
            property,
            arrow,
        } = tree.kind(id).clone()
        else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let ot = tree.ty(object);
        let pool = &self.cx.pool;
        if pool.is_dyn(ot) {
            tree.replace_kind(
                id,
                NodeKind::Member {
                    object,
                    property,
                    arrow: false,
                },
            );
            tree.set_ty(id, TypeId::DYN);
            return Ok(Rewrite::Keep);
        }

        let (object, struct_ty) = if pool.is_pointer_like(ot) {
            let elem = pool.elem(ot).unwrap_or(TypeId::VOID);
            if pool.is_pointer_like(elem) {
                return Err(CompileError::access(
                    format!("cannot access `{property}` through `{}`", pool.display(ot)),
                    span,
                ));
            }
            if !pool.is_struct(elem) {
                return Err(CompileError::access(
                    format!("`{}` is not a struct", pool.display(elem)),
                    span,
                ));
            }
            let deref = tree.alloc_typed(NodeKind::Deref { arg: object }, span, elem);
            (deref, elem)
        } else if pool.is_struct(ot) && !arrow {
            (object, ot)
        } else {
            return Err(CompileError::access(
                format!("cannot access `{property}` on `{}`", pool.display(ot)),
                span,
            ));
        };

        let Some(field_ty) = pool
            .struct_type(struct_ty)
            .and_then(|s| s.field(&property))
            .map(|field| field.ty)
        else {
            return Err(CompileError::access(
                format!("no field `{property}` in `{}`", pool.display(struct_ty)),
                span,
            ));
        };
        tree.replace_kind(
            id,
            NodeKind::Member {
                object,
                property,
                arrow: false,
            },
        );
        tree.set_ty(id, field_ty);
        Ok(Rewrite::Keep)
    }

    /// `a[i]` on a pointer is `*(a + i)`.
    pub(super) fn index(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Index { object, index } = *tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let ot = tree.ty(object);
        if self.cx.pool.is_dyn(ot) {
            tree.set_ty(id, TypeId::DYN);
            return Ok(Rewrite::Keep);
        }
        let pool = &self.cx.pool;
        let elem = pool.elem(ot).filter(|&elem| !pool.is_void(elem) && !pool.is_dyn(elem));
        let Some(elem) = elem else {
            return Err(CompileError::access(
                format!("cannot index `{}`", self.cx.pool.display(ot)),
                span,
            ));
        };
        let address = self.pointer_offset(tree, BinaryOp::Add, object, index, true, span)?;
        Ok(Rewrite::Replace(tree.alloc_typed(
            NodeKind::Deref { arg: address },
            span,
            elem,
        )))
    }

    pub(super) fn deref(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Deref { arg } = *tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let pool = &self.cx.pool;
        let at = tree.ty(arg);
        match pool.elem(at) {
            Some(elem) if !pool.is_void(elem) && !pool.is_dyn(elem) => {
                tree.set_ty(id, elem);
                Ok(Rewrite::Keep)
            }
            _ => Err(CompileError::access(
                format!("cannot dereference `{}`", pool.display(at)),
                tree.span(id),
            )),
        }
    }

    /// Address of an lvalue: `&*p` is `p`; struct members keep an explicit
    /// `AddressOf` for lowering.
    pub(super) fn address_of(&mut self, tree: &mut Tree, arg: NodeId, span: Span) -> Result<NodeId, CompileError> {
        match *tree.kind(arg) {
            NodeKind::Deref { arg: inner } => Ok(inner),
            NodeKind::StackAddress { .. } if self.cx.pool.is_aggregate(tree.ty(arg)) => Ok(arg),
            NodeKind::Member { object, .. } if !self.cx.pool.is_dyn(tree.ty(object)) => {
                let pointer = self.cx.pool.pointer(tree.ty(arg));
                Ok(tree.alloc_typed(NodeKind::AddressOf { arg }, span, pointer))
            }
            _ => Err(CompileError::access(
                "cannot take the address of this expression",
                span,
            )),
        }
    }

    pub(super) fn cast(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Cast { ty, arg } = tree.kind(id).clone() else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let target = self.reflect(&ty, span)?;
        let source = tree.ty(arg);
        let pool = &self.cx.pool;
        let aggregate = pool.is_struct(target)
            || pool.is_struct(source)
            || (pool.is_aggregate(target) && !pool.is_struct(target));
        if target != source && (aggregate || !assignable_from(pool, target, source)) {
            return Err(CompileError::Assignability {
                to: pool.display(target),
                from: pool.display(source),
                span,
            });
        }
        if pool.is_dyn(target) {
            tree.set_ty(arg, target);
            return Ok(Rewrite::Replace(arg));
        }
        Ok(Rewrite::Replace(self.convert(tree, arg, target, CastKind::Explicit)))
    }

    pub(super) fn size_of(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Sizeof { ty } = tree.kind(id).clone() else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let ty = self.reflect(&ty, span)?;
        let size = self.cx.pool.size(ty);
        Ok(Rewrite::Replace(Self::literal(tree, i64::from(size), TypeId::U32, span)))
    }

    /// `new T` and `new T[n]` allocate through the runtime and convert the
    /// byte pointer to `*T`.
    pub(super) fn new_object(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::New { ty, count } = tree.kind(id).clone() else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let elem = self.reflect(&ty, span)?;
        let size = self.cx.pool.size(elem);
        if size == 0 {
            return Err(CompileError::access(
                format!("cannot allocate `{}`", self.cx.pool.display(elem)),
                span,
            ));
        }
        let bytes = match count {
            None => Self::literal(tree, i64::from(size), TypeId::U32, span),
            Some(count) => {
                let ct = tree.ty(count);
                if !self.cx.pool.is_integral(ct) && !self.cx.pool.is_dyn(ct) {
                    return Err(self.operand_error("new", ct, span));
                }
                if let Some(n) = constant_value(tree, count) {
                    Self::literal(tree, n as i64 * i64::from(size), TypeId::U32, span)
                } else if size == 1 {
                    count
                } else {
                    let factor = Self::literal(tree, i64::from(size), TypeId::U32, span);
                    tree.alloc_typed(
                        NodeKind::Binary {
                            op: BinaryOp::Mul,
                            left: count,
                            right: factor,
                        },
                        span,
                        TypeId::U32,
                    )
                }
            }
        };
        let malloc_ty = self.cx.pool.arrow(&[TypeId::U32], TypeId::BYTE_PTR);
        let callee = self.runtime(tree, CachedLocal::Malloc, malloc_ty, span);
        let call = tree.alloc_typed(
            NodeKind::Call {
                callee,
                args: vec![bytes],
            },
            span,
            TypeId::BYTE_PTR,
        );
        let target = self.cx.pool.pointer(elem);
        tracing::trace!(bytes = size, "desugared new");
        Ok(Rewrite::Replace(self.convert(tree, call, target, CastKind::Explicit)))
    }

    pub(super) fn delete(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, CompileError> {
        let NodeKind::Delete { arg } = *tree.kind(id) else {
            return Ok(Rewrite::Keep);
        };
        let span = tree.span(id);
        let at = tree.ty(arg);
        if !self.cx.pool.is_pointer_like(at) {
            return Err(CompileError::access(
                format!("cannot delete a value of type `{}`", self.cx.pool.display(at)),
                span,
            ));
        }
        let pointer = self.convert(tree, arg, TypeId::BYTE_PTR, CastKind::Explicit);
        let free_ty = self.cx.pool.arrow(&[TypeId::BYTE_PTR], TypeId::VOID);
        let callee = self.runtime(tree, CachedLocal::Free, free_ty, span);
        Ok(Rewrite::Replace(tree.alloc_typed(
            NodeKind::Call {
                callee,
                args: vec![pointer],
            },
            span,
            TypeId::VOID,
        )))
    }

    pub(super) fn conditional(&mut self, tree: &mut Tree, id: NodeId) -> Rewrite {
        let NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } = *tree.kind(id)
        else {
            return Rewrite::Keep;
        };
        let (ct, at) = (tree.ty(consequent), tree.ty(alternate));
        let pool = &self.cx.pool;
        let (consequent, alternate, ty) = if ct == at {
            (consequent, alternate, ct)
        } else if is_null_literal(tree, consequent) && pool.is_pointer_like(at) {
            (self.convert(tree, consequent, at, CastKind::Implicit), alternate, at)
        } else if is_null_literal(tree, alternate) && pool.is_pointer_like(ct) {
            (consequent, self.convert(tree, alternate, ct, CastKind::Implicit), ct)
        } else {
            (consequent, alternate, TypeId::DYN)
        };
        tree.replace_kind(
            id,
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            },
        );
        tree.set_ty(id, ty);
        Rewrite::Keep
    }
}
