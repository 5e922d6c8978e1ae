//! Conversion code generation.
//!
//! The target holds every number as a double, so storing into a fixed-width
//! slot has to spell out the truncation and sign extension C would do
//! implicitly. Pointers are rescaled when their alignment class changes.
//!
//! Constants are folded: if wrapping does not change a literal, no code is
//! emitted and the literal is simply retyped.

use flint_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode, WarningClass};
use flint_ir::{BinaryOp, Literal, NodeId, NodeKind, Tree, TypeId, UnaryOp};

use crate::memory::realign;
use crate::TypePool;

/// Whether the conversion was written in the source.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CastKind {
    Implicit,
    Explicit,
}

/// Truncate `value` toward zero and wrap it into a `width`-bit integer, the
/// way the target's 32-bit integer coercion followed by masking does.
pub fn wrap_integer(value: f64, width: u32, signed: bool) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let modulus = 4_294_967_296.0_f64;
    let word = value.trunc().rem_euclid(modulus) as u64;
    let width = width.clamp(1, 32);
    let mask = if width == 32 { u64::from(u32::MAX) } else { (1u64 << width) - 1 };
    let bits = word & mask;
    if signed && bits >= 1u64 << (width - 1) {
        bits as i64 - (1i64 << width)
    } else {
        bits as i64
    }
}

/// Value of a numeric constant expression: a literal, or `-`, `+`, `~`, `!`
/// applied to one.
pub fn constant_value(tree: &Tree, expr: NodeId) -> Option<f64> {
    match tree.kind(expr) {
        NodeKind::Literal(lit) => lit.as_number(),
        NodeKind::Unary { op, arg } => {
            let v = constant_value(tree, *arg)?;
            match op {
                UnaryOp::Neg => Some(-v),
                UnaryOp::Plus => Some(v),
                UnaryOp::BitNot => Some(f64::from(!(wrap_integer(v, 32, true) as i32))),
                UnaryOp::Not => Some(if v == 0.0 { 1.0 } else { 0.0 }),
                UnaryOp::TypeOf | UnaryOp::Void => None,
            }
        }
        _ => None,
    }
}

pub fn is_null_literal(tree: &Tree, expr: NodeId) -> bool {
    matches!(tree.kind(expr), NodeKind::Literal(Literal::Null))
}

/// Emits conversion code into a tree, recording warnings.
pub struct Converter<'a> {
    pub tree: &'a mut Tree,
    pub pool: &'a TypePool,
    pub diagnostics: &'a mut DiagnosticQueue,
    pub warnings: WarningClass,
}

impl Converter<'_> {
    /// Convert `expr` to `target`. The returned node has type `target`.
    /// Assignability must already have been checked.
    pub fn convert(&mut self, expr: NodeId, target: TypeId, kind: CastKind) -> NodeId {
        let source = self.tree.ty(expr);
        if source == target
            || target.is_none()
            || self.pool.is_dyn(target)
            || self.pool.is_void(target)
        {
            return expr;
        }
        if self.pool.is_pointer_like(target) {
            return self.convert_pointer(expr, source, target);
        }
        match self.pool.primitive(target) {
            Some(p) if p.float => self.coerce_number(expr, target),
            Some(p) if p.is_integral() => self.convert_integral(expr, source, target, kind),
            _ => {
                self.tree.set_ty(expr, target);
                expr
            }
        }
    }

    fn coerce_number(&mut self, expr: NodeId, target: TypeId) -> NodeId {
        if self.pool.is_float(self.tree.ty(expr)) && constant_value(self.tree, expr).is_some() {
            self.tree.set_ty(expr, target);
            return expr;
        }
        let span = self.tree.span(expr);
        self.tree.alloc_typed(
            NodeKind::Unary {
                op: UnaryOp::Plus,
                arg: expr,
            },
            span,
            target,
        )
    }

    fn convert_integral(
        &mut self,
        expr: NodeId,
        source: TypeId,
        target: TypeId,
        kind: CastKind,
    ) -> NodeId {
        let lwidth = self.pool.bit_width(target);
        let rwidth = self.pool.bit_width(source);
        let signed = self.pool.is_signed(target);

        if let Some(value) = constant_value(self.tree, expr) {
            let folded = wrap_integer(value, lwidth, signed);
            if folded as f64 == value {
                self.tree.set_ty(expr, target);
                return expr;
            }
            if self.warnings.contains(WarningClass::CONVERSION) {
                let change = if (value < 0.0) != (folded < 0) {
                    "sign"
                } else {
                    "value"
                };
                let span = self.tree.span(expr);
                self.diagnostics.add(
                    Diagnostic::warning(ErrorCode::W1001)
                        .with_message(format!(
                            "constant conversion from `{}` to `{}` changes {change} from {value} to {folded}",
                            self.pool.display(source),
                            self.pool.display(target),
                        ))
                        .with_label(span, format!("becomes {folded}")),
                );
            }
        } else if kind == CastKind::Implicit
            && self.warnings.contains(WarningClass::CONVERSION)
            && (lwidth < rwidth || self.pool.is_float(source))
        {
            let span = self.tree.span(expr);
            self.diagnostics.add(
                Diagnostic::warning(ErrorCode::W1002)
                    .with_message(format!(
                        "implicit conversion from `{}` to `{}` may change the value",
                        self.pool.display(source),
                        self.pool.display(target),
                    ))
                    .with_label(span, "narrowed here")
                    .with_note("use an explicit cast if this is intended"),
            );
        }

        self.emit_integral(expr, lwidth, rwidth, signed, target)
    }

    fn emit_integral(
        &mut self,
        expr: NodeId,
        lwidth: u32,
        rwidth: u32,
        signed: bool,
        target: TypeId,
    ) -> NodeId {
        if lwidth < rwidth && lwidth != 32 {
            let mask = (1i64 << lwidth) - 1;
            let masked = self.binary(BinaryOp::BitAnd, expr, mask, TypeId::I32);
            if !signed {
                self.tree.set_ty(masked, target);
                return masked;
            }
            let shift = i64::from(32 - lwidth);
            let shifted = self.binary(BinaryOp::Shl, masked, shift, TypeId::I32);
            return self.binary(BinaryOp::Shr, shifted, shift, target);
        }
        let op = if signed { BinaryOp::BitOr } else { BinaryOp::UShr };
        self.binary(op, expr, 0, target)
    }

    fn binary(&mut self, op: BinaryOp, left: NodeId, right: i64, ty: TypeId) -> NodeId {
        let span = self.tree.span(left);
        let right = self
            .tree
            .alloc_fixed(NodeKind::Literal(Literal::Int(right)), span, TypeId::I32);
        self.tree
            .alloc_typed(NodeKind::Binary { op, left, right }, span, ty)
    }

    fn convert_pointer(&mut self, expr: NodeId, source: TypeId, target: TypeId) -> NodeId {
        let span = self.tree.span(expr);
        if is_null_literal(self.tree, expr) {
            return self
                .tree
                .alloc_fixed(NodeKind::Literal(Literal::Int(0)), span, target);
        }
        if !self.pool.is_pointer_like(source) {
            self.tree.set_ty(expr, target);
            return expr;
        }
        let from = self.pool.unit(source);
        let to = self.pool.unit(target);
        if to > from && self.warnings.contains(WarningClass::CAST) {
            self.diagnostics.add(
                Diagnostic::warning(ErrorCode::W1003)
                    .with_message(format!(
                        "conversion from `{}` to `{}` narrows alignment from {from} to {to} bytes",
                        self.pool.display(source),
                        self.pool.display(target),
                    ))
                    .with_label(span, "may truncate the address"),
            );
        }
        if from == to {
            self.tree.set_ty(expr, target);
            return expr;
        }
        realign(self.tree, expr, from, to, target)
    }
}

#[cfg(test)]
mod tests;
