//! Memory addressing.
//!
//! The target has one flat buffer seen through typed views. A view indexes
//! in units of its element size, and a pointer value is held in units of its
//! element's alignment class, so most of lowering is moving addresses
//! between units.

use flint_ir::{BinaryOp, Literal, NodeId, NodeKind, Span, Tree, TypeId};

use crate::data::TypeData;
use crate::{TypeError, TypePool};

/// The numeric views the runtime exposes over its memory buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ViewKind {
    pub const ALL: [ViewKind; 8] = [
        ViewKind::I8,
        ViewKind::U8,
        ViewKind::I16,
        ViewKind::U16,
        ViewKind::I32,
        ViewKind::U32,
        ViewKind::F32,
        ViewKind::F64,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ViewKind::I8 => "I8",
            ViewKind::U8 => "U8",
            ViewKind::I16 => "I16",
            ViewKind::U16 => "U16",
            ViewKind::I32 => "I32",
            ViewKind::U32 => "U32",
            ViewKind::F32 => "F32",
            ViewKind::F64 => "F64",
        }
    }

    pub const fn elem_size(self) -> u32 {
        match self {
            ViewKind::I8 | ViewKind::U8 => 1,
            ViewKind::I16 | ViewKind::U16 => 2,
            ViewKind::I32 | ViewKind::U32 | ViewKind::F32 => 4,
            ViewKind::F64 => 8,
        }
    }

    /// The view a scalar of type `ty` is read through. Pointers are words.
    pub fn for_type(pool: &TypePool, ty: TypeId) -> Option<ViewKind> {
        match pool.get(ty) {
            TypeData::Pointer { .. } | TypeData::Array { length: None, .. } => Some(ViewKind::U32),
            TypeData::Primitive(p) => match (p.size, p.signed, p.float) {
                (1, true, false) => Some(ViewKind::I8),
                (1, false, false) => Some(ViewKind::U8),
                (2, true, false) => Some(ViewKind::I16),
                (2, false, false) => Some(ViewKind::U16),
                (4, true, false) => Some(ViewKind::I32),
                (4, false, false) => Some(ViewKind::U32),
                (4, _, true) => Some(ViewKind::F32),
                (8, _, true) => Some(ViewKind::F64),
                _ => None,
            },
            _ => None,
        }
    }
}

/// An access to `elem` at `byte_offset` bytes past `address`, where
/// `address` is counted in `unit`-byte units.
#[derive(Copy, Clone, Debug)]
pub struct MemoryAccess {
    pub address: NodeId,
    pub unit: u32,
    pub byte_offset: u32,
    pub elem: TypeId,
    pub span: Span,
}

/// Rescale an address from `from`-byte units to `to`-byte units.
pub fn realign(tree: &mut Tree, expr: NodeId, from: u32, to: u32, ty: TypeId) -> NodeId {
    if from == to || from == 0 || to == 0 {
        return expr;
    }
    let span = tree.span(expr);
    let shift = (from.max(to) / from.min(to)).trailing_zeros();
    let op = if to > from { BinaryOp::Shr } else { BinaryOp::Shl };
    let amount = tree.alloc_fixed(NodeKind::Literal(Literal::Int(i64::from(shift))), span, TypeId::I32);
    tree.alloc_typed(
        NodeKind::Binary {
            op,
            left: expr,
            right: amount,
        },
        span,
        ty,
    )
}

/// Address of the accessed element, in units of the element's alignment.
pub fn element_address(
    tree: &mut Tree,
    pool: &TypePool,
    access: &MemoryAccess,
) -> Result<NodeId, TypeError> {
    let align = pool.align(access.elem);
    if access.byte_offset % align != 0 {
        return Err(TypeError::Alignment {
            offset: access.byte_offset,
            align,
            span: access.span,
        });
    }
    let base = realign(tree, access.address, access.unit, align, TypeId::U32);
    let offset = access.byte_offset / align;
    if offset == 0 {
        return Ok(base);
    }
    let offset = tree.alloc_fixed(
        NodeKind::Literal(Literal::Int(i64::from(offset))),
        access.span,
        TypeId::I32,
    );
    Ok(tree.alloc_typed(
        NodeKind::Binary {
            op: BinaryOp::Add,
            left: base,
            right: offset,
        },
        access.span,
        TypeId::U32,
    ))
}

/// `view[index]`, typed as the element read.
pub fn view_index(tree: &mut Tree, view: NodeId, index: NodeId, elem: TypeId, span: Span) -> NodeId {
    tree.alloc_typed(NodeKind::Index { object: view, index }, span, elem)
}

#[cfg(test)]
mod tests;
