//! Struct layout ("lint").
//!
//! Fields are placed in declaration order, each at the next offset that is a
//! multiple of the field's own size. The struct's alignment is the largest
//! field alignment and its size is rounded up to that alignment.

use flint_ir::{Span, TypeId};
use rustc_hash::FxHashSet;

use crate::data::TypeData;
use crate::{TypeError, TypePool};

/// Round `value` up to a multiple of `align`.
#[inline]
pub fn align_to(value: u32, align: u32) -> u32 {
    if align == 0 {
        value
    } else {
        value.div_ceil(align) * align
    }
}

/// Compute the layout of `id` and of every struct it contains by value.
/// Already-linted structs are left alone.
pub fn lint(pool: &mut TypePool, id: TypeId, span: Span) -> Result<(), TypeError> {
    let mut visiting = FxHashSet::default();
    lint_inner(pool, id, span, &mut visiting)
}

fn lint_inner(
    pool: &mut TypePool,
    id: TypeId,
    span: Span,
    visiting: &mut FxHashSet<TypeId>,
) -> Result<(), TypeError> {
    let fields = match pool.get(id) {
        TypeData::Array {
            base,
            length: Some(_),
        } => {
            let base = *base;
            return lint_inner(pool, base, span, visiting);
        }
        TypeData::Struct(s) if s.linted => return Ok(()),
        TypeData::Struct(s) => s
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.ty))
            .collect::<Vec<_>>(),
        _ => return Ok(()),
    };

    if !visiting.insert(id) {
        return Err(TypeError::Layout {
            ty: pool.display(id),
            reason: "struct contains itself by value".to_owned(),
            span,
        });
    }

    let mut offsets = Vec::with_capacity(fields.len());
    let mut end = 0;
    let mut max_align = 1;
    for (name, ty) in &fields {
        lint_inner(pool, *ty, span, visiting)?;
        if pool.is_dyn(*ty) {
            return Err(TypeError::Layout {
                ty: pool.display(id),
                reason: format!("field `{name}` has no static type"),
                span,
            });
        }
        let size = pool.size(*ty);
        if size == 0 {
            return Err(TypeError::Layout {
                ty: pool.display(id),
                reason: format!("field `{name}` of type `{}` has zero size", pool.display(*ty)),
                span,
            });
        }
        let offset = align_to(end, size);
        offsets.push(offset);
        end = offset + size;
        max_align = max_align.max(pool.align(*ty));
    }
    visiting.remove(&id);

    let size = align_to(end, max_align);
    if let Some(s) = pool.struct_type_mut(id) {
        for (field, offset) in s.fields.iter_mut().zip(offsets) {
            field.offset = offset;
        }
        s.size = size;
        s.align = max_align;
        s.linted = true;
    }
    tracing::trace!(ty = %pool.display(id), size, align = max_align, "struct laid out");
    Ok(())
}

#[cfg(test)]
mod tests;
