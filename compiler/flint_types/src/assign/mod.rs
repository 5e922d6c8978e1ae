//! Assignability between types.

use flint_ir::TypeId;

use crate::data::TypeData;
use crate::TypePool;

/// Whether a value of type `from` may be stored where `to` is expected,
/// possibly through an implicit conversion.
pub fn assignable_from(pool: &TypePool, to: TypeId, from: TypeId) -> bool {
    if to == from || pool.is_dyn(to) || pool.is_dyn(from) {
        return true;
    }
    match pool.get(to) {
        TypeData::Dyn => true,
        TypeData::Primitive(_) => matches!(
            pool.get(from),
            TypeData::Primitive(_) | TypeData::Pointer { .. } | TypeData::Array { .. }
        ),
        TypeData::Pointer { .. } | TypeData::Array { length: None, .. } => {
            from == TypeId::VOID_PTR || pool.is_pointer_like(from) || pool.is_integral(from)
        }
        // Sized arrays and structs only accept themselves.
        TypeData::Array { length: Some(_), .. } | TypeData::Struct(_) | TypeData::Alias { .. } => {
            false
        }
        TypeData::Arrow { params, ret } => {
            let TypeData::Arrow {
                params: from_params,
                ret: from_ret,
            } = pool.get(from)
            else {
                return false;
            };
            params.len() == from_params.len()
                && params
                    .iter()
                    .zip(from_params)
                    .all(|(p, q)| assignable_from(pool, *p, *q))
                && assignable_from(pool, *ret, *from_ret)
        }
    }
}
