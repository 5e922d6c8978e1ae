//! The type pool.
//!
//! Owns every type of a compile job. Built-in primitives sit at the fixed
//! indices named by [`TypeId`]'s constants; pointer, array and arrow types
//! are hash-consed so structurally equal types share one id. Struct types
//! are nominal: each declaration gets its own id.

use flint_ir::TypeId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::data::{self, Primitive, StructType, TypeData};

static DYN_DATA: TypeData = TypeData::Dyn;

/// Size in bytes of a pointer and of one memory word.
pub const WORD_SIZE: u32 = 4;

#[derive(Clone, Debug)]
pub struct TypePool {
    data: Vec<TypeData>,
    pointers: FxHashMap<TypeId, TypeId>,
    arrays: FxHashMap<(TypeId, Option<u32>), TypeId>,
    arrows: FxHashMap<(SmallVec<[TypeId; 4]>, TypeId), TypeId>,
    /// Type names visible to declarations: built-ins, aliases and structs.
    names: FxHashMap<String, TypeId>,
    /// Declared structs in declaration order.
    structs: Vec<TypeId>,
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

impl TypePool {
    pub fn new() -> Self {
        let mut pool = TypePool {
            data: Vec::with_capacity(64),
            pointers: FxHashMap::default(),
            arrays: FxHashMap::default(),
            arrows: FxHashMap::default(),
            names: FxHashMap::default(),
            structs: Vec::new(),
        };
        let seeded = [
            (TypeId::VOID, TypeData::Primitive(data::VOID)),
            (TypeId::DYN, TypeData::Dyn),
            (TypeId::I8, TypeData::Primitive(data::I8)),
            (TypeId::U8, TypeData::Primitive(data::U8)),
            (TypeId::I16, TypeData::Primitive(data::I16)),
            (TypeId::U16, TypeData::Primitive(data::U16)),
            (TypeId::I32, TypeData::Primitive(data::I32)),
            (TypeId::U32, TypeData::Primitive(data::U32)),
            (TypeId::F32, TypeData::Primitive(data::F32)),
            (TypeId::F64, TypeData::Primitive(data::F64)),
            (TypeId::VOID_PTR, TypeData::Pointer { base: TypeId::VOID }),
            (TypeId::BYTE_PTR, TypeData::Pointer { base: TypeId::U8 }),
        ];
        for (id, ty) in seeded {
            debug_assert_eq!(id.index(), pool.data.len());
            pool.data.push(ty);
        }
        debug_assert_eq!(pool.data.len(), TypeId::FIRST_DYNAMIC as usize);
        pool.pointers.insert(TypeId::VOID, TypeId::VOID_PTR);
        pool.pointers.insert(TypeId::U8, TypeId::BYTE_PTR);

        let builtin_names = [
            ("void", TypeId::VOID),
            ("dyn", TypeId::DYN),
            ("i8", TypeId::I8),
            ("u8", TypeId::U8),
            ("i16", TypeId::I16),
            ("u16", TypeId::U16),
            ("i32", TypeId::I32),
            ("u32", TypeId::U32),
            ("f32", TypeId::F32),
            ("f64", TypeId::F64),
            ("byte", TypeId::U8),
            ("int", TypeId::I32),
            ("uint", TypeId::U32),
            ("float", TypeId::F32),
            ("double", TypeId::F64),
            ("num", TypeId::F64),
        ];
        for (name, id) in builtin_names {
            pool.names.insert(name.to_owned(), id);
        }
        pool
    }

    fn push(&mut self, ty: TypeData) -> TypeId {
        let id = TypeId::from_raw(self.data.len() as u32);
        self.data.push(ty);
        id
    }

    /// Data for `id`. Unset types read as `Dyn`.
    #[inline]
    pub fn get(&self, id: TypeId) -> &TypeData {
        self.data.get(id.index()).unwrap_or(&DYN_DATA)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Names

    pub fn lookup_name(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    pub(crate) fn bind_name(&mut self, name: &str, id: TypeId) {
        self.names.insert(name.to_owned(), id);
    }

    pub fn is_builtin_name(&self, name: &str) -> bool {
        self.lookup_name(name)
            .is_some_and(|id| id.raw() < TypeId::FIRST_DYNAMIC)
    }

    // Construction

    pub fn pointer(&mut self, base: TypeId) -> TypeId {
        if let Some(&id) = self.pointers.get(&base) {
            return id;
        }
        let id = self.push(TypeData::Pointer { base });
        self.pointers.insert(base, id);
        id
    }

    pub fn array(&mut self, base: TypeId, length: Option<u32>) -> TypeId {
        if let Some(&id) = self.arrays.get(&(base, length)) {
            return id;
        }
        let id = self.push(TypeData::Array { base, length });
        self.arrays.insert((base, length), id);
        id
    }

    pub fn arrow(&mut self, params: &[TypeId], ret: TypeId) -> TypeId {
        let key: SmallVec<[TypeId; 4]> = params.iter().copied().collect();
        if let Some(&id) = self.arrows.get(&(key.clone(), ret)) {
            return id;
        }
        let id = self.push(TypeData::Arrow {
            params: key.clone(),
            ret,
        });
        self.arrows.insert((key, ret), id);
        id
    }

    /// A new, empty, unlinted struct.
    pub fn new_struct(&mut self, name: &str) -> TypeId {
        let id = self.push(TypeData::Struct(StructType {
            name: name.to_owned(),
            fields: Vec::new(),
            size: 0,
            align: 1,
            linted: false,
        }));
        self.structs.push(id);
        id
    }

    pub(crate) fn new_alias(&mut self, name: &str) -> TypeId {
        self.push(TypeData::Alias {
            name: name.to_owned(),
        })
    }

    pub fn struct_type(&self, id: TypeId) -> Option<&StructType> {
        match self.get(id) {
            TypeData::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn struct_type_mut(&mut self, id: TypeId) -> Option<&mut StructType> {
        match self.data.get_mut(id.index()) {
            Some(TypeData::Struct(s)) => Some(s),
            _ => None,
        }
    }

    /// Declared structs in declaration order.
    pub fn structs(&self) -> &[TypeId] {
        &self.structs
    }

    // Queries

    pub fn primitive(&self, id: TypeId) -> Option<&Primitive> {
        match self.get(id) {
            TypeData::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Size in bytes.
    pub fn size(&self, id: TypeId) -> u32 {
        match self.get(id) {
            TypeData::Primitive(p) => p.size,
            TypeData::Pointer { .. } | TypeData::Array { length: None, .. } => WORD_SIZE,
            TypeData::Array {
                base,
                length: Some(n),
            } => self.size(*base).saturating_mul(*n),
            TypeData::Struct(s) => s.size,
            TypeData::Dyn | TypeData::Arrow { .. } | TypeData::Alias { .. } => 0,
        }
    }

    /// Alignment class in bytes.
    pub fn align(&self, id: TypeId) -> u32 {
        match self.get(id) {
            TypeData::Primitive(p) => p.size.max(1),
            TypeData::Pointer { .. } | TypeData::Array { length: None, .. } => WORD_SIZE,
            TypeData::Array {
                base,
                length: Some(_),
            } => self.align(*base),
            TypeData::Struct(s) => s.align.max(1),
            TypeData::Dyn | TypeData::Arrow { .. } | TypeData::Alias { .. } => 1,
        }
    }

    /// Element type of a pointer or array.
    pub fn elem(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            TypeData::Pointer { base } | TypeData::Array { base, .. } => Some(*base),
            _ => None,
        }
    }

    /// Units a pointer-like value is counted in: the alignment class of its
    /// element. Untyped and `void` elements are byte-addressed.
    pub fn unit(&self, id: TypeId) -> u32 {
        self.elem(id).map_or(1, |base| self.align(base))
    }

    pub fn is_dyn(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeData::Dyn)
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        id == TypeId::VOID
    }

    pub fn is_pointer_like(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeData::Pointer { .. } | TypeData::Array { .. })
    }

    pub fn is_struct(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeData::Struct(_))
    }

    /// Values that live in memory as a block: structs and sized arrays.
    pub fn is_aggregate(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            TypeData::Struct(_) | TypeData::Array { length: Some(_), .. }
        )
    }

    pub fn is_integral(&self, id: TypeId) -> bool {
        self.primitive(id).is_some_and(Primitive::is_integral)
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        self.primitive(id).is_some_and(|p| p.float)
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.primitive(id).is_some_and(|p| p.size > 0)
    }

    pub fn is_signed(&self, id: TypeId) -> bool {
        self.primitive(id).is_some_and(|p| p.signed)
    }

    /// Width in bits as a conversion source. Pointers and untyped values
    /// count as 32.
    pub fn bit_width(&self, id: TypeId) -> u32 {
        match self.primitive(id) {
            Some(p) if p.size > 0 => p.size * 8,
            _ => 32,
        }
    }

    /// Scale applied to an integer added to a pointer: element size in
    /// units of the pointer.
    pub fn pointer_scale(&self, id: TypeId) -> u32 {
        let Some(base) = self.elem(id) else {
            return 1;
        };
        let size = self.size(base);
        if size == 0 {
            1
        } else {
            (size / self.unit(id)).max(1)
        }
    }

    /// Source-like rendering for diagnostics.
    pub fn display(&self, id: TypeId) -> String {
        if id.is_none() {
            return "<untyped>".to_owned();
        }
        match self.get(id) {
            TypeData::Dyn => "dyn".to_owned(),
            TypeData::Primitive(p) => p.name.to_owned(),
            TypeData::Pointer { base } => format!("*{}", self.display(*base)),
            TypeData::Array { base, length } => match length {
                Some(n) => format!("{}[{n}]", self.display(*base)),
                None => format!("{}[]", self.display(*base)),
            },
            TypeData::Struct(s) => s.name.clone(),
            TypeData::Arrow { params, ret } => {
                let params: Vec<String> = params.iter().map(|p| self.display(*p)).collect();
                format!("({}) -> {}", params.join(", "), self.display(*ret))
            }
            TypeData::Alias { name } => name.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
