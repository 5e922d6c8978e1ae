//! Type data stored in the pool.

use flint_ir::TypeId;
use smallvec::SmallVec;

/// A fixed-width scalar.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Primitive {
    pub name: &'static str,
    /// Size in bytes; 0 for `void`.
    pub size: u32,
    pub signed: bool,
    pub float: bool,
    /// Value an uninitialised variable of this type starts with.
    pub default_value: i64,
}

impl Primitive {
    const fn int(name: &'static str, size: u32, signed: bool) -> Self {
        Primitive {
            name,
            size,
            signed,
            float: false,
            default_value: 0,
        }
    }

    const fn float(name: &'static str, size: u32) -> Self {
        Primitive {
            name,
            size,
            signed: true,
            float: true,
            default_value: 0,
        }
    }

    pub const fn is_integral(&self) -> bool {
        !self.float && self.size > 0
    }
}

pub(crate) const VOID: Primitive = Primitive::int("void", 0, false);
pub(crate) const I8: Primitive = Primitive::int("i8", 1, true);
pub(crate) const U8: Primitive = Primitive::int("u8", 1, false);
pub(crate) const I16: Primitive = Primitive::int("i16", 2, true);
pub(crate) const U16: Primitive = Primitive::int("u16", 2, false);
pub(crate) const I32: Primitive = Primitive::int("i32", 4, true);
pub(crate) const U32: Primitive = Primitive::int("u32", 4, false);
pub(crate) const F32: Primitive = Primitive::float("f32", 4);
pub(crate) const F64: Primitive = Primitive::float("f64", 8);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    /// Byte offset, set by lint.
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<Field>,
    /// Set by lint.
    pub size: u32,
    /// Set by lint.
    pub align: u32,
    pub linted: bool,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    /// No static type.
    Dyn,
    Primitive(Primitive),
    Pointer {
        base: TypeId,
    },
    /// Pointer-like; a static length makes it an inline aggregate.
    Array {
        base: TypeId,
        length: Option<u32>,
    },
    Struct(StructType),
    Arrow {
        params: SmallVec<[TypeId; 4]>,
        ret: TypeId,
    },
    /// Placeholder for a declared alias that has not been resolved yet.
    Alias {
        name: String,
    },
}
