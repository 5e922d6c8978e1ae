//! Handles to interned types.
//!
//! The pool that owns the type data lives in `flint_types`; the tree only
//! stores these 4-byte handles in its `ty` side-table. Built-in types occupy
//! fixed indices so they can be named without a pool.

use std::fmt;

/// Index of a type in the type pool.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    /// No static type: the value is whatever the target runtime holds.
    pub const DYN: TypeId = TypeId(1);
    pub const I8: TypeId = TypeId(2);
    pub const U8: TypeId = TypeId(3);
    pub const I16: TypeId = TypeId(4);
    pub const U16: TypeId = TypeId(5);
    pub const I32: TypeId = TypeId(6);
    pub const U32: TypeId = TypeId(7);
    pub const F32: TypeId = TypeId(8);
    pub const F64: TypeId = TypeId(9);
    /// `*void`, the type of `null`.
    pub const VOID_PTR: TypeId = TypeId(10);
    /// `*u8`, the runtime allocator's pointer type.
    pub const BYTE_PTR: TypeId = TypeId(11);

    /// First index handed out for user-constructed types.
    pub const FIRST_DYNAMIC: u32 = 12;

    /// Not yet typed.
    pub const NONE: TypeId = TypeId(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub const fn is_dyn(self) -> bool {
        self.0 == Self::DYN.0
    }
}

impl Default for TypeId {
    fn default() -> Self {
        TypeId::NONE
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "TypeId::NONE")
        } else {
            write!(f, "TypeId({})", self.0)
        }
    }
}

const _: () = assert!(std::mem::size_of::<TypeId>() == 4);
