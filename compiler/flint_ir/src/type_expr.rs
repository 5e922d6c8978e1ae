//! Type syntax as written in declarations.
//!
//! This is the mini-schema the parser emits for type positions. It is
//! reflected into interned types by `flint_types` (construct, resolve, lint).

use crate::Span;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeExpr {
    /// `i32`, `Point`, `NodePtr`
    Named(String),
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `T[n]` or `T[]`
    Array(Box<TypeExpr>, Option<u32>),
    /// Anonymous `struct { ... }`
    Struct(Vec<FieldSyntax>),
    /// `(A, B) -> R`
    Arrow(Vec<TypeExpr>, Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    #[must_use]
    pub fn pointer(self) -> Self {
        TypeExpr::Pointer(Box::new(self))
    }

    #[must_use]
    pub fn array(self, len: Option<u32>) -> Self {
        TypeExpr::Array(Box::new(self), len)
    }
}

/// One field of a struct declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldSyntax {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

impl FieldSyntax {
    pub fn new(name: impl Into<String>, ty: TypeExpr, span: Span) -> Self {
        FieldSyntax {
            name: name.into(),
            ty,
            span,
        }
    }
}
