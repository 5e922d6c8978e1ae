//! Type system for the Flint lowering compiler.
//!
//! - [`TypePool`]: interned types behind [`TypeId`](flint_ir::TypeId) handles
//! - [`resolve`]: type declarations and type-syntax reflection
//! - [`layout`]: struct layout
//! - [`assign`]: assignability
//! - [`convert`]: numeric and pointer conversion code
//! - [`memory`]: views and address arithmetic

pub mod assign;
pub mod convert;
mod data;
mod error;
pub mod layout;
pub mod memory;
mod pool;
pub mod resolve;

pub use assign::assignable_from;
pub use convert::{CastKind, Converter};
pub use data::{Field, Primitive, StructType, TypeData};
pub use error::TypeError;
pub use memory::{MemoryAccess, ViewKind};
pub use pool::{TypePool, WORD_SIZE};
pub use resolve::{resolve_declarations, Resolver, TypeDecl, TypeDeclKind};
