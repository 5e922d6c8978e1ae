//! Tree representation for the Flint lowering compiler.
//!
//! The parser (external) produces a [`Tree`]: an arena of [`Node`]s whose
//! kinds form the closed [`NodeKind`] enum. Type positions are carried as
//! [`TypeExpr`] syntax until the type system reflects them into [`TypeId`]
//! handles, which are stored in the tree's `ty` side-table.
//!
//! Every compiler pass is a bottom-up rewrite driven by [`pass::rewrite`];
//! after the final pass the same tree is handed to the target renderer.

mod builder;
mod node;
pub mod pass;
mod span;
pub mod stack;
mod tree;
mod type_expr;
mod type_id;

pub use builder::{ptr, ty, TreeBuilder};
pub use node::{
    BinaryOp, DeclKind, Literal, Node, NodeId, NodeKind, Param, SlotMut, UnaryOp, UpdateOp,
};
pub use pass::{Pass, Rewrite};
pub use span::{Position, Span};
pub use tree::Tree;
pub use type_expr::{FieldSyntax, TypeExpr};
pub use type_id::TypeId;
