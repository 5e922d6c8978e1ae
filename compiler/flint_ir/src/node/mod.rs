//! Tree nodes.
//!
//! Node kinds form a closed enum covering statements and expressions. Child
//! links are [`NodeId`]s into the owning [`Tree`](crate::Tree); scalar payload
//! (names, operators, type syntax) is stored inline.

mod operators;

use std::fmt;

pub use operators::{BinaryOp, DeclKind, UnaryOp, UpdateOp};

use crate::{Span, TypeExpr};

/// Index into the node arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Invalid node ID (sentinel value).
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "NodeId({})", self.0)
        } else {
            write!(f, "NodeId::INVALID")
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Literal values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    Str(String),
}

impl Literal {
    /// Numeric value of a numeric literal.
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Literal::Int(v) => Some(v as f64),
            Literal::Float(v) => Some(v),
            _ => None,
        }
    }
}

/// A function parameter. Untyped parameters are dynamic.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Option<TypeExpr>, span: Span) -> Self {
        Param {
            name: name.into(),
            ty,
            span,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    // Statements
    Program {
        body: Vec<NodeId>,
    },
    FunctionDecl {
        name: String,
        params: Vec<Param>,
        ret: Option<TypeExpr>,
        body: NodeId,
    },
    VarDecl {
        kind: DeclKind,
        decls: Vec<NodeId>,
    },
    VarDeclarator {
        name: String,
        ty: Option<TypeExpr>,
        init: Option<NodeId>,
    },
    /// `typedef T Name;`
    TypeAlias {
        name: String,
        ty: TypeExpr,
    },
    StructDecl {
        name: String,
        fields: Vec<crate::FieldSyntax>,
    },
    /// Names provided by the target environment, kept unmangled.
    Extern {
        names: Vec<String>,
    },
    Block {
        body: Vec<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    If {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },
    While {
        test: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        test: NodeId,
    },
    For {
        init: Option<NodeId>,
        test: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    },
    Return {
        arg: Option<NodeId>,
    },
    Break,
    Continue,
    #[default]
    Empty,

    // Expressions
    Ident {
        name: String,
    },
    Literal(Literal),
    Unary {
        op: UnaryOp,
        arg: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign {
        op: Option<BinaryOp>,
        target: NodeId,
        value: NodeId,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: NodeId,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    /// `object.property`, or `object->property` when `arrow` is set.
    Member {
        object: NodeId,
        property: String,
        arrow: bool,
    },
    /// `object[index]`
    Index {
        object: NodeId,
        index: NodeId,
    },
    Deref {
        arg: NodeId,
    },
    AddressOf {
        arg: NodeId,
    },
    Cast {
        ty: TypeExpr,
        arg: NodeId,
    },
    Sizeof {
        ty: TypeExpr,
    },
    /// `new T` or `new T[count]`
    New {
        ty: TypeExpr,
        count: Option<NodeId>,
    },
    Delete {
        arg: NodeId,
    },
    Sequence {
        exprs: Vec<NodeId>,
    },
    Conditional {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
    /// Address of a stack slot, by the variable's output name. Introduced
    /// during type transformation and resolved to a stack-pointer offset
    /// during lowering.
    StackAddress {
        name: String,
    },
}

/// A mutable child link of a node.
pub enum SlotMut<'a> {
    One(&'a mut NodeId),
    Opt(&'a mut Option<NodeId>),
    List(&'a mut Vec<NodeId>),
}

impl NodeKind {
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::Ident { .. }
                | NodeKind::Literal(_)
                | NodeKind::Unary { .. }
                | NodeKind::Binary { .. }
                | NodeKind::Assign { .. }
                | NodeKind::Update { .. }
                | NodeKind::Call { .. }
                | NodeKind::Member { .. }
                | NodeKind::Index { .. }
                | NodeKind::Deref { .. }
                | NodeKind::AddressOf { .. }
                | NodeKind::Cast { .. }
                | NodeKind::Sizeof { .. }
                | NodeKind::New { .. }
                | NodeKind::Delete { .. }
                | NodeKind::Sequence { .. }
                | NodeKind::Conditional { .. }
                | NodeKind::StackAddress { .. }
        )
    }

    /// Short name of the kind, for logs and validation messages.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::FunctionDecl { .. } => "FunctionDecl",
            NodeKind::VarDecl { .. } => "VarDecl",
            NodeKind::VarDeclarator { .. } => "VarDeclarator",
            NodeKind::TypeAlias { .. } => "TypeAlias",
            NodeKind::StructDecl { .. } => "StructDecl",
            NodeKind::Extern { .. } => "Extern",
            NodeKind::Block { .. } => "Block",
            NodeKind::ExprStmt { .. } => "ExprStmt",
            NodeKind::If { .. } => "If",
            NodeKind::While { .. } => "While",
            NodeKind::DoWhile { .. } => "DoWhile",
            NodeKind::For { .. } => "For",
            NodeKind::Return { .. } => "Return",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Empty => "Empty",
            NodeKind::Ident { .. } => "Ident",
            NodeKind::Literal(_) => "Literal",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::Binary { .. } => "Binary",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::Update { .. } => "Update",
            NodeKind::Call { .. } => "Call",
            NodeKind::Member { .. } => "Member",
            NodeKind::Index { .. } => "Index",
            NodeKind::Deref { .. } => "Deref",
            NodeKind::AddressOf { .. } => "AddressOf",
            NodeKind::Cast { .. } => "Cast",
            NodeKind::Sizeof { .. } => "Sizeof",
            NodeKind::New { .. } => "New",
            NodeKind::Delete { .. } => "Delete",
            NodeKind::Sequence { .. } => "Sequence",
            NodeKind::Conditional { .. } => "Conditional",
            NodeKind::StackAddress { .. } => "StackAddress",
        }
    }

    /// Child links in evaluation order.
    pub fn slots_mut(&mut self) -> Vec<SlotMut<'_>> {
        use SlotMut::{List, One, Opt};
        match self {
            NodeKind::Program { body } | NodeKind::Block { body } => vec![List(body)],
            NodeKind::FunctionDecl { body, .. } => vec![One(body)],
            NodeKind::VarDecl { decls, .. } => vec![List(decls)],
            NodeKind::VarDeclarator { init, .. } => vec![Opt(init)],
            NodeKind::ExprStmt { expr } => vec![One(expr)],
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => vec![One(test), One(consequent), Opt(alternate)],
            NodeKind::While { test, body } => vec![One(test), One(body)],
            NodeKind::DoWhile { body, test } => vec![One(body), One(test)],
            NodeKind::For {
                init,
                test,
                update,
                body,
            } => vec![Opt(init), Opt(test), Opt(update), One(body)],
            NodeKind::Return { arg } => vec![Opt(arg)],
            NodeKind::Unary { arg, .. }
            | NodeKind::Update { arg, .. }
            | NodeKind::Deref { arg }
            | NodeKind::AddressOf { arg }
            | NodeKind::Cast { arg, .. }
            | NodeKind::Delete { arg } => vec![One(arg)],
            NodeKind::Binary { left, right, .. } => vec![One(left), One(right)],
            NodeKind::Assign { target, value, .. } => vec![One(target), One(value)],
            NodeKind::Call { callee, args } => vec![One(callee), List(args)],
            NodeKind::Member { object, .. } => vec![One(object)],
            NodeKind::Index { object, index } => vec![One(object), One(index)],
            NodeKind::New { count, .. } => vec![Opt(count)],
            NodeKind::Sequence { exprs } => vec![List(exprs)],
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => vec![One(test), One(consequent), One(alternate)],
            NodeKind::TypeAlias { .. }
            | NodeKind::StructDecl { .. }
            | NodeKind::Extern { .. }
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Empty
            | NodeKind::Ident { .. }
            | NodeKind::Literal(_)
            | NodeKind::Sizeof { .. }
            | NodeKind::StackAddress { .. } => Vec::new(),
        }
    }

    /// Children in evaluation order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Program { body } | NodeKind::Block { body } => body.clone(),
            NodeKind::VarDecl { decls, .. } => decls.clone(),
            NodeKind::Sequence { exprs } => exprs.clone(),
            NodeKind::FunctionDecl { body, .. } => vec![*body],
            NodeKind::VarDeclarator { init, .. } => init.iter().copied().collect(),
            NodeKind::Return { arg } => arg.iter().copied().collect(),
            NodeKind::New { count, .. } => count.iter().copied().collect(),
            NodeKind::ExprStmt { expr } => vec![*expr],
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                let mut out = vec![*test, *consequent];
                out.extend(alternate.iter().copied());
                out
            }
            NodeKind::While { test, body } => vec![*test, *body],
            NodeKind::DoWhile { body, test } => vec![*body, *test],
            NodeKind::For {
                init,
                test,
                update,
                body,
            } => init
                .iter()
                .chain(test.iter())
                .chain(update.iter())
                .copied()
                .chain(std::iter::once(*body))
                .collect(),
            NodeKind::Unary { arg, .. }
            | NodeKind::Update { arg, .. }
            | NodeKind::Deref { arg }
            | NodeKind::AddressOf { arg }
            | NodeKind::Cast { arg, .. }
            | NodeKind::Delete { arg } => vec![*arg],
            NodeKind::Binary { left, right, .. } => vec![*left, *right],
            NodeKind::Assign { target, value, .. } => vec![*target, *value],
            NodeKind::Call { callee, args } => {
                let mut out = vec![*callee];
                out.extend(args.iter().copied());
                out
            }
            NodeKind::Member { object, .. } => vec![*object],
            NodeKind::Index { object, index } => vec![*object, *index],
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => vec![*test, *consequent, *alternate],
            NodeKind::TypeAlias { .. }
            | NodeKind::StructDecl { .. }
            | NodeKind::Extern { .. }
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Empty
            | NodeKind::Ident { .. }
            | NodeKind::Literal(_)
            | NodeKind::Sizeof { .. }
            | NodeKind::StackAddress { .. } => Vec::new(),
        }
    }
}

/// A node in the arena.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Already finalised; rewrite passes skip this node and its subtree.
    pub fixed: bool,
}

#[cfg(test)]
mod tests;
