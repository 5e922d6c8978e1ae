//! Convenience constructor for trees.
//!
//! Parsers and tests build trees through this instead of spelling out
//! [`NodeKind`] literals. Every node gets the builder's current span, moved
//! with [`TreeBuilder::at`].

use crate::{
    BinaryOp, DeclKind, FieldSyntax, Literal, NodeId, NodeKind, Param, Span, Tree, TypeExpr,
    UnaryOp, UpdateOp,
};

#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Tree,
    span: Span,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            tree: Tree::new(),
            span: Span::on_line(1, 1, 1),
        }
    }

    /// Place subsequent nodes at `line:column`.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.span = Span::on_line(line, column, 1);
        self
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn node(&mut self, kind: NodeKind) -> NodeId {
        self.tree.alloc(kind, self.span)
    }

    // Statements

    pub fn program(&mut self, body: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Program { body })
    }

    pub fn function(
        &mut self,
        name: &str,
        params: Vec<Param>,
        ret: Option<TypeExpr>,
        body: Vec<NodeId>,
    ) -> NodeId {
        let body = self.block(body);
        self.node(NodeKind::FunctionDecl {
            name: name.to_owned(),
            params,
            ret,
            body,
        })
    }

    pub fn param(&self, name: &str, ty: Option<TypeExpr>) -> Param {
        Param::new(name, ty, self.span)
    }

    pub fn declarator(&mut self, name: &str, ty: Option<TypeExpr>, init: Option<NodeId>) -> NodeId {
        self.node(NodeKind::VarDeclarator {
            name: name.to_owned(),
            ty,
            init,
        })
    }

    pub fn decl(&mut self, kind: DeclKind, decls: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::VarDecl { kind, decls })
    }

    /// `var name: ty = init;` with a single declarator.
    pub fn var(&mut self, name: &str, ty: Option<TypeExpr>, init: Option<NodeId>) -> NodeId {
        let declarator = self.declarator(name, ty, init);
        self.decl(DeclKind::Var, vec![declarator])
    }

    pub fn type_alias(&mut self, name: &str, ty: TypeExpr) -> NodeId {
        self.node(NodeKind::TypeAlias {
            name: name.to_owned(),
            ty,
        })
    }

    pub fn struct_decl(&mut self, name: &str, fields: Vec<(&str, TypeExpr)>) -> NodeId {
        let span = self.span;
        let fields = fields
            .into_iter()
            .map(|(field, ty)| FieldSyntax::new(field, ty, span))
            .collect();
        self.node(NodeKind::StructDecl {
            name: name.to_owned(),
            fields,
        })
    }

    pub fn extern_names(&mut self, names: &[&str]) -> NodeId {
        self.node(NodeKind::Extern {
            names: names.iter().map(|&n| n.to_owned()).collect(),
        })
    }

    pub fn block(&mut self, body: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Block { body })
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.node(NodeKind::ExprStmt { expr })
    }

    pub fn if_stmt(&mut self, test: NodeId, consequent: NodeId, alternate: Option<NodeId>) -> NodeId {
        self.node(NodeKind::If {
            test,
            consequent,
            alternate,
        })
    }

    pub fn while_stmt(&mut self, test: NodeId, body: NodeId) -> NodeId {
        self.node(NodeKind::While { test, body })
    }

    pub fn for_stmt(
        &mut self,
        init: Option<NodeId>,
        test: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.node(NodeKind::For {
            init,
            test,
            update,
            body,
        })
    }

    pub fn ret(&mut self, arg: Option<NodeId>) -> NodeId {
        self.node(NodeKind::Return { arg })
    }

    // Expressions

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.node(NodeKind::Ident {
            name: name.to_owned(),
        })
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.node(NodeKind::Literal(Literal::Int(value)))
    }

    pub fn float(&mut self, value: f64) -> NodeId {
        self.node(NodeKind::Literal(Literal::Float(value)))
    }

    pub fn null(&mut self) -> NodeId {
        self.node(NodeKind::Literal(Literal::Null))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.node(NodeKind::Literal(Literal::Str(value.to_owned())))
    }

    pub fn unary(&mut self, op: UnaryOp, arg: NodeId) -> NodeId {
        self.node(NodeKind::Unary { op, arg })
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.node(NodeKind::Binary { op, left, right })
    }

    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.node(NodeKind::Assign {
            op: None,
            target,
            value,
        })
    }

    pub fn compound_assign(&mut self, op: BinaryOp, target: NodeId, value: NodeId) -> NodeId {
        self.node(NodeKind::Assign {
            op: Some(op),
            target,
            value,
        })
    }

    pub fn update(&mut self, op: UpdateOp, prefix: bool, arg: NodeId) -> NodeId {
        self.node(NodeKind::Update { op, prefix, arg })
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Call { callee, args })
    }

    /// `object.property`
    pub fn member(&mut self, object: NodeId, property: &str) -> NodeId {
        self.node(NodeKind::Member {
            object,
            property: property.to_owned(),
            arrow: false,
        })
    }

    /// `object->property`
    pub fn arrow(&mut self, object: NodeId, property: &str) -> NodeId {
        self.node(NodeKind::Member {
            object,
            property: property.to_owned(),
            arrow: true,
        })
    }

    pub fn index(&mut self, object: NodeId, index: NodeId) -> NodeId {
        self.node(NodeKind::Index { object, index })
    }

    pub fn deref(&mut self, arg: NodeId) -> NodeId {
        self.node(NodeKind::Deref { arg })
    }

    pub fn address_of(&mut self, arg: NodeId) -> NodeId {
        self.node(NodeKind::AddressOf { arg })
    }

    pub fn cast(&mut self, ty: TypeExpr, arg: NodeId) -> NodeId {
        self.node(NodeKind::Cast { ty, arg })
    }

    pub fn sizeof(&mut self, ty: TypeExpr) -> NodeId {
        self.node(NodeKind::Sizeof { ty })
    }

    pub fn new_object(&mut self, ty: TypeExpr, count: Option<NodeId>) -> NodeId {
        self.node(NodeKind::New { ty, count })
    }

    pub fn delete(&mut self, arg: NodeId) -> NodeId {
        self.node(NodeKind::Delete { arg })
    }

    pub fn sequence(&mut self, exprs: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Sequence { exprs })
    }

    pub fn conditional(&mut self, test: NodeId, consequent: NodeId, alternate: NodeId) -> NodeId {
        self.node(NodeKind::Conditional {
            test,
            consequent,
            alternate,
        })
    }
}

/// Shorthand for a named type.
pub fn ty(name: &str) -> TypeExpr {
    TypeExpr::named(name)
}

/// Shorthand for `*name`.
pub fn ptr(name: &str) -> TypeExpr {
    TypeExpr::named(name).pointer()
}
