//! Shared helpers for the lowering tests.
//!
//! `render` prints a tree as compact target source so expectations can be
//! written as strings. Every binary operation is parenthesized; statements
//! inside a block are separated by single spaces and top-level statements
//! by newlines.

#![allow(dead_code)]

use flint_diagnostic::Diagnostic;
use flint_ir::{DeclKind, Literal, NodeId, NodeKind, Tree};
use flint_lower::{compile, CompileFailure, CompileOptions, CompileOutput};

pub fn render(tree: &Tree, id: NodeId) -> String {
    match tree.kind(id) {
        NodeKind::Program { body } => list(tree, body, "\n"),
        NodeKind::FunctionDecl {
            name, params, body, ..
        } => {
            let params: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
            format!("function {name}({}) {}", params.join(", "), render(tree, *body))
        }
        NodeKind::VarDecl { .. } => format!("{};", declaration(tree, id)),
        NodeKind::VarDeclarator { name, init, .. } => match init {
            Some(init) => format!("{name} = {}", render(tree, *init)),
            None => name.clone(),
        },
        NodeKind::TypeAlias { name, .. } => format!("typedef {name};"),
        NodeKind::StructDecl { name, .. } => format!("struct {name};"),
        NodeKind::Extern { names } => format!("extern {};", names.join(", ")),
        NodeKind::Block { body } if body.is_empty() => "{}".to_owned(),
        NodeKind::Block { body } => format!("{{ {} }}", list(tree, body, " ")),
        NodeKind::ExprStmt { expr } => format!("{};", render(tree, *expr)),
        NodeKind::If {
            test,
            consequent,
            alternate,
        } => {
            let mut out = format!("if ({}) {}", render(tree, *test), render(tree, *consequent));
            if let Some(alternate) = alternate {
                out.push_str(&format!(" else {}", render(tree, *alternate)));
            }
            out
        }
        NodeKind::While { test, body } => {
            format!("while ({}) {}", render(tree, *test), render(tree, *body))
        }
        NodeKind::DoWhile { body, test } => {
            format!("do {} while ({});", render(tree, *body), render(tree, *test))
        }
        NodeKind::For {
            init,
            test,
            update,
            body,
        } => {
            let init = init.map_or_else(String::new, |init| match tree.kind(init) {
                NodeKind::VarDecl { .. } => declaration(tree, init),
                _ => render(tree, init),
            });
            let part = |node: &Option<NodeId>| node.map_or_else(String::new, |n| render(tree, n));
            format!(
                "for ({init}; {}; {}) {}",
                part(test),
                part(update),
                render(tree, *body)
            )
        }
        NodeKind::Return { arg: Some(arg) } => format!("return {};", render(tree, *arg)),
        NodeKind::Return { arg: None } => "return;".to_owned(),
        NodeKind::Break => "break;".to_owned(),
        NodeKind::Continue => "continue;".to_owned(),
        NodeKind::Empty => ";".to_owned(),

        NodeKind::Ident { name } => name.clone(),
        NodeKind::Literal(literal) => match literal {
            Literal::Int(v) => v.to_string(),
            Literal::Float(v) => v.to_string(),
            Literal::Bool(v) => v.to_string(),
            Literal::Null => "null".to_owned(),
            Literal::Str(s) => format!("{s:?}"),
        },
        NodeKind::Unary { op, arg } => {
            let symbol = op.as_symbol();
            if symbol.chars().all(char::is_alphabetic) {
                format!("({symbol} {})", render(tree, *arg))
            } else {
                format!("({symbol}{})", render(tree, *arg))
            }
        }
        NodeKind::Binary { op, left, right } => format!(
            "({} {} {})",
            render(tree, *left),
            op.as_symbol(),
            render(tree, *right)
        ),
        NodeKind::Assign { op, target, value } => format!(
            "{} {}= {}",
            render(tree, *target),
            op.map_or("", |op| op.as_symbol()),
            render(tree, *value)
        ),
        NodeKind::Update { op, prefix: true, arg } => {
            format!("{}{}", op.as_symbol(), render(tree, *arg))
        }
        NodeKind::Update { op, arg, .. } => format!("{}{}", render(tree, *arg), op.as_symbol()),
        NodeKind::Call { callee, args } => {
            format!("{}({})", render(tree, *callee), list(tree, args, ", "))
        }
        NodeKind::Member {
            object,
            property,
            arrow,
        } => {
            let sep = if *arrow { "->" } else { "." };
            format!("{}{sep}{property}", render(tree, *object))
        }
        NodeKind::Index { object, index } => {
            format!("{}[{}]", render(tree, *object), render(tree, *index))
        }
        NodeKind::Deref { arg } => format!("(*{})", render(tree, *arg)),
        NodeKind::AddressOf { arg } => format!("(&{})", render(tree, *arg)),
        NodeKind::Cast { arg, .. } => format!("cast({})", render(tree, *arg)),
        NodeKind::Sizeof { .. } => "sizeof(..)".to_owned(),
        NodeKind::New { .. } => "new(..)".to_owned(),
        NodeKind::Delete { arg } => format!("delete {}", render(tree, *arg)),
        NodeKind::Sequence { exprs } => format!("({})", list(tree, exprs, ", ")),
        NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } => format!(
            "({} ? {} : {})",
            render(tree, *test),
            render(tree, *consequent),
            render(tree, *alternate)
        ),
        NodeKind::StackAddress { name } => format!("stack({name})"),
    }
}

fn list(tree: &Tree, ids: &[NodeId], sep: &str) -> String {
    ids.iter()
        .map(|&id| render(tree, id))
        .collect::<Vec<_>>()
        .join(sep)
}

fn declaration(tree: &Tree, id: NodeId) -> String {
    let NodeKind::VarDecl { kind, decls } = tree.kind(id) else {
        return render(tree, id);
    };
    let keyword = match kind {
        DeclKind::Var => "var",
        DeclKind::Let => "let",
        DeclKind::Const => "const",
    };
    format!("{keyword} {}", list(tree, decls, ", "))
}

/// Compile and render, panicking with the diagnostics on failure.
pub fn lower(tree: &mut Tree, root: NodeId, options: &CompileOptions) -> (String, CompileOutput) {
    match compile(tree, root, options) {
        Ok(output) => (render(tree, output.root), output),
        Err(failure) => panic!("compile failed: {}\n{:#?}", failure.error, failure.diagnostics),
    }
}

/// Compile, expecting failure.
pub fn reject(tree: &mut Tree, root: NodeId) -> CompileFailure {
    match compile(tree, root, &CompileOptions::default()) {
        Ok(output) => panic!("expected failure, got:\n{}", render(tree, output.root)),
        Err(failure) => failure,
    }
}

pub fn codes(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.code.to_string()).collect()
}
