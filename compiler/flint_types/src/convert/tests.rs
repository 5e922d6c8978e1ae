use super::*;
use flint_diagnostic::ErrorCode;
use flint_ir::Span;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn span() -> Span {
    Span::on_line(2, 9, 3)
}

fn shape(tree: &Tree, id: NodeId) -> String {
    match tree.kind(id) {
        NodeKind::Ident { name } => name.clone(),
        NodeKind::Literal(Literal::Int(v)) => v.to_string(),
        NodeKind::Literal(Literal::Float(v)) => format!("{v:?}"),
        NodeKind::Unary { op: UnaryOp::Plus, arg } => format!("+{}", shape(tree, *arg)),
        NodeKind::Unary { op: UnaryOp::Neg, arg } => format!("-{}", shape(tree, *arg)),
        NodeKind::Binary { op, left, right } => {
            format!("({} {} {})", shape(tree, *left), op.as_symbol(), shape(tree, *right))
        }
        other => format!("{other:?}"),
    }
}

struct Fixture {
    tree: Tree,
    pool: TypePool,
    diagnostics: DiagnosticQueue,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            tree: Tree::new(),
            pool: TypePool::new(),
            diagnostics: DiagnosticQueue::new(),
        }
    }

    fn var(&mut self, name: &str, ty: TypeId) -> NodeId {
        self.tree
            .alloc_typed(NodeKind::Ident { name: name.to_owned() }, span(), ty)
    }

    fn int(&mut self, v: i64, ty: TypeId) -> NodeId {
        self.tree.alloc_typed(NodeKind::Literal(Literal::Int(v)), span(), ty)
    }

    fn convert(&mut self, expr: NodeId, target: TypeId, kind: CastKind) -> NodeId {
        Converter {
            tree: &mut self.tree,
            pool: &self.pool,
            diagnostics: &mut self.diagnostics,
            warnings: WarningClass::all(),
        }
        .convert(expr, target, kind)
    }

    fn codes(&self) -> Vec<ErrorCode> {
        self.diagnostics.pending().iter().map(|d| d.code).collect()
    }
}

#[test]
fn test_wrap_integer_examples() {
    assert_eq!(wrap_integer(300.0, 8, false), 44);
    assert_eq!(wrap_integer(300.0, 8, true), 44);
    assert_eq!(wrap_integer(200.0, 8, true), -56);
    assert_eq!(wrap_integer(-1.0, 32, false), 4_294_967_295);
    assert_eq!(wrap_integer(3.9, 32, true), 3);
    assert_eq!(wrap_integer(-3.9, 32, true), -3);
    assert_eq!(wrap_integer(f64::NAN, 16, true), 0);
    assert_eq!(wrap_integer(f64::INFINITY, 16, true), 0);
}

proptest! {
    #[test]
    fn wrap_integer_matches_native_casts(v in any::<i64>()) {
        let f = v as f64;
        let word = f.trunc().rem_euclid(4_294_967_296.0) as u32;
        prop_assert_eq!(wrap_integer(f, 8, true), i64::from(word as i8));
        prop_assert_eq!(wrap_integer(f, 8, false), i64::from(word as u8));
        prop_assert_eq!(wrap_integer(f, 16, true), i64::from(word as i16));
        prop_assert_eq!(wrap_integer(f, 16, false), i64::from(word as u16));
        prop_assert_eq!(wrap_integer(f, 32, true), i64::from(word as i32));
        prop_assert_eq!(wrap_integer(f, 32, false), i64::from(word));
    }

    #[test]
    fn wrap_integer_is_idempotent(v in -1.0e12f64..1.0e12, width in prop::sample::select(vec![8u32, 16, 32]), signed in any::<bool>()) {
        let once = wrap_integer(v, width, signed);
        prop_assert_eq!(wrap_integer(once as f64, width, signed), once);
    }
}

#[test]
fn test_constant_value() {
    let mut f = Fixture::new();
    let five = f.int(5, TypeId::I32);
    let neg = f
        .tree
        .alloc_typed(NodeKind::Unary { op: UnaryOp::Neg, arg: five }, span(), TypeId::I32);
    let not = f
        .tree
        .alloc_typed(NodeKind::Unary { op: UnaryOp::BitNot, arg: neg }, span(), TypeId::I32);
    let x = f.var("x", TypeId::I32);
    assert_eq!(constant_value(&f.tree, neg), Some(-5.0));
    assert_eq!(constant_value(&f.tree, not), Some(4.0));
    assert_eq!(constant_value(&f.tree, x), None);
}

#[test]
fn test_same_type_is_untouched() {
    let mut f = Fixture::new();
    let x = f.var("x", TypeId::I32);
    assert_eq!(f.convert(x, TypeId::I32, CastKind::Implicit), x);
    assert_eq!(f.convert(x, TypeId::DYN, CastKind::Implicit), x);
    assert!(f.diagnostics.is_empty());
}

#[test]
fn test_fitting_constant_is_retyped() {
    let mut f = Fixture::new();
    let lit = f.int(100, TypeId::I32);
    let out = f.convert(lit, TypeId::U8, CastKind::Implicit);
    assert_eq!(out, lit);
    assert_eq!(f.tree.ty(lit), TypeId::U8);
    assert!(f.diagnostics.is_empty());
}

#[test]
fn test_overflowing_constant_warns_and_masks() {
    let mut f = Fixture::new();
    let lit = f.int(300, TypeId::I32);
    let out = f.convert(lit, TypeId::U8, CastKind::Implicit);
    assert_eq!(shape(&f.tree, out), "(300 & 255)");
    assert_eq!(f.tree.ty(out), TypeId::U8);
    assert_eq!(f.codes(), vec![ErrorCode::W1001]);
    assert!(f.diagnostics.pending()[0].message.contains("44"));
}

#[test]
fn test_signed_narrowing_sign_extends() {
    let mut f = Fixture::new();
    let x = f.var("x", TypeId::I32);
    let out = f.convert(x, TypeId::I8, CastKind::Implicit);
    assert_eq!(shape(&f.tree, out), "(((x & 255) << 24) >> 24)");
    assert_eq!(f.tree.ty(out), TypeId::I8);
    assert_eq!(f.codes(), vec![ErrorCode::W1002]);
}

#[test]
fn test_explicit_narrowing_is_silent() {
    let mut f = Fixture::new();
    let x = f.var("x", TypeId::U32);
    let out = f.convert(x, TypeId::U16, CastKind::Explicit);
    assert_eq!(shape(&f.tree, out), "(x & 65535)");
    assert!(f.diagnostics.is_empty());
}

#[test]
fn test_word_conversions() {
    let mut f = Fixture::new();
    let x = f.var("x", TypeId::U32);
    let out = f.convert(x, TypeId::I32, CastKind::Implicit);
    assert_eq!(shape(&f.tree, out), "(x | 0)");

    let y = f.var("y", TypeId::I32);
    let out = f.convert(y, TypeId::U32, CastKind::Implicit);
    assert_eq!(shape(&f.tree, out), "(y >>> 0)");
    assert!(f.diagnostics.is_empty());
}

#[test]
fn test_float_to_int_warns() {
    let mut f = Fixture::new();
    let d = f.var("d", TypeId::F64);
    let out = f.convert(d, TypeId::I32, CastKind::Implicit);
    assert_eq!(shape(&f.tree, out), "(d | 0)");
    assert_eq!(f.codes(), vec![ErrorCode::W1002]);
}

#[test]
fn test_float_targets_are_coerced() {
    let mut f = Fixture::new();
    let x = f.var("x", TypeId::I32);
    let out = f.convert(x, TypeId::F64, CastKind::Implicit);
    assert_eq!(shape(&f.tree, out), "+x");
    assert_eq!(f.tree.ty(out), TypeId::F64);
}

#[test]
fn test_null_becomes_zero() {
    let mut f = Fixture::new();
    let pi = f.pool.pointer(TypeId::I32);
    let null = f
        .tree
        .alloc_typed(NodeKind::Literal(Literal::Null), span(), TypeId::VOID_PTR);
    let out = f.convert(null, pi, CastKind::Implicit);
    assert_eq!(shape(&f.tree, out), "0");
    assert!(f.tree.is_fixed(out));
    assert_eq!(f.tree.ty(out), pi);
}

#[test]
fn test_pointer_rescaling() {
    let mut f = Fixture::new();
    let pi = f.pool.pointer(TypeId::I32);
    let pb = f.pool.pointer(TypeId::U8);
    let p = f.var("p", pi);
    let out = f.convert(p, pb, CastKind::Explicit);
    assert_eq!(shape(&f.tree, out), "(p << 2)");
    assert!(f.diagnostics.is_empty());

    let q = f.var("q", pb);
    let out = f.convert(q, pi, CastKind::Explicit);
    assert_eq!(shape(&f.tree, out), "(q >> 2)");
    assert_eq!(f.codes(), vec![ErrorCode::W1003]);
}

#[test]
fn test_integer_to_pointer_retags() {
    let mut f = Fixture::new();
    let pi = f.pool.pointer(TypeId::I32);
    let n = f.var("n", TypeId::U32);
    let out = f.convert(n, pi, CastKind::Explicit);
    assert_eq!(out, n);
    assert_eq!(f.tree.ty(n), pi);
}

#[test]
fn test_disabled_warning_classes() {
    let mut f = Fixture::new();
    let lit = f.int(300, TypeId::I32);
    let out = Converter {
        tree: &mut f.tree,
        pool: &f.pool,
        diagnostics: &mut f.diagnostics,
        warnings: WarningClass::empty(),
    }
    .convert(lit, TypeId::U8, CastKind::Implicit);
    assert_eq!(shape(&f.tree, out), "(300 & 255)");
    assert!(f.diagnostics.is_empty());
}
