// Test code uses unwrap/expect for clarity - panics provide good test failure messages
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end lowering: build a program, compile it, and compare the
//! rendered output.

mod common;

use common::{codes, lower};
use flint_diagnostic::{Severity, WarningClass};
use flint_ir::{ptr, ty, BinaryOp, NodeKind, TreeBuilder, UpdateOp};
use flint_lower::{Compilation, CompileOptions};
use pretty_assertions::assert_eq;

fn pair(b: &mut TreeBuilder) -> flint_ir::NodeId {
    b.struct_decl("Pair", vec![("a", ty("i32")), ("b", ty("i32"))])
}

#[test]
fn test_null_pointer_and_defaults() {
    let mut b = TreeBuilder::new();
    let null = b.null();
    let p = b.var("p", Some(ptr("i32")), Some(null));
    let n = b.var("n", Some(ty("u8")), None);
    let d = b.var("d", None, None);
    let root = b.program(vec![p, n, d]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(out, "var p = 0;\nvar n = 0;\nvar d;");
}

#[test]
fn test_call_argument_is_converted() {
    let mut b = TreeBuilder::new();
    let a = b.ident("a");
    let ret = b.ret(Some(a));
    let params = vec![b.param("a", Some(ty("i32")))];
    let f = b.function("f", params, Some(ty("i32")), vec![ret]);
    let callee = b.ident("f");
    let arg = b.float(3.5);
    let call = b.call(callee, vec![arg]);
    let stmt = b.expr_stmt(call);
    let root = b.program(vec![f, stmt]);
    let mut tree = b.into_tree();

    let options = CompileOptions::default().with_warnings(WarningClass::CONVERSION);
    let (out, output) = lower(&mut tree, root, &options);
    assert_eq!(out, "function f(a) { return a; }\nf((3.5 | 0));");
    assert_eq!(codes(&output.diagnostics), vec!["W1001"]);
    assert!(output.diagnostics[0].message.contains("from 3.5 to 3"));
}

#[test]
fn test_conversion_warnings_are_opt_in() {
    let mut b = TreeBuilder::new();
    let value = b.float(3.5);
    let x = b.var("x", Some(ty("i32")), Some(value));
    let root = b.program(vec![x]);
    let mut tree = b.into_tree();

    let (out, output) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(out, "var x = (3.5 | 0);");
    assert!(output.diagnostics.is_empty());
}

#[test]
fn test_struct_local_lives_on_the_stack() {
    let mut b = TreeBuilder::new();
    let decl = pair(&mut b);
    let s = b.var("s", Some(ty("Pair")), None);
    let s_ref = b.ident("s");
    let field = b.member(s_ref, "a");
    let one = b.int(1);
    let assign = b.assign(field, one);
    let store = b.expr_stmt(assign);
    let s_ref = b.ident("s");
    let field = b.member(s_ref, "b");
    let ret = b.ret(Some(field));
    let g = b.function("g", vec![], Some(ty("i32")), vec![s, store, ret]);
    let root = b.program(vec![decl, g]);
    let mut tree = b.into_tree();

    let (out, output) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(
        out,
        "function g() { const $memset4 = $M.memset4, $I32 = $M.I32, $U32 = $M.U32; var $t0; \
         const $SP = $U32[1] -= 2; $memset4($SP, 0, 8); $I32[$SP] = 1; \
         return ($t0 = $I32[($SP + 1)], $U32[1] += 2, $t0); $U32[1] += 2; }"
    );
    let (_, frame) = output
        .scopes
        .frames()
        .find(|(_, frame)| frame.name == "g")
        .unwrap();
    assert_eq!(frame.frame_size_in_words(), Some(2));
}

#[test]
fn test_struct_assignment_copies_memory() {
    let mut b = TreeBuilder::new();
    let decl = pair(&mut b);
    let dst = b.ident("dst");
    let dst = b.deref(dst);
    let src = b.ident("src");
    let src = b.deref(src);
    let assign = b.assign(dst, src);
    let stmt = b.expr_stmt(assign);
    let params = vec![b.param("dst", Some(ptr("Pair"))), b.param("src", Some(ptr("Pair")))];
    let copy = b.function("copy", params, None, vec![stmt]);
    let root = b.program(vec![decl, copy]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(
        out,
        "function copy(dst, src) { const $memcpy4 = $M.memcpy4; $memcpy4(dst, src, 8); }"
    );
}

#[test]
fn test_postfix_increment_through_pointer() {
    let mut b = TreeBuilder::new();
    let p = b.ident("p");
    let value = b.deref(p);
    let inc = b.update(UpdateOp::Increment, false, value);
    let ret = b.ret(Some(inc));
    let params = vec![b.param("p", Some(ptr("u8")))];
    let f = b.function("inc", params, Some(ty("u8")), vec![ret]);
    let root = b.program(vec![f]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(
        out,
        "function inc(p) { const $U8 = $M.U8; var $t0; \
         return ($t0 = $U8[p], $U8[p] = (($t0 + 1) & 255), $t0); }"
    );
}

#[test]
fn test_new_and_delete() {
    let mut b = TreeBuilder::new();
    let four = b.int(4);
    let alloc = b.new_object(ty("i32"), Some(four));
    let p = b.var("p", Some(ptr("i32")), Some(alloc));
    let p_ref = b.ident("p");
    let free = b.delete(p_ref);
    let stmt = b.expr_stmt(free);
    let root = b.program(vec![p, stmt]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(
        out,
        "const $malloc = $M.malloc, $free = $M.free;\n\
         var p = ($malloc(16) >> 2);\n\
         $free((p << 2));"
    );
}

#[test]
fn test_compound_assignment_through_index() {
    let mut b = TreeBuilder::new();
    let p = b.ident("p");
    let n = b.ident("n");
    let elem = b.index(p, n);
    let two = b.int(2);
    let assign = b.compound_assign(BinaryOp::Add, elem, two);
    let stmt = b.expr_stmt(assign);
    let params = vec![b.param("p", Some(ptr("i32"))), b.param("n", Some(ty("i32")))];
    let f = b.function("add", params, None, vec![stmt]);
    let root = b.program(vec![f]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(
        out,
        "function add(p, n) { const $I32 = $M.I32; $I32[(p + n)] = ($I32[(p + n)] + 2); }"
    );
}

#[test]
fn test_address_of_parameter() {
    let mut b = TreeBuilder::new();
    let a = b.ident("a");
    let addr = b.address_of(a);
    let ret = b.ret(Some(addr));
    let params = vec![b.param("a", Some(ty("i32")))];
    let f = b.function("k", params, Some(ptr("i32")), vec![ret]);
    let root = b.program(vec![f]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(
        out,
        "function k(a) { const $U32 = $M.U32, $I32 = $M.I32; var $t0; \
         const $SP = $U32[1] -= 2; $I32[$SP] = a; \
         return ($t0 = $SP, $U32[1] += 2, $t0); $U32[1] += 2; }"
    );
}

#[test]
fn test_late_address_of_assigns_slots_in_order() {
    let mut b = TreeBuilder::new();
    let a = b.var("a", Some(ty("i32")), None);
    let c = b.var("c", Some(ty("f64")), None);
    let c_ref = b.ident("c");
    let c_addr = b.address_of(c_ref);
    let a_ref = b.ident("a");
    let a_addr = b.address_of(a_ref);
    let seq = b.sequence(vec![c_addr, a_addr]);
    let stmt = b.expr_stmt(seq);
    let f = b.function("f", vec![], None, vec![a, c, stmt]);
    let root = b.program(vec![f]);
    let mut tree = b.into_tree();

    let (_, output) = lower(&mut tree, root, &CompileOptions::default());
    let (_, frame) = output
        .scopes
        .frames()
        .find(|(_, frame)| frame.name == "f")
        .unwrap();
    assert_eq!(frame.frame_size_in_words(), Some(4));
    let offsets: Vec<Option<u32>> = frame
        .variables()
        .iter()
        .map(|&var| output.scopes.variable(var).word_offset)
        .collect();
    assert_eq!(offsets, vec![Some(0), Some(2)]);
}

#[test]
fn test_shadowed_names_are_mangled() {
    let mut b = TreeBuilder::new();
    let one = b.int(1);
    let outer = b.var("x", Some(ty("i32")), Some(one));
    let two = b.int(2);
    let inner = b.var("x", Some(ty("i32")), Some(two));
    let x = b.ident("x");
    let read = b.expr_stmt(x);
    let block = b.block(vec![inner, read]);
    let root = b.program(vec![outer, block]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(out, "var x = 1;\n{ var x$1 = 2; x$1; }");
}

#[test]
fn test_dynamic_code_passes_through() {
    let mut b = TreeBuilder::new();
    let o = b.var("o", None, None);
    let o_ref = b.ident("o");
    let field = b.member(o_ref, "length");
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, field, one);
    let stmt = b.expr_stmt(sum);
    let root = b.program(vec![o, stmt]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(out, "var o;\n(o.length + 1);");
}

#[test]
fn test_lowered_tree_is_clean() {
    let mut b = TreeBuilder::new();
    let decl = pair(&mut b);
    let s = b.var("s", Some(ty("Pair")), None);
    let s_ref = b.ident("s");
    let addr = b.address_of(s_ref);
    let p = b.var("p", Some(ptr("Pair")), Some(addr));
    let p_ref = b.ident("p");
    let field = b.arrow(p_ref, "b");
    let stmt = b.expr_stmt(field);
    let f = b.function("f", vec![], None, vec![s, p, stmt]);
    let root = b.program(vec![decl, f]);
    let mut tree = b.into_tree();

    let (_, output) = lower(&mut tree, root, &CompileOptions::default());
    assert!(flint_lower::validate::unlowered_nodes(&tree, output.root).is_empty());
    assert!(flint_lower::validate::untyped_expressions(&tree, output.root).is_empty());
}

#[test]
fn test_fixed_nodes_are_not_lowered_again() {
    let mut b = TreeBuilder::new();
    let a = b.ident("a");
    let addr = b.address_of(a);
    let ret = b.ret(Some(addr));
    let params = vec![b.param("a", Some(ty("i32")))];
    let f = b.function("k", params, Some(ptr("i32")), vec![ret]);
    let root = b.program(vec![f]);
    let mut tree = b.into_tree();

    let mut cx = Compilation::new(CompileOptions::default());
    let root = cx.run(&mut tree, root).unwrap();
    let fixed = tree
        .descendants(root)
        .into_iter()
        .find(|&id| tree.is_fixed(id) && matches!(tree.kind(id), NodeKind::Index { .. }))
        .unwrap();
    let before = (tree.kind(fixed).clone(), tree.len());
    let again = cx.lower(&mut tree, fixed).unwrap();
    assert_eq!(again, fixed);
    assert_eq!((tree.kind(fixed).clone(), tree.len()), before);
}

#[test]
fn test_frame_notes_at_info_verbosity() {
    let mut b = TreeBuilder::new();
    let a = b.var("a", Some(ty("f64")), None);
    let a_ref = b.ident("a");
    let addr = b.address_of(a_ref);
    let stmt = b.expr_stmt(addr);
    let root = b.program(vec![a, stmt]);
    let mut tree = b.into_tree();

    let options = CompileOptions::default().with_verbosity(Severity::Info);
    let (out, output) = lower(&mut tree, root, &options);
    assert!(codes(&output.diagnostics).contains(&"I0001".to_owned()));
    assert!(out.contains("const $SP = $U32[1] -= 2;"));
    assert!(out.contains("$F64[($SP >> 1)] = 0;"));
}

#[test]
fn test_uninitialized_array_is_zero_filled() {
    let mut b = TreeBuilder::new();
    let buf = b.var("buf", Some(flint_ir::TypeExpr::named("u8").array(Some(6))), None);
    let f = b.function("f", vec![], None, vec![buf]);
    let root = b.program(vec![f]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert!(out.contains("const $memset1 = $M.memset1"));
    assert!(out.contains("$memset1(($SP << 2), 0, 6);"));
}

#[test]
fn test_block_local_does_not_capture_later_global() {
    let mut b = TreeBuilder::new();
    let x_ref = b.ident("x");
    let one = b.int(1);
    let write = b.assign(x_ref, one);
    let write = b.expr_stmt(write);
    let two = b.int(2);
    let local = b.var("x", Some(ty("i32")), Some(two));
    let block = b.block(vec![local]);
    let h = b.function("h", vec![], None, vec![write, block]);
    let zero = b.int(0);
    let global = b.var("x", Some(ty("i32")), Some(zero));
    let root = b.program(vec![h, global]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(out, "function h() { x = 1; { var x$1 = 2; } }\nvar x = 0;");
}

#[test]
fn test_block_local_does_not_capture_later_function() {
    let mut b = TreeBuilder::new();
    let callee = b.ident("g");
    let call = b.call(callee, vec![]);
    let call = b.expr_stmt(call);
    let one = b.int(1);
    let local = b.var("g", Some(ty("i32")), Some(one));
    let block = b.block(vec![local]);
    let h = b.function("h", vec![], None, vec![call, block]);
    let g = b.function("g", vec![], None, vec![]);
    let root = b.program(vec![h, g]);
    let mut tree = b.into_tree();

    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(out, "function h() { g(); { var g$1 = 1; } }\nfunction g() {}");
}

#[test]
fn test_init_tracing_is_idempotent() {
    flint_lower::init_tracing();
    flint_lower::init_tracing();

    let mut b = TreeBuilder::new();
    let zero = b.int(0);
    let global = b.var("x", Some(ty("i32")), Some(zero));
    let root = b.program(vec![global]);
    let mut tree = b.into_tree();
    let (out, _) = lower(&mut tree, root, &CompileOptions::default());
    assert_eq!(out, "var x = 0;");
}
