use super::*;
use crate::ErrorCode;
use flint_ir::Span;
use pretty_assertions::assert_eq;

fn render(source: &str, diagnostics: &[Diagnostic]) -> String {
    let mut emitter =
        TerminalEmitter::with_color_mode(Vec::new(), ColorMode::Never, false).with_source(source);
    emitter.emit_all(diagnostics);
    String::from_utf8(emitter.into_inner()).unwrap()
}

#[test]
fn test_color_mode() {
    assert!(ColorMode::Auto.should_use_colors(true));
    assert!(!ColorMode::Auto.should_use_colors(false));
    assert!(ColorMode::Always.should_use_colors(false));
    assert!(!ColorMode::Never.should_use_colors(true));
}

#[test]
fn test_single_diagnostic_with_snippet() {
    let diag = Diagnostic::error(ErrorCode::E2001)
        .with_message("incompatible types")
        .with_label(Span::on_line(2, 9, 3), "expected `*i32`")
        .with_note("found `f64`");
    let out = render("i32 x;\n*i32 p = 3.5;\n", &[diag]);
    assert_eq!(
        out,
        "error[E2001]: incompatible types\n  --> 2:9\n |\n2 | *i32 p = 3.5;\n |         ^^^ expected `*i32`\n  = note: found `f64`\n\n"
    );
}

#[test]
fn test_same_line_diagnostics_share_a_snippet() {
    let a = Diagnostic::warning(ErrorCode::W1001)
        .with_message("first")
        .with_label(Span::on_line(1, 1, 1), "a");
    let b = Diagnostic::warning(ErrorCode::W1002)
        .with_message("second")
        .with_label(Span::on_line(1, 5, 1), "b");
    let out = render("f(a, b);\n", &[a, b]);
    assert_eq!(out.matches("f(a, b);").count(), 1);
    assert!(out.contains("warning[W1001]: first"));
    assert!(out.contains("warning[W1002]: second"));
}

#[test]
fn test_different_lines_get_own_snippets() {
    let a = Diagnostic::warning(ErrorCode::W1001)
        .with_message("first")
        .with_label(Span::on_line(1, 1, 1), "a");
    let b = Diagnostic::warning(ErrorCode::W1001)
        .with_message("second")
        .with_label(Span::on_line(2, 1, 1), "b");
    let out = render("one\ntwo\n", &[a, b]);
    assert!(out.contains("1 | one"));
    assert!(out.contains("2 | two"));
}

#[test]
fn test_summary() {
    let mut emitter = TerminalEmitter::with_color_mode(Vec::new(), ColorMode::Never, false);
    emitter.emit_summary(1, 2);
    let out = String::from_utf8(emitter.into_inner()).unwrap();
    assert_eq!(out, "error: 1 error emitted\nwarning: 2 warnings emitted\n");
}

#[test]
fn test_severity_colors_are_distinct() {
    assert_eq!(severity_color(Severity::Error), colors::ERROR);
    assert_eq!(severity_color(Severity::Warning), colors::WARNING);
    assert_eq!(severity_color(Severity::Info), colors::INFO);
    assert_ne!(severity_color(Severity::Error), severity_color(Severity::Warning));
}
