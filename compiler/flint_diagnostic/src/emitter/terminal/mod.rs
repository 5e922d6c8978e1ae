//! Terminal Emitter
//!
//! Human-readable output with optional ANSI colors. When source text is
//! supplied, consecutive diagnostics located on the same line share one
//! source snippet instead of repeating it.

use std::io::{self, Write};

use crate::{Diagnostic, Severity};

use super::DiagnosticEmitter;

/// ANSI color codes for terminal output.
mod colors {
    pub const ERROR: &str = "\x1b[1;31m"; // Bold red
    pub const WARNING: &str = "\x1b[1;33m"; // Bold yellow
    pub const INFO: &str = "\x1b[1;36m"; // Bold cyan
    pub const BOLD: &str = "\x1b[1m";
    pub const GUTTER: &str = "\x1b[1;34m"; // Bold blue
    pub const RESET: &str = "\x1b[0m";
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => colors::ERROR,
        Severity::Warning => colors::WARNING,
        Severity::Info => colors::INFO,
    }
}

#[inline]
fn plural_s(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Color output mode for terminal emitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Use colors when the output is a TTY.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
    source: Option<String>,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
            source: None,
        }
    }

    /// Attach the source text so labels are shown with snippets.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn stderr(mode: ColorMode, is_tty: bool) -> TerminalEmitter<io::Stderr> {
        TerminalEmitter::with_color_mode(io::stderr(), mode, is_tty)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn paint(&mut self, text: &str, color: &str) {
        if self.colors {
            let _ = write!(self.writer, "{color}{text}{}", colors::RESET);
        } else {
            let _ = write!(self.writer, "{text}");
        }
    }

    fn write_header(&mut self, diagnostic: &Diagnostic) {
        let color = severity_color(diagnostic.severity);
        let severity = diagnostic.severity.to_string();
        self.paint(&severity, color);
        let code = format!("[{}]", diagnostic.code);
        self.paint(&code, colors::BOLD);
        let _ = writeln!(self.writer, ": {}", diagnostic.message);
        if let Some(span) = diagnostic.primary_span() {
            self.paint("  --> ", colors::GUTTER);
            let _ = writeln!(self.writer, "{span}");
        }
    }

    fn source_line(&self, line: u32) -> Option<String> {
        let index = (line as usize).checked_sub(1)?;
        self.source
            .as_deref()
            .and_then(|src| src.lines().nth(index))
            .map(str::to_owned)
    }

    /// One snippet for every label on `line` across `group`.
    fn write_snippet(&mut self, line: u32, group: &[&Diagnostic]) {
        let Some(text) = self.source_line(line) else {
            return;
        };
        let gutter = line.to_string();
        let pad = " ".repeat(gutter.len());
        self.paint(&format!("{pad} |\n{gutter} | "), colors::GUTTER);
        let _ = writeln!(self.writer, "{text}");

        for diag in group {
            for label in diag.labels.iter().filter(|l| l.span.start.line == line) {
                let column = label.span.start.column.max(1) as usize;
                let width = if label.span.end.line == line {
                    (label.span.end.column as usize).saturating_sub(column).max(1)
                } else {
                    1
                };
                let marker = if label.is_primary { "^" } else { "-" };
                self.paint(&format!("{pad} | "), colors::GUTTER);
                let underline = format!(
                    "{}{} {}",
                    " ".repeat(column - 1),
                    marker.repeat(width),
                    label.message
                );
                let color = severity_color(diag.severity);
                self.paint(&underline, color);
                let _ = writeln!(self.writer);
            }
        }
    }

    fn write_notes(&mut self, diagnostic: &Diagnostic) {
        for note in &diagnostic.notes {
            let _ = writeln!(self.writer, "  = note: {note}");
        }
    }

    fn emit_group(&mut self, group: &[&Diagnostic]) {
        for diag in group {
            self.write_header(diag);
        }
        if let Some(line) = group.first().and_then(|d| d.primary_span()).map(|s| s.start.line) {
            self.write_snippet(line, group);
        }
        for diag in group {
            self.write_notes(diag);
        }
        let _ = writeln!(self.writer);
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        self.emit_group(&[diagnostic]);
    }

    fn emit_all(&mut self, diagnostics: &[Diagnostic]) {
        let mut start = 0;
        while start < diagnostics.len() {
            let line = diagnostics[start].primary_span().map(|s| s.start.line);
            let mut end = start + 1;
            if line.is_some() {
                while end < diagnostics.len()
                    && diagnostics[end].primary_span().map(|s| s.start.line) == line
                {
                    end += 1;
                }
            }
            let group: Vec<&Diagnostic> = diagnostics[start..end].iter().collect();
            self.emit_group(&group);
            start = end;
        }
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, error_count: usize, warning_count: usize) {
        if error_count > 0 {
            let text = format!("error: {error_count} error{} emitted", plural_s(error_count));
            self.paint(&text, colors::ERROR);
            let _ = writeln!(self.writer);
        }
        if warning_count > 0 {
            let text = format!(
                "warning: {warning_count} warning{} emitted",
                plural_s(warning_count)
            );
            self.paint(&text, colors::WARNING);
            let _ = writeln!(self.writer);
        }
    }
}

#[cfg(test)]
mod tests;
