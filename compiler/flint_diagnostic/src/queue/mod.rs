//! Buffered diagnostics.
//!
//! Passes record diagnostics as they find them; nothing is printed until the
//! queue is flushed. Flushing orders everything by source location (then by
//! severity, most severe first) so output reads top to bottom regardless of
//! which pass produced what.
//!
//! Diagnostics below the configured verbosity threshold are dropped when
//! recorded.

use std::cmp::Reverse;

use flint_ir::Position;

use crate::{Diagnostic, ErrorGuaranteed, Severity};

/// Configuration for diagnostic buffering.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Least severe level that is kept.
    pub threshold: Severity,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            threshold: Severity::Warning,
        }
    }
}

impl DiagnosticConfig {
    /// Keep everything, notes included.
    pub fn verbose() -> Self {
        DiagnosticConfig {
            threshold: Severity::Info,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::with_config(DiagnosticConfig::default())
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
            config,
        }
    }

    pub fn config(&self) -> &DiagnosticConfig {
        &self.config
    }

    /// Whether a diagnostic of `severity` would be kept.
    pub fn accepts(&self, severity: Severity) -> bool {
        severity >= self.config.threshold
    }

    /// Record a diagnostic. Returns `false` if it was below the threshold.
    pub fn add(&mut self, diag: Diagnostic) -> bool {
        if !self.accepts(diag.severity) {
            return false;
        }
        match diag.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Info => {}
        }
        self.diagnostics.push(diag);
        true
    }

    /// Record an error and return proof that it was recorded.
    pub fn emit_error(&mut self, diag: Diagnostic) -> ErrorGuaranteed {
        debug_assert!(diag.is_error(), "emit_error called with {}", diag.severity);
        let diag = Diagnostic {
            severity: Severity::Error,
            ..diag
        };
        self.add(diag);
        ErrorGuaranteed::new()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Buffered diagnostics in recording order.
    pub fn pending(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain the buffer, sorted by (location, severity). Unlocated
    /// diagnostics come last; ties keep recording order.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let mut out = std::mem::take(&mut self.diagnostics);
        out.sort_by_key(|d| (sort_position(d), Reverse(d.severity)));
        self.error_count = 0;
        self.warning_count = 0;
        out
    }
}

fn sort_position(diag: &Diagnostic) -> Position {
    diag.primary_span()
        .map_or(Position::new(u32::MAX, u32::MAX), |span| span.start)
}
