//! Type errors and their diagnostics.

use flint_diagnostic::{Diagnostic, ErrorCode};
use flint_ir::Span;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("unresolved type `{name}`")]
    Unresolved { name: String, span: Span },

    #[error("infinite type `{name}`")]
    Infinite { name: String, span: Span },

    #[error("type `{name}` is declared more than once")]
    Duplicate { name: String, span: Span },

    #[error("invalid layout for `{ty}`: {reason}")]
    Layout {
        ty: String,
        reason: String,
        span: Span,
    },

    #[error("unaligned byte offset {offset} for an element aligned to {align} bytes")]
    Alignment { offset: u32, align: u32, span: Span },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::Unresolved { span, .. }
            | TypeError::Infinite { span, .. }
            | TypeError::Duplicate { span, .. }
            | TypeError::Layout { span, .. }
            | TypeError::Alignment { span, .. } => *span,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TypeError::Unresolved { .. } => ErrorCode::E1001,
            TypeError::Infinite { .. } => ErrorCode::E1002,
            TypeError::Layout { .. } => ErrorCode::E1003,
            TypeError::Duplicate { .. } => ErrorCode::E1004,
            TypeError::Alignment { .. } => ErrorCode::E2004,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code()).with_message(self.to_string());
        match self {
            TypeError::Unresolved { name, span } => diag
                .with_label(*span, format!("`{name}` is not a known type"))
                .with_note("types must be built in, declared with `struct`, or aliased with `typedef`"),
            TypeError::Infinite { name, span } => diag
                .with_label(*span, format!("`{name}` refers back to itself"))
                .with_note("break the cycle with a struct"),
            TypeError::Duplicate { span, .. } => diag.with_label(*span, "declared again here"),
            TypeError::Layout { span, .. } => diag.with_label(*span, "in this declaration"),
            TypeError::Alignment { span, .. } => diag.with_label(*span, "in this access"),
        }
    }
}
