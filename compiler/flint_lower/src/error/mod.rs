//! Fatal compile errors.
//!
//! Type-system errors come from `flint_types`; everything else here is found
//! by the scan and transform passes. The first error aborts the compile and
//! is recorded through [`CompileError::to_diagnostic`].

use flint_diagnostic::{Diagnostic, ErrorCode};
use flint_ir::Span;
use flint_types::TypeError;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("`{name}` is already declared in this scope")]
    Redeclaration {
        name: String,
        span: Span,
        previous: Span,
    },

    #[error("cannot assign a value of type `{from}` to `{to}`")]
    Assignability { to: String, from: String, span: Span },

    #[error("expected {expected} argument(s), found {found}")]
    ArgumentCount {
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("{message}")]
    Access { message: String, span: Span },

    #[error("`{name}` lives in the stack frame of another function")]
    ScopeCapture { name: String, span: Span, declared: Span },

    #[error("invalid operand of type `{ty}` for `{op}`")]
    Operand { op: String, ty: String, span: Span },

    #[error("`{function}` passes `{ty}` by value")]
    AggregateByValue {
        function: String,
        ty: String,
        span: Span,
    },
}

impl CompileError {
    pub(crate) fn access(message: impl Into<String>, span: Span) -> Self {
        CompileError::Access {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::Type(err) => err.span(),
            CompileError::Redeclaration { span, .. }
            | CompileError::Assignability { span, .. }
            | CompileError::ArgumentCount { span, .. }
            | CompileError::Access { span, .. }
            | CompileError::ScopeCapture { span, .. }
            | CompileError::Operand { span, .. }
            | CompileError::AggregateByValue { span, .. } => *span,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::Type(err) => err.code(),
            CompileError::Assignability { .. } | CompileError::ArgumentCount { .. } => {
                ErrorCode::E2001
            }
            CompileError::Redeclaration { .. } => ErrorCode::E2002,
            CompileError::Access { .. } => ErrorCode::E2003,
            CompileError::ScopeCapture { .. } => ErrorCode::E2005,
            CompileError::Operand { .. } => ErrorCode::E2006,
            CompileError::AggregateByValue { .. } => ErrorCode::E2008,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        if let CompileError::Type(err) = self {
            return err.to_diagnostic();
        }
        let diag = Diagnostic::error(self.code()).with_message(self.to_string());
        match self {
            CompileError::Type(_) => diag,
            CompileError::Redeclaration { span, previous, .. } => diag
                .with_label(*span, "declared again here")
                .with_secondary_label(*previous, "first declared here"),
            CompileError::Assignability { span, .. } => diag
                .with_label(*span, "in this assignment")
                .with_note("use an explicit cast to convert between unrelated types"),
            CompileError::ArgumentCount { span, .. } => diag.with_label(*span, "in this call"),
            CompileError::Access { span, .. } => diag.with_label(*span, "here"),
            CompileError::ScopeCapture { span, declared, .. } => diag
                .with_label(*span, "used here")
                .with_secondary_label(*declared, "stack-allocated here")
                .with_note("pass a pointer instead of closing over a stack variable"),
            CompileError::Operand { span, .. } => diag.with_label(*span, "in this expression"),
            CompileError::AggregateByValue { span, .. } => diag
                .with_label(*span, "in this signature")
                .with_note("pass a pointer to the aggregate instead"),
        }
    }
}
