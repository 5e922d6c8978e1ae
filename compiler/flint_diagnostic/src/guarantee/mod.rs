//! Proof that an error diagnostic was recorded.

use std::fmt;

/// Can only be obtained by recording an error (see
/// [`DiagnosticQueue::emit_error`](crate::queue::DiagnosticQueue::emit_error)),
/// so a `Result<T, ErrorGuaranteed>` cannot fail silently.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    pub(crate) fn new() -> Self {
        ErrorGuaranteed(())
    }

    /// Reconstruct the proof from an error count.
    pub fn from_error_count(count: usize) -> Option<Self> {
        (count > 0).then(Self::new)
    }
}

impl fmt::Display for ErrorGuaranteed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error(s) emitted")
    }
}

#[cfg(test)]
mod tests;
