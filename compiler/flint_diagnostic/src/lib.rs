//! Diagnostics for the Flint lowering compiler.
//!
//! Every pass reports through a [`queue::DiagnosticQueue`]: diagnostics carry
//! an [`ErrorCode`], a [`Severity`] and an optional source location, are
//! filtered by the configured verbosity when recorded, and are flushed sorted
//! by location. Opt-in warnings are grouped into [`WarningClass`]es.
//!
//! Fatal errors are proven with [`ErrorGuaranteed`], which can only be
//! obtained by recording an error.

mod diagnostic;
pub mod emitter;
mod error_code;
mod guarantee;
pub mod queue;
mod warning;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
pub use warning::WarningClass;
