//! Compile configuration.

use flint_diagnostic::{DiagnosticConfig, Severity, WarningClass};

/// Options for one compile job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Enabled opt-in warning classes.
    pub warnings: WarningClass,
    /// Least severe diagnostic that is kept.
    pub verbosity: Severity,
    /// Binding the runtime support module is reachable through.
    pub runtime_module: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            warnings: WarningClass::empty(),
            verbosity: Severity::Warning,
            runtime_module: "$M".to_owned(),
        }
    }
}

impl CompileOptions {
    #[must_use]
    pub fn with_warnings(mut self, warnings: WarningClass) -> Self {
        self.warnings = warnings;
        self
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: Severity) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_runtime_module(mut self, name: impl Into<String>) -> Self {
        self.runtime_module = name.into();
        self
    }

    pub(crate) fn diagnostic_config(&self) -> DiagnosticConfig {
        DiagnosticConfig {
            threshold: self.verbosity,
        }
    }
}
