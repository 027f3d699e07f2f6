//! Positioned error and warning reporting.
//!
//! Recoverable failures anywhere in the pipeline report here and
//! processing continues; only an unsupported document version aborts a
//! document. Warnings (dead override rules/arguments) never affect the
//! output graph.

use crate::base::SourceRef;

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic message with an optional source location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Where the problem was found, if it maps to a source position.
    pub source: Option<SourceRef>,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.source {
            Some(src) => write!(f, "{src}: {sev}: {}", self.message),
            None => write!(f, "{sev}: {}", self.message),
        }
    }
}

/// Collecting diagnostic sink for one pipeline run.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, source: Option<SourceRef>, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?source, "error: {message}");
        self.errors += 1;
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            source,
            message,
        });
    }

    pub fn warning(&mut self, source: Option<SourceRef>, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?source, "warning: {message}");
        self.warnings += 1;
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            source,
            message,
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_by_severity() {
        let mut reporter = Reporter::new();
        reporter.error(None, "bad");
        reporter.warning(None, "meh");
        reporter.warning(None, "meh again");
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.warning_count(), 2);
        assert!(reporter.has_errors());
    }

    #[test]
    fn display_includes_position() {
        let mut reporter = Reporter::new();
        let src = crate::base::SourceRef::point(Arc::from("Test.metadata"), 3, 7);
        reporter.error(Some(src), "unknown argument");
        let text = reporter.diagnostics()[0].to_string();
        assert_eq!(text, "Test.metadata:3:7: error: unknown argument");
    }
}
