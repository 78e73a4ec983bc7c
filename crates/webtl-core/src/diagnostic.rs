//! Plain-text diagnostic rendering
//!
//! The evaluator reports failures against source spans recorded in the
//! compiled IR; it never holds source text, so rendering is the plain
//! `<file>:<line>:<col>-<line>:<col>` form rather than a source window.

use crate::span::Span;
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// A renderable diagnostic: severity, message, and an optional span
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span: None,
        }
    }

    /// Attach the primary span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach a span when one is available
    pub fn with_span_opt(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    /// Render to the reporting format:
    ///
    /// ```text
    /// <file>:<line>:<col>-<line>:<col>:
    /// error: <message>
    /// ```
    ///
    /// The span line is omitted when no span is available.
    pub fn render(&self) -> String {
        match &self.span {
            Some(span) => format!("{}:\n{}: {}", span, self.severity.label(), self.message),
            None => format!("{}: {}", self.severity.label(), self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
