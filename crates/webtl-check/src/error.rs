//! Evaluation errors
//!
//! The taxonomy is exhaustive: every failure the evaluator can produce is
//! one of these variants. All errors propagate to the caller of `verify`
//! except `Undetermined`, which `always` converts to vacuous truth for the
//! state it is examining.

use crate::value::Value;
use thiserror::Error;
use webtl_core::diagnostic::Diagnostic;
use webtl_core::ir::QName;
use webtl_core::span::Span;

/// Evaluation error
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Internal invariant violated or non-exhaustive pattern
    #[error("{message}")]
    UnexpectedError {
        message: String,
        span: Option<Span>,
    },

    /// Value-variant mismatch at a `require` site
    #[error("expected {expected}, got: {actual}")]
    UnexpectedType {
        expected: &'static str,
        actual: String,
        span: Option<Span>,
    },

    /// The façade could not locate a named entry point
    #[error("entry point not defined: {qname}")]
    EntryPointNotDefined { qname: QName },

    /// Variable lookup failed
    #[error("not in scope: {qname}")]
    NotInScope {
        qname: QName,
        span: Option<Span>,
    },

    /// Foreign registry miss
    #[error("foreign function not supported: {qname}")]
    ForeignFunctionNotSupported {
        qname: QName,
        span: Option<Span>,
    },

    /// Undecodable string literal
    #[error("invalid string")]
    InvalidString { span: Option<Span> },

    /// A built-in form used with a malformed argument list
    #[error("invalid application of built-in function {name} to {arg}")]
    InvalidBuiltInFunctionApplication {
        name: String,
        arg: String,
        span: Option<Span>,
    },

    /// Marshalling or foreign-side failure, including query resolution
    #[error("foreign function error: {message}")]
    ForeignFunctionError {
        message: String,
        span: Option<Span>,
    },

    /// Trace exhausted before a definite verdict
    #[error("undetermined: the trace ended before the proposition was decided")]
    Undetermined,
}

impl EvalError {
    pub fn unexpected(message: impl Into<String>, span: Option<&Span>) -> Self {
        EvalError::UnexpectedError {
            message: message.into(),
            span: span.cloned(),
        }
    }

    pub fn unexpected_type(expected: &'static str, got: &Value, span: Option<&Span>) -> Self {
        EvalError::UnexpectedType {
            expected,
            actual: got.to_string(),
            span: span.cloned(),
        }
    }

    pub fn foreign(message: impl Into<String>, span: Option<&Span>) -> Self {
        EvalError::ForeignFunctionError {
            message: message.into(),
            span: span.cloned(),
        }
    }

    /// The source span this error is anchored to, when one was recorded
    pub fn span(&self) -> Option<&Span> {
        match self {
            EvalError::UnexpectedError { span, .. } => span.as_ref(),
            EvalError::UnexpectedType { span, .. } => span.as_ref(),
            EvalError::EntryPointNotDefined { .. } => None,
            EvalError::NotInScope { span, .. } => span.as_ref(),
            EvalError::ForeignFunctionNotSupported { span, .. } => span.as_ref(),
            EvalError::InvalidString { span } => span.as_ref(),
            EvalError::InvalidBuiltInFunctionApplication { span, .. } => span.as_ref(),
            EvalError::ForeignFunctionError { span, .. } => span.as_ref(),
            EvalError::Undetermined => None,
        }
    }

    /// Convert to a renderable diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string()).with_span_opt(self.span().cloned())
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
