//! Error taxonomy for the diagnostics engine.
//!
//! Errors split into two families. Condition-path errors (`Parse`,
//! `Eval`, `NoActiveCaptureScope`, `Assertion`, `Aggregate`) propagate to
//! the caller through `Result`. Diagnostic-path errors
//! (`LocationUnavailable`, `UnsupportedExpressionForm`,
//! `Reinterpretation`) only ever degrade the report; they never suppress
//! or alter the original assertion result.

use thiserror::Error;

/// Top-level crate error.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The failing source statement could not be recovered.
    #[error("assertion source unavailable: {0}")]
    LocationUnavailable(String),

    /// The expression uses a form the engine does not support.
    #[error("unsupported expression form: {0}")]
    UnsupportedExpressionForm(String),

    /// `that(...)` was used while no capture scope was active.
    #[error("'that(...)' requires an active capture scope")]
    NoActiveCaptureScope,

    /// A subtree could not be reinterpreted for diagnostics.
    #[error("expression could not be reinterpreted: {0}")]
    Reinterpretation(String),

    /// One or more assertions recorded by an aggregation scope.
    #[error(transparent)]
    Aggregate(#[from] AggregateFailure),

    /// The expression text is not valid syntax.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The expression failed to evaluate against the scope bindings.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A failed assertion carrying its rendered diagnostic report.
    #[error("{0}")]
    Assertion(String),

    /// A snapshot file could not be read or written.
    #[error("snapshot failure: {0}")]
    Snapshot(String),
}

/// Syntax error in the expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct ParseError {
    /// What the parser expected.
    pub message: String,
    /// 1-based line within the expression text.
    pub line: usize,
    /// 1-based column within the expression text.
    pub column: usize,
}

/// Evaluation error from the live pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    /// Human-readable description.
    pub message: String,
}

impl EvalError {
    /// Creates an evaluation error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Bundle of diagnostics recorded by a [`FailureScope`](crate::FailureScope).
#[derive(Debug, Clone, Error)]
#[error("{}", failures.join("\n\nas well as the following assertion\n\n"))]
pub struct AggregateFailure {
    /// Rendered diagnostics in recording order.
    pub failures: Vec<String>,
}

impl AggregateFailure {
    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns whether no failures were recorded.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}
