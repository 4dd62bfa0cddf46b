//! Aggregation of assertion failures across a block.
//!
//! A [`FailureScope`] collects rendered diagnostics instead of stopping
//! at the first failed assertion. Soft failures are recorded and the
//! block continues; a hard failure ends the block. The scope is open
//! until [`close`](FailureScope::close) or [`run`](FailureScope::run)
//! consumes it, so a recorded failure can never be silently dropped.

use crate::error::{AggregateFailure, Error};

/// Collects assertion failures and raises them as one.
///
/// ```
/// use avow::{FailureScope, Scope};
///
/// let mut scope = Scope::new();
/// scope.bind("a", 1).bind("b", 2);
///
/// let mut failures = FailureScope::new();
/// failures.soft(|| {
///     if !scope.truthy("a == 2")? {
///         return Err(avow::error(&scope).into());
///     }
///     Ok(())
/// });
/// failures.soft(|| {
///     if !scope.truthy("b == 2")? {
///         return Err(avow::error(&scope).into());
///     }
///     Ok(())
/// });
/// assert!(failures.close().is_err());
/// ```
pub struct FailureScope {
    failures: Vec<String>,
}

impl FailureScope {
    /// Opens an aggregation block.
    pub fn new() -> Self {
        Self { failures: Vec::new() }
    }

    /// Runs one assertion closure. An `Err` is recorded as its rendered
    /// diagnostic and swallowed; the block continues either way.
    pub fn soft(&mut self, body: impl FnOnce() -> Result<(), Error>) -> &mut Self {
        if let Err(err) = body() {
            self.failures.push(err.to_string());
        }
        self
    }

    /// Number of recorded failures so far.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Closes the block: clean when nothing was recorded, otherwise an
    /// [`AggregateFailure`] enumerating every diagnostic in recording
    /// order.
    pub fn close(self) -> Result<(), Error> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateFailure {
                failures: self.failures,
            }
            .into())
        }
    }

    /// Runs a whole block and closes the scope on every path.
    ///
    /// An `Err` propagated by the body is a hard failure: with prior
    /// soft recordings it joins them in the aggregate, on its own it
    /// propagates unwrapped.
    pub fn run<T>(body: impl FnOnce(&mut FailureScope) -> Result<T, Error>) -> Result<T, Error> {
        let mut scope = Self::new();
        match body(&mut scope) {
            Ok(value) => scope.close().map(|_| value),
            Err(hard) => {
                if scope.failures.is_empty() {
                    Err(hard)
                } else {
                    scope.failures.push(hard.to_string());
                    Err(AggregateFailure {
                        failures: scope.failures,
                    }
                    .into())
                }
            }
        }
    }
}

impl Default for FailureScope {
    fn default() -> Self {
        Self::new()
    }
}
