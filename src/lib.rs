//! # avow
//!
//! Rich failure diagnostics for plain `assert!`.
//!
//! An assertion condition is written as an expression in a small
//! comparison language and evaluated against an explicit [`Scope`] of
//! named values. When the assertion fails, [`error`] reinterprets the
//! same expression and prints every intermediate value beneath the
//! statement the user wrote, together with the source location.
//!
//! ## Quick Start
//!
//! ```rust,should_panic
//! use avow::Scope;
//!
//! let mut scope = Scope::new();
//! scope.bind("total", 3).bind("expected", 4);
//!
//! assert!(
//!     scope.truthy("total == expected").unwrap(),
//!     "{}",
//!     avow::error(&scope)
//! );
//! ```
//!
//! ## Capturing call results
//!
//! A function call wrapped in `that(...)` is evaluated once and its
//! value is reused by the diagnostic pass instead of being recomputed:
//!
//! ```rust
//! use avow::{CaptureScope, Scope, Value};
//!
//! let mut scope = Scope::new();
//! scope.bind_fn("load", |_| Ok(Value::Int(3)));
//!
//! let _guard = CaptureScope::enter();
//! assert!(
//!     scope.truthy("that(load()) == 3").unwrap(),
//!     "{}",
//!     avow::error(&scope)
//! );
//! ```
//!
//! ## Collecting multiple failures
//!
//! ```rust
//! use avow::{FailureScope, Scope};
//!
//! let mut scope = Scope::new();
//! scope.bind("a", 1);
//!
//! let mut failures = FailureScope::new();
//! failures.soft(|| {
//!     if !scope.truthy("a == 2")? {
//!         return Err(avow::error(&scope).into());
//!     }
//!     Ok(())
//! });
//! let outcome = failures.close();
//! assert!(outcome.is_err());
//! ```

pub mod helpers;

mod aggregate;
mod ast;
mod capture;
mod error;
mod eval;
mod locate;
mod parser;
mod report;
mod scope;
mod span;
mod value;

// Condition surface
pub use scope::Scope;
pub use value::Value;

// Capture marks
pub use capture::{CaptureGuard, CaptureScope};

// Failure reports
pub use eval::CapturedValue;
pub use report::{error, error_desc, Report, Sections};
pub use span::SourceSpan;

// Aggregation
pub use aggregate::FailureScope;

// Errors
pub use error::{AggregateFailure, Error, EvalError, ParseError};
