//! Name bindings and the condition surface of the engine.
//!
//! A [`Scope`] is an explicit snapshot of the names an assertion
//! expression may reference. `truthy` is what the user asserts on; the
//! scope also remembers the last evaluated expression and its result so
//! [`error`](crate::error()) can reinterpret the same tree afterwards.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::ast::Expr;
use crate::capture;
use crate::error::{Error, EvalError};
use crate::eval;
use crate::parser;
use crate::value::Value;

type BoundFn = Box<dyn Fn(&[Value]) -> Result<Value, EvalError>>;

/// Snapshot of the last live evaluation, consumed by the diagnostic pass.
#[derive(Clone)]
pub(crate) struct LastEval {
    pub(crate) text: String,
    pub(crate) expr: Expr,
    pub(crate) result: Value,
}

/// Name and function bindings an expression is evaluated against.
///
/// ```
/// use avow::Scope;
///
/// let mut scope = Scope::new();
/// scope.bind("a", 1).bind("b", 2);
/// assert!(scope.truthy("a < b").unwrap());
/// ```
pub struct Scope {
    bindings: HashMap<String, Value>,
    functions: HashMap<String, BoundFn>,
    last: RefCell<Option<LastEval>>,
}

impl Scope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            functions: HashMap::new(),
            last: RefCell::new(None),
        }
    }

    /// Binds a name to a value, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Binds a name to a callable, replacing any previous binding.
    ///
    /// Calls in the expression (`f(a, b)`) resolve here. The reserved
    /// name `that` cannot be rebound.
    pub fn bind_fn<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    {
        self.functions.insert(name.into(), Box::new(function));
        self
    }

    /// Returns the value bound to a name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Calls a bound function by name.
    pub(crate) fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        match self.functions.get(name) {
            Some(function) => function(args),
            None => Err(EvalError::new(format!(
                "function '{name}' is not defined"
            ))),
        }
    }

    /// Evaluates expression text against the bindings and returns the
    /// resulting value.
    ///
    /// This is the live pass: `that(...)` marks record into the active
    /// capture frame, which is cleared first so marks from a previous
    /// assertion are never carried over.
    pub fn eval(&self, text: &str) -> Result<Value, Error> {
        let expr = parser::parse_expression(text)?;
        capture::clear_innermost();
        let result = eval::live(self, &expr)?;
        *self.last.borrow_mut() = Some(LastEval {
            text: text.to_string(),
            expr,
            result: result.clone(),
        });
        Ok(result)
    }

    /// Evaluates expression text and returns its truthiness. This is the
    /// condition the plain `assert!` takes.
    pub fn truthy(&self, text: &str) -> Result<bool, Error> {
        Ok(self.eval(text)?.truthy())
    }

    /// Returns the last live evaluation, if any.
    pub(crate) fn last_eval(&self) -> Option<LastEval> {
        self.last.borrow().clone()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_get() {
        let mut scope = Scope::new();
        scope.bind("a", 1).bind("name", "bob");
        assert_eq!(scope.get("a"), Some(&Value::Int(1)));
        assert_eq!(scope.get("name"), Some(&Value::from("bob")));
        assert_eq!(scope.get("missing"), None);
    }

    #[test]
    fn test_truthy_comparison() {
        let mut scope = Scope::new();
        scope.bind("a", 1).bind("b", 2);
        assert!(!scope.truthy("a == b").unwrap());
        assert!(scope.truthy("a < b").unwrap());
    }

    #[test]
    fn test_eval_returns_value() {
        let mut scope = Scope::new();
        scope.bind("a", 7).bind("b", 2);
        assert_eq!(scope.eval("a / b").unwrap(), Value::Float(3.5));
        assert_eq!(scope.eval("a % b").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_undefined_name_is_eval_error() {
        let scope = Scope::new();
        let err = scope.truthy("missing == 1").unwrap_err();
        assert!(matches!(err, Error::Eval(_)));
        assert!(err.to_string().contains("'missing' is not defined"));
    }

    #[test]
    fn test_bad_syntax_is_parse_error() {
        let scope = Scope::new();
        let err = scope.truthy("a ==").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_bound_function_is_callable() {
        let mut scope = Scope::new();
        scope.bind("items", vec![1i64, 2, 3]);
        scope.bind_fn("len", |args| match args {
            [Value::List(items)] => Ok(Value::Int(items.len() as i64)),
            _ => Err(EvalError::new("len expects a list")),
        });
        assert!(scope.truthy("len(items) == 3").unwrap());
    }

    #[test]
    fn test_unknown_function_is_eval_error() {
        let scope = Scope::new();
        let err = scope.truthy("mystery() == 1").unwrap_err();
        assert!(err.to_string().contains("'mystery' is not defined"));
    }

    #[test]
    fn test_mark_without_scope_fails() {
        let mut scope = Scope::new();
        scope.bind("x", 1);
        let err = scope.truthy("that(x) == 1").unwrap_err();
        assert!(matches!(err, Error::NoActiveCaptureScope));
    }

    #[test]
    fn test_last_eval_tracks_latest_expression() {
        let mut scope = Scope::new();
        scope.bind("a", 1);
        scope.truthy("a == 1").unwrap();
        scope.truthy("a == 2").unwrap();
        let last = scope.last_eval().unwrap();
        assert_eq!(last.text, "a == 2");
        assert_eq!(last.result, Value::Bool(false));
    }
}
