//! Aggregation of several failed assertions into one error.

use avow::{Error, FailureScope, Scope};

fn check(scope: &Scope, expression: &str) -> Result<(), Error> {
    if !scope.truthy(expression)? {
        return Err(avow::error(scope).into());
    }
    Ok(())
}

#[test]
fn test_two_soft_failures_are_joined() {
    let mut scope = Scope::new();
    scope.bind("a", 1).bind("b", 2);

    let mut failures = FailureScope::new();
    failures.soft(|| check(&scope, "a == 2"));
    failures.soft(|| check(&scope, "b == 2"));
    failures.soft(|| check(&scope, "b == 1"));

    let err = failures.close().unwrap_err();
    let text = err.to_string();

    assert_eq!(text.matches("Oops! Assertion failed").count(), 2);
    assert_eq!(text.matches("as well as the following assertion").count(), 1);
    assert!(text.contains("a == 2"));
    assert!(text.contains("b == 1"));
}

#[test]
fn test_clean_scope_closes_quietly() {
    let mut scope = Scope::new();
    scope.bind("a", 1);

    let mut failures = FailureScope::new();
    failures.soft(|| check(&scope, "a == 1"));
    assert!(failures.close().is_ok());
}

#[test]
fn test_hard_failure_without_recordings_propagates() {
    let mut scope = Scope::new();
    scope.bind("a", 1);

    let result = FailureScope::run(|_| {
        // a syntax error is a hard failure, not an assertion
        scope.truthy("a ==")?;
        Ok(())
    });
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[test]
fn test_hard_failure_after_soft_recordings_is_bundled() {
    let mut scope = Scope::new();
    scope.bind("a", 1);

    let result: Result<(), Error> = FailureScope::run(|failures| {
        failures.soft(|| check(&scope, "a == 2"));
        scope.truthy("a ==")?;
        Ok(())
    });

    match result.unwrap_err() {
        Error::Aggregate(bundle) => {
            assert_eq!(bundle.len(), 2);
            assert!(bundle.failures[0].starts_with("Oops! Assertion failed"));
            assert!(bundle.failures[1].starts_with("syntax error"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_recording_order_is_kept() {
    let mut scope = Scope::new();
    scope.bind("n", 0);

    let mut failures = FailureScope::new();
    for expression in ["n == 1", "n == 2", "n == 3"] {
        failures.soft(|| check(&scope, expression));
    }

    let err = failures.close().unwrap_err();
    let text = err.to_string();
    let first = text.find("n == 1").unwrap();
    let second = text.find("n == 2").unwrap();
    let third = text.find("n == 3").unwrap();
    assert!(first < second && second < third);
}
