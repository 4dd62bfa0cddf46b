//! Demo of the assertion-diagnostics flow: scoped bindings, capture
//! marks and failure aggregation.

use avow::{CaptureScope, FailureScope, Scope, Sections, Value};

fn main() -> anyhow::Result<()> {
    // Example 1: a failing comparison and its full report
    println!("=== Failing Comparison ===");
    let mut scope = Scope::new();
    scope.bind("total", 3).bind("expected", 4);
    if !scope.truthy("total == expected")? {
        println!("{}", avow::error_desc(&scope, "totals should agree"));
    }

    // Example 2: a capture mark reuses the live call result
    println!("\n=== Capture Marks ===");
    let mut scope = Scope::new();
    scope.bind_fn("load_count", |_| Ok(Value::Int(3)));
    let _guard = CaptureScope::enter();
    if !scope.truthy("that(load_count()) == 4")? {
        let report = avow::error(&scope).sections(Sections::new().location(false));
        println!("{report}");
    }

    // Example 3: collecting several failures into one error
    println!("\n=== Aggregation ===");
    let mut scope = Scope::new();
    scope.bind("a", 1).bind("b", 2);
    let mut failures = FailureScope::new();
    for expression in ["a == 1", "a == b", "b == 2", "a > b"] {
        failures.soft(|| {
            if !scope.truthy(expression)? {
                return Err(avow::error(&scope).into());
            }
            Ok(())
        });
    }
    if let Err(err) = failures.close() {
        println!("{err}");
    }

    Ok(())
}
