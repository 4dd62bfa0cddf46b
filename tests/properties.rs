//! Property-shaped checks over the public surface.

use avow::{Scope, Value};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Comparison operators agree with the host language on integers.
    #[test]
    fn truthy_matches_native_comparisons(a in any::<i64>(), b in any::<i64>()) {
        let mut scope = Scope::new();
        scope.bind("a", a).bind("b", b);
        prop_assert_eq!(scope.truthy("a == b").unwrap(), a == b);
        prop_assert_eq!(scope.truthy("a != b").unwrap(), a != b);
        prop_assert_eq!(scope.truthy("a < b").unwrap(), a < b);
        prop_assert_eq!(scope.truthy("a <= b").unwrap(), a <= b);
    }

    /// Division of integers always yields the true quotient.
    #[test]
    fn division_is_true_division(a in -1_000_000i64..1_000_000, b in 1i64..1_000) {
        let mut scope = Scope::new();
        scope.bind("a", a).bind("b", b);
        prop_assert_eq!(scope.eval("a / b").unwrap(), Value::Float(a as f64 / b as f64));
    }

    /// A chained comparison equals the conjunction of its pairs.
    #[test]
    fn chained_comparison_is_pairwise(a in any::<i64>(), b in any::<i64>(), c in any::<i64>()) {
        let mut scope = Scope::new();
        scope.bind("a", a).bind("b", b).bind("c", c);
        prop_assert_eq!(scope.truthy("a < b < c").unwrap(), a < b && b < c);
    }

    /// Reinterpreting the same expression twice yields the same sequence.
    #[test]
    fn reports_are_idempotent(a in any::<i64>(), b in any::<i64>()) {
        let mut scope = Scope::new();
        scope.bind("a", a).bind("b", b);
        scope.truthy("a < b and b < a").unwrap();
        let first = avow::error(&scope);
        let second = avow::error(&scope);
        prop_assert_eq!(first.values(), second.values());
    }

    /// Rendering never panics, whatever the bindings hold.
    #[test]
    fn rendering_never_panics(a in any::<i64>(), text in "[a-z]{0,20}") {
        let mut scope = Scope::new();
        scope.bind("a", a).bind("s", text);
        scope.truthy("a == 0 or s == 'x'").unwrap();
        let rendered = avow::error(&scope).to_string();
        prop_assert!(rendered.starts_with("Oops! Assertion failed"));
    }
}
