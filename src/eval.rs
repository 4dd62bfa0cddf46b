//! Live evaluation and diagnostic reinterpretation of expression trees.
//!
//! One tree, two passes. The live pass computes the value the user
//! asserts on, recording `that(...)` marks into the active capture
//! frame. The reinterpretation pass re-walks the same tree against the
//! same bindings and emits an ordered [`CapturedValue`] sequence for the
//! report: operand values at their own spans, operator results at the
//! operator spans and the overall boolean at the expression start.
//!
//! Short-circuit behavior is identical in both passes: an operand the
//! live pass never evaluated is never reported.

use crate::ast::{BoolOp, Expr, ExprKind};
use crate::capture;
use crate::error::{Error, EvalError};
use crate::scope::Scope;
use crate::span::SourceSpan;
use crate::value::{self, Value};

/// Marker shown when a subtree can no longer be evaluated during the
/// diagnostic pass.
const UNAVAILABLE: &str = "<unavailable>";

/// One value annotation produced by the reinterpretation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedValue {
    /// Span within the expression text the annotation points at.
    pub span: SourceSpan,
    /// Rendered value; computed results carry a `= ` prefix.
    pub rendered: String,
    /// Whether the value came from a capture-scope mark instead of
    /// being recomputed.
    pub substituted: bool,
}

#[derive(Default)]
struct Recorder {
    values: Vec<CapturedValue>,
}

impl Recorder {
    fn plain(&mut self, span: &SourceSpan, value: &Value) {
        self.values.push(CapturedValue {
            span: span.clone(),
            rendered: value.render(),
            substituted: false,
        });
    }

    fn result(&mut self, span: &SourceSpan, value: &Value) {
        self.values.push(CapturedValue {
            span: span.clone(),
            rendered: format!("= {}", value.render()),
            substituted: false,
        });
    }

    fn substituted(&mut self, span: &SourceSpan, value: &Value) {
        self.values.push(CapturedValue {
            span: span.clone(),
            rendered: format!("= {}", value.render()),
            substituted: true,
        });
    }

    fn unavailable(&mut self, span: &SourceSpan) {
        self.values.push(CapturedValue {
            span: span.clone(),
            rendered: UNAVAILABLE.into(),
            substituted: false,
        });
    }
}

// ---------------------------------------------------------------------------
// Live pass
// ---------------------------------------------------------------------------

/// Evaluates the tree against the scope bindings, recording `that(...)`
/// marks into the active capture frame.
pub(crate) fn live(scope: &Scope, expr: &Expr) -> Result<Value, Error> {
    match &expr.kind {
        ExprKind::Literal(v) => Ok(v.clone()),
        ExprKind::Name(name) => Ok(resolve(scope, name)?),
        ExprKind::Attribute { base, attr } => {
            let base = live(scope, base)?;
            Ok(attribute(&base, attr)?)
        }
        ExprKind::Index { base, index } => {
            let base = live(scope, base)?;
            let index = live(scope, index)?;
            Ok(index_value(&base, &index)?)
        }
        ExprKind::Call { name, args } => {
            if name == "that" {
                if !capture::is_active() {
                    return Err(Error::NoActiveCaptureScope);
                }
                let [arg] = args.as_slice() else {
                    return Err(that_arity());
                };
                // The mark: evaluate once, record, pass through.
                let value = live(scope, arg)?;
                capture::record(&expr.span, value.clone())?;
                return Ok(value);
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(live(scope, arg)?);
            }
            Ok(scope.call(name, &values)?)
        }
        ExprKind::Unary { op, operand } => {
            let operand = live(scope, operand)?;
            Ok(value::apply_unary(*op, &operand)?)
        }
        ExprKind::Binary {
            op, left, right, ..
        } => {
            let left = live(scope, left)?;
            let right = live(scope, right)?;
            Ok(value::apply_binary(*op, &left, &right)?)
        }
        ExprKind::Compare { first, rest } => {
            let mut left = live(scope, first)?;
            for (op, _, comparator) in rest {
                let right = live(scope, comparator)?;
                if !value::apply_compare(*op, &left, &right)? {
                    // Later pairs are never evaluated.
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        ExprKind::Bool { op, operands, .. } => {
            let mut result = live(scope, &operands[0])?;
            for operand in &operands[1..] {
                if decided(*op, &result) {
                    break;
                }
                result = live(scope, operand)?;
            }
            // `and`/`or` return the deciding operand value.
            Ok(result)
        }
        ExprKind::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(live(scope, item)?);
            }
            Ok(Value::List(values))
        }
    }
}

/// Returns whether a boolean chain short-circuits on this value.
fn decided(op: BoolOp, value: &Value) -> bool {
    match op {
        BoolOp::And => !value.truthy(),
        BoolOp::Or => value.truthy(),
    }
}

fn that_arity() -> Error {
    Error::UnsupportedExpressionForm("that(...) takes exactly one argument".into())
}

fn resolve(scope: &Scope, name: &str) -> Result<Value, EvalError> {
    scope
        .get(name)
        .cloned()
        .ok_or_else(|| EvalError::new(format!("name '{name}' is not defined")))
}

fn attribute(base: &Value, attr: &str) -> Result<Value, EvalError> {
    if let Value::Map(entries) = base {
        if let Some((_, v)) = entries.iter().find(|(k, _)| k == attr) {
            return Ok(v.clone());
        }
    }
    Err(EvalError::new(format!(
        "'{}' has no attribute '{}'",
        base.type_name(),
        attr
    )))
}

fn index_value(base: &Value, index: &Value) -> Result<Value, EvalError> {
    match (base, index) {
        (Value::List(items), Value::Int(i)) => normalize(items.len(), *i)
            .map(|idx| items[idx].clone())
            .ok_or_else(|| EvalError::new("list index out of range")),
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            normalize(chars.len(), *i)
                .map(|idx| Value::Str(chars[idx].to_string()))
                .ok_or_else(|| EvalError::new("string index out of range"))
        }
        (Value::Map(entries), Value::Str(key)) => entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| EvalError::new(format!("key '{key}' not found"))),
        _ => Err(EvalError::new(format!(
            "'{}' is not indexable by '{}'",
            base.type_name(),
            index.type_name()
        ))),
    }
}

/// Maps a possibly negative index to a position; negative indexes count
/// from the end.
fn normalize(len: usize, i: i64) -> Option<usize> {
    if i < 0 {
        let j = len as i64 + i;
        (j >= 0).then(|| j as usize)
    } else {
        ((i as usize) < len).then(|| i as usize)
    }
}

// ---------------------------------------------------------------------------
// Reinterpretation pass
// ---------------------------------------------------------------------------

/// Re-walks the tree and produces the ordered annotation sequence for
/// the report. `live_result` is the value the live pass produced; it
/// backs the overall entry when the re-walk itself degrades.
pub(crate) fn reinterpret(scope: &Scope, expr: &Expr, live_result: &Value) -> Vec<CapturedValue> {
    let mut rec = Recorder::default();
    let overall = match walk(scope, expr, &mut rec) {
        Ok(value) => Value::Bool(value.truthy()),
        Err(_) => Value::Bool(live_result.truthy()),
    };
    let anchor = SourceSpan {
        start: expr.span.start,
        end: expr.span.start,
        line: expr.span.line,
        column: expr.span.column,
    };
    rec.plain(&anchor, &overall);
    rec.values
}

/// Walks a child in operand position: names and index accesses do not
/// record themselves, so the parent records their value here.
fn walk_operand(scope: &Scope, expr: &Expr, rec: &mut Recorder) -> Result<Value, Error> {
    let value = walk(scope, expr, rec)?;
    if matches!(expr.kind, ExprKind::Name(_) | ExprKind::Index { .. }) {
        rec.plain(&expr.span, &value);
    }
    Ok(value)
}

fn walk(scope: &Scope, expr: &Expr, rec: &mut Recorder) -> Result<Value, Error> {
    // A span the live pass marked is substituted, never recomputed.
    if let Some(value) = capture::lookup(&expr.span) {
        rec.substituted(&expr.span, &value);
        return Ok(value);
    }
    match &expr.kind {
        ExprKind::Literal(v) => Ok(v.clone()),
        ExprKind::Name(name) => match resolve(scope, name) {
            Ok(value) => Ok(value),
            Err(err) => {
                rec.unavailable(&expr.span);
                Err(degrade(err))
            }
        },
        ExprKind::Attribute { base, attr } => {
            let base_value = walk(scope, base, rec)?;
            rec.plain(&expr.span, &base_value);
            match attribute(&base_value, attr) {
                Ok(value) => {
                    rec.result(&expr.span, &value);
                    Ok(value)
                }
                Err(err) => {
                    rec.unavailable(&expr.span);
                    Err(degrade(err))
                }
            }
        }
        ExprKind::Index { base, index } => {
            // Index internals are opaque in the report; only the access
            // result is shown, recorded by the parent.
            match quiet(scope, base).and_then(|b| {
                let i = quiet(scope, index)?;
                index_value(&b, &i)
            }) {
                Ok(value) => Ok(value),
                Err(err) => {
                    rec.unavailable(&expr.span);
                    Err(degrade(err))
                }
            }
        }
        ExprKind::Call { name, args } => {
            if name == "that" {
                // No recorded mark for this span: fall back to
                // recomputing the argument directly.
                let [arg] = args.as_slice() else {
                    rec.unavailable(&expr.span);
                    return Err(that_arity());
                };
                let value = walk_operand(scope, arg, rec)?;
                rec.result(&expr.span, &value);
                return Ok(value);
            }
            let mut values = Vec::with_capacity(args.len());
            let mut lost = false;
            for arg in args {
                // Remaining arguments still report their values even
                // when an earlier one degrades.
                match walk_operand(scope, arg, rec) {
                    Ok(value) => values.push(value),
                    Err(_) => lost = true,
                }
            }
            if lost {
                return Err(Error::Reinterpretation(format!(
                    "argument of '{name}' unavailable"
                )));
            }
            match scope.call(name, &values) {
                Ok(value) => {
                    rec.result(&expr.span, &value);
                    Ok(value)
                }
                Err(err) => {
                    rec.unavailable(&expr.span);
                    Err(degrade(err))
                }
            }
        }
        ExprKind::Unary { op, operand } => {
            let operand = walk_operand(scope, operand, rec)?;
            match value::apply_unary(*op, &operand) {
                Ok(result) => {
                    rec.result(&expr.span, &result);
                    Ok(result)
                }
                Err(err) => {
                    rec.unavailable(&expr.span);
                    Err(degrade(err))
                }
            }
        }
        ExprKind::Binary {
            op,
            op_span,
            left,
            right,
        } => {
            let left = walk_operand(scope, left, rec);
            let right = walk_operand(scope, right, rec);
            let (left, right) = (left?, right?);
            match value::apply_binary(*op, &left, &right) {
                Ok(result) => {
                    rec.result(op_span, &result);
                    Ok(result)
                }
                Err(err) => {
                    rec.unavailable(op_span);
                    Err(degrade(err))
                }
            }
        }
        ExprKind::Compare { first, rest } => {
            let mut left = walk_operand(scope, first, rec)?;
            for (op, op_span, comparator) in rest {
                let right = walk_operand(scope, comparator, rec)?;
                match value::apply_compare(*op, &left, &right) {
                    Ok(result) => {
                        rec.result(op_span, &Value::Bool(result));
                        if !result {
                            return Ok(Value::Bool(false));
                        }
                    }
                    Err(err) => {
                        rec.unavailable(op_span);
                        return Err(degrade(err));
                    }
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        ExprKind::Bool {
            op,
            op_spans,
            operands,
        } => {
            let mut result = walk_operand(scope, &operands[0], rec)?;
            for (operand, op_span) in operands[1..].iter().zip(op_spans) {
                if decided(*op, &result) {
                    break;
                }
                let right = walk_operand(scope, operand, rec)?;
                rec.result(op_span, &right);
                result = right;
            }
            Ok(result)
        }
        ExprKind::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            let mut lost = false;
            for item in items {
                match walk_operand(scope, item, rec) {
                    Ok(value) => values.push(value),
                    Err(_) => lost = true,
                }
            }
            if lost {
                return Err(Error::Reinterpretation("list element unavailable".into()));
            }
            let result = Value::List(values);
            rec.result(&expr.span, &result);
            Ok(result)
        }
    }
}

fn degrade(err: EvalError) -> Error {
    Error::Reinterpretation(err.message)
}

/// Evaluates a subtree for the diagnostic pass without emitting
/// annotations. Marked spans are still substituted, never recomputed.
fn quiet(scope: &Scope, expr: &Expr) -> Result<Value, EvalError> {
    if let Some(value) = capture::lookup(&expr.span) {
        return Ok(value);
    }
    match &expr.kind {
        ExprKind::Literal(v) => Ok(v.clone()),
        ExprKind::Name(name) => resolve(scope, name),
        ExprKind::Attribute { base, attr } => attribute(&quiet(scope, base)?, attr),
        ExprKind::Index { base, index } => {
            index_value(&quiet(scope, base)?, &quiet(scope, index)?)
        }
        ExprKind::Call { name, args } => {
            if name == "that" {
                let [arg] = args.as_slice() else {
                    return Err(EvalError::new("that(...) takes exactly one argument"));
                };
                return quiet(scope, arg);
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(quiet(scope, arg)?);
            }
            scope.call(name, &values)
        }
        ExprKind::Unary { op, operand } => value::apply_unary(*op, &quiet(scope, operand)?),
        ExprKind::Binary {
            op, left, right, ..
        } => value::apply_binary(*op, &quiet(scope, left)?, &quiet(scope, right)?),
        ExprKind::Compare { first, rest } => {
            let mut left = quiet(scope, first)?;
            for (op, _, comparator) in rest {
                let right = quiet(scope, comparator)?;
                if !value::apply_compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        ExprKind::Bool { op, operands, .. } => {
            let mut result = quiet(scope, &operands[0])?;
            for operand in &operands[1..] {
                if decided(*op, &result) {
                    break;
                }
                result = quiet(scope, operand)?;
            }
            Ok(result)
        }
        ExprKind::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(quiet(scope, item)?);
            }
            Ok(Value::List(values))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureScope;
    use crate::parser::parse_expression;
    use std::cell::Cell;
    use std::rc::Rc;

    fn reinterpret_last(scope: &Scope) -> Vec<CapturedValue> {
        let last = scope.last_eval().unwrap();
        reinterpret(scope, &last.expr, &last.result)
    }

    #[test]
    fn test_live_short_circuit_and_skips_calls() {
        let mut scope = Scope::new();
        scope.bind("a", false);
        scope.bind_fn("boom", |_| Err(EvalError::new("must not be called")));
        assert!(!scope.truthy("a and boom()").unwrap());
    }

    #[test]
    fn test_live_or_returns_operand_value() {
        let mut scope = Scope::new();
        scope.bind("a", 0).bind("b", 7);
        assert_eq!(scope.eval("a or b").unwrap(), Value::Int(7));
        assert_eq!(scope.eval("b or a").unwrap(), Value::Int(7));
    }

    #[test]
    fn test_live_attribute_and_index() {
        let mut scope = Scope::new();
        scope.bind(
            "user",
            Value::Map(vec![
                ("name".into(), Value::from("bob")),
                ("tags".into(), Value::from(vec!["admin", "ops"])),
            ]),
        );
        assert!(scope.truthy("user.name == 'bob'").unwrap());
        assert!(scope.truthy("user.tags[0] == 'admin'").unwrap());
        assert!(scope.truthy("user.tags[-1] == 'ops'").unwrap());
    }

    #[test]
    fn test_live_index_out_of_range() {
        let mut scope = Scope::new();
        scope.bind("items", vec![1i64]);
        let err = scope.truthy("items[3] == 1").unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_reinterpret_literal_comparison() {
        let scope = Scope::new();
        scope.truthy("1 == 2").unwrap();
        let values = reinterpret_last(&scope);
        // Pairwise result at the operator, overall result at the start.
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].span.start, 2);
        assert_eq!(values[0].rendered, "= false");
        assert_eq!(values[1].span.start, 0);
        assert_eq!(values[1].rendered, "false");
    }

    #[test]
    fn test_reinterpret_records_name_operands() {
        let mut scope = Scope::new();
        scope.bind("a", 1).bind("b", 2);
        scope.truthy("a == b").unwrap();
        let values = reinterpret_last(&scope);
        let rendered: Vec<&str> = values.iter().map(|v| v.rendered.as_str()).collect();
        assert_eq!(rendered, ["1", "2", "= false", "false"]);
        assert_eq!(values[0].span.start, 0);
        assert_eq!(values[1].span.start, 5);
        assert_eq!(values[2].span.start, 2);
    }

    #[test]
    fn test_reinterpret_short_circuit_skips_unbound_operand() {
        let mut scope = Scope::new();
        scope.bind("a", 1).bind("b", 0);
        // `c` is unbound but never visited.
        scope.truthy("a and b and c").unwrap();
        let values = reinterpret_last(&scope);
        let rendered: Vec<&str> = values.iter().map(|v| v.rendered.as_str()).collect();
        assert_eq!(rendered, ["1", "0", "= 0", "false"]);
    }

    #[test]
    fn test_reinterpret_comparison_chain_cutoff() {
        let mut scope = Scope::new();
        scope.bind("a", 1).bind("b", 5).bind("c", 3);
        scope.truthy("a < b < c").unwrap();
        let values = reinterpret_last(&scope);
        let rendered: Vec<&str> = values.iter().map(|v| v.rendered.as_str()).collect();
        // Both pairs visited: the first is true, the second false.
        assert_eq!(rendered, ["1", "5", "= true", "3", "= false", "false"]);
    }

    #[test]
    fn test_reinterpret_substitutes_marked_call() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut scope = Scope::new();
        scope.bind_fn("next_id", move |_| {
            counter.set(counter.get() + 1);
            Ok(Value::Int(counter.get() as i64))
        });
        let _guard = CaptureScope::enter();
        assert!(!scope.truthy("that(next_id()) == 99").unwrap());
        let values = reinterpret_last(&scope);
        // The mark is substituted; the function ran exactly once.
        assert_eq!(calls.get(), 1);
        assert_eq!(values[0].rendered, "= 1");
        assert!(values[0].substituted);
        assert_eq!(values[1].rendered, "= false");
        assert_eq!(values[2].rendered, "false");
    }

    #[test]
    fn test_reinterpret_unmarked_call_is_recomputed() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut scope = Scope::new();
        scope.bind_fn("next_id", move |_| {
            counter.set(counter.get() + 1);
            Ok(Value::Int(counter.get() as i64))
        });
        assert!(!scope.truthy("next_id() == 99").unwrap());
        let values = reinterpret_last(&scope);
        // Recomputed without a mark: the second call shows `2`.
        assert_eq!(calls.get(), 2);
        assert_eq!(values[0].rendered, "= 2");
        assert!(!values[0].substituted);
    }

    #[test]
    fn test_reinterpret_degrades_failing_subtree() {
        let remaining = Rc::new(Cell::new(1));
        let budget = Rc::clone(&remaining);
        let mut scope = Scope::new();
        scope.bind_fn("once", move |_| {
            if budget.get() == 0 {
                return Err(EvalError::new("spent"));
            }
            budget.set(budget.get() - 1);
            Ok(Value::Int(2))
        });
        assert!(!scope.truthy("once() == 1").unwrap());
        let values = reinterpret_last(&scope);
        // The call degrades; the overall entry falls back to the live
        // result.
        assert_eq!(values[0].rendered, UNAVAILABLE);
        assert_eq!(values.last().unwrap().rendered, "false");
    }

    #[test]
    fn test_reinterpret_attribute_records_base_and_result() {
        let mut scope = Scope::new();
        scope.bind("user", Value::Map(vec![("name".into(), Value::from("bob"))]));
        scope.truthy("user.name == 'alice'").unwrap();
        let values = reinterpret_last(&scope);
        let rendered: Vec<&str> = values.iter().map(|v| v.rendered.as_str()).collect();
        assert_eq!(
            rendered,
            ["{'name': 'bob'}", "= 'bob'", "= false", "false"]
        );
        // Base and result annotations share the attribute span.
        assert_eq!(values[0].span.start, 0);
        assert_eq!(values[1].span.start, 0);
    }

    #[test]
    fn test_reinterpret_index_internals_are_opaque() {
        let mut scope = Scope::new();
        scope.bind("items", vec![10i64, 20]).bind("i", 1);
        scope.truthy("items[i] == 99").unwrap();
        let values = reinterpret_last(&scope);
        let rendered: Vec<&str> = values.iter().map(|v| v.rendered.as_str()).collect();
        // `i` itself is not annotated, only the access result.
        assert_eq!(rendered, ["20", "= false", "false"]);
    }

    #[test]
    fn test_reinterpret_is_idempotent() {
        let mut scope = Scope::new();
        scope.bind("a", 1).bind("b", 2);
        scope.truthy("a + 1 == b and a < b").unwrap();
        let expr = parse_expression("a + 1 == b and a < b").unwrap();
        let first = reinterpret(&scope, &expr, &Value::Bool(true));
        let second = reinterpret(&scope, &expr, &Value::Bool(true));
        assert_eq!(first, second);
    }
}
