//! Runtime values for the assertion expression language.
//!
//! Values are snapshots bound into a [`Scope`](crate::Scope) before the
//! assertion runs. Semantics follow the expression language rather than
//! Rust: `==` compares ints and floats numerically, `and`/`or` return
//! operand values, and truthiness treats empty collections as false.

use std::cmp::Ordering;
use std::fmt;

use crate::ast::{BinOp, CmpOp, UnaryOp};
use crate::error::EvalError;

/// Upper bound on rendered value length in diagnostics.
const MAX_RENDERED: usize = 4096;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value (`none`).
    None,
    /// Boolean (`true`/`false`).
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Str(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Key-value mapping with insertion order preserved.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Returns the truthiness of the value.
    ///
    /// `none`, `false`, zero and empty collections are falsy; everything
    /// else is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
        }
    }

    /// Returns a short name for the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Equality under expression-language semantics.
    ///
    /// Ints and floats compare numerically; values of unrelated types are
    /// unequal rather than an error.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(bk, bv)| bk == k && bv.loose_eq(v))
                    })
            }
            _ => false,
        }
    }

    /// Ordering under expression-language semantics.
    ///
    /// Numbers order numerically, strings lexicographically and lists
    /// elementwise. `Ok(None)` means the values are numeric but unordered
    /// (NaN); unrelated types are an error.
    fn loose_cmp(&self, other: &Value) -> Result<Option<Ordering>, EvalError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
            (Value::Float(a), Value::Float(b)) => Ok(a.partial_cmp(b)),
            (Value::Int(a), Value::Float(b)) => Ok((*a as f64).partial_cmp(b)),
            (Value::Float(a), Value::Int(b)) => Ok(a.partial_cmp(&(*b as f64))),
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.loose_cmp(y)? {
                        Some(Ordering::Equal) => continue,
                        other => return Ok(other),
                    }
                }
                Ok(Some(a.len().cmp(&b.len())))
            }
            _ => Err(EvalError::new(format!(
                "ordering is not supported between '{}' and '{}'",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Membership test (`needle in self`).
    fn contains(&self, needle: &Value) -> Result<bool, EvalError> {
        match (self, needle) {
            (Value::List(items), _) => Ok(items.iter().any(|v| v.loose_eq(needle))),
            (Value::Str(hay), Value::Str(sub)) => Ok(hay.contains(sub.as_str())),
            (Value::Map(entries), Value::Str(key)) => {
                Ok(entries.iter().any(|(k, _)| k == key))
            }
            _ => Err(EvalError::new(format!(
                "'in' is not supported between '{}' and '{}'",
                needle.type_name(),
                self.type_name()
            ))),
        }
    }

    /// Renders the value in expression-language syntax, bounded and
    /// escape-safe. Never fails.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        if out.len() > MAX_RENDERED {
            let mut cut = MAX_RENDERED;
            while !out.is_char_boundary(cut) {
                cut -= 1;
            }
            out.truncate(cut);
            out.push_str("...");
        }
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Value::None => out.push_str("none"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Int(n) => {
                out.push_str(&n.to_string());
            }
            Value::Float(f) => render_float(*f, out),
            Value::Str(s) => render_str(s, out),
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render_into(out);
                }
                out.push(']');
            }
            Value::Map(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    render_str(key, out);
                    out.push_str(": ");
                    value.render_into(out);
                }
                out.push('}');
            }
        }
    }
}

fn render_float(f: f64, out: &mut String) {
    if f.is_nan() {
        out.push_str("nan");
    } else if f.is_infinite() {
        out.push_str(if f > 0.0 { "inf" } else { "-inf" });
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        out.push_str(&format!("{:.1}", f));
    } else {
        out.push_str(&f.to_string());
    }
}

fn render_str(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// ---------------------------------------------------------------------------
// Operator application
// ---------------------------------------------------------------------------

/// Applies a binary arithmetic operator.
pub(crate) fn apply_binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let unsupported = || {
        EvalError::new(format!(
            "'{}' is not supported between '{}' and '{}'",
            op.as_str(),
            left.type_name(),
            right.type_name()
        ))
    };
    match op {
        BinOp::Add => match (left, right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::new("integer overflow")),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Ok(Value::List(out))
            }
            _ => numeric(left, right, f64_add).ok_or_else(unsupported),
        },
        BinOp::Sub => match (left, right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::new("integer overflow")),
            _ => numeric(left, right, f64_sub).ok_or_else(unsupported),
        },
        BinOp::Mul => match (left, right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::new("integer overflow")),
            _ => numeric(left, right, f64_mul).ok_or_else(unsupported),
        },
        BinOp::Div => {
            if is_zero(right) {
                return Err(EvalError::new("division by zero"));
            }
            // True division: ints divide into a float.
            numeric(left, right, f64_div).ok_or_else(unsupported)
        }
        BinOp::Mod => {
            if is_zero(right) {
                return Err(EvalError::new("modulo by zero"));
            }
            match (left, right) {
                // Result takes the sign of the divisor.
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(((a % b) + b) % b)),
                _ => numeric(left, right, f64_mod).ok_or_else(unsupported),
            }
        }
    }
}

fn f64_add(a: f64, b: f64) -> f64 {
    a + b
}

fn f64_sub(a: f64, b: f64) -> f64 {
    a - b
}

fn f64_mul(a: f64, b: f64) -> f64 {
    a * b
}

fn f64_div(a: f64, b: f64) -> f64 {
    a / b
}

fn f64_mod(a: f64, b: f64) -> f64 {
    a - b * (a / b).floor()
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn is_zero(value: &Value) -> bool {
    matches!(value, Value::Int(0)) || matches!(value, Value::Float(f) if *f == 0.0)
}

fn numeric(left: &Value, right: &Value, f: fn(f64, f64) -> f64) -> Option<Value> {
    Some(Value::Float(f(as_f64(left)?, as_f64(right)?)))
}

/// Applies a comparison operator, yielding the pairwise boolean result.
pub(crate) fn apply_compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let ordering = |l: &Value, r: &Value| {
        l.loose_cmp(r).map_err(|_| {
            EvalError::new(format!(
                "'{}' is not supported between '{}' and '{}'",
                op.as_str(),
                l.type_name(),
                r.type_name()
            ))
        })
    };
    match op {
        CmpOp::Eq => Ok(left.loose_eq(right)),
        CmpOp::Ne => Ok(!left.loose_eq(right)),
        CmpOp::Lt => Ok(matches!(ordering(left, right)?, Some(Ordering::Less))),
        CmpOp::Le => Ok(matches!(
            ordering(left, right)?,
            Some(Ordering::Less | Ordering::Equal)
        )),
        CmpOp::Gt => Ok(matches!(ordering(left, right)?, Some(Ordering::Greater))),
        CmpOp::Ge => Ok(matches!(
            ordering(left, right)?,
            Some(Ordering::Greater | Ordering::Equal)
        )),
        CmpOp::In => right.contains(left),
        CmpOp::NotIn => Ok(!right.contains(left)?),
    }
}

/// Applies a unary operator.
pub(crate) fn apply_unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Neg => match operand {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::new("integer overflow")),
            Value::Float(f) => Ok(Value::Float(-f)),
            _ => Err(EvalError::new(format!(
                "'-' is not supported for '{}'",
                operand.type_name()
            ))),
        },
        UnaryOp::Not => Ok(Value::Bool(!operand.truthy())),
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
