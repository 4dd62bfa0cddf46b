//! AST definitions for the assertion expression language with precise
//! source spans.
//!
//! The parser creates this tree once; the live evaluation and the
//! diagnostic reinterpretation both walk the same nodes so value
//! annotations line up with the text the user wrote.

use crate::span::SourceSpan;
use crate::value::Value;

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    /// Short-circuit conjunction (`and`).
    And,
    /// Short-circuit disjunction (`or`).
    Or,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// Equality (`==`).
    Eq,
    /// Inequality (`!=`).
    Ne,
    /// Less-than (`<`).
    Lt,
    /// Less-or-equal (`<=`).
    Le,
    /// Greater-than (`>`).
    Gt,
    /// Greater-or-equal (`>=`).
    Ge,
    /// Membership (`in`).
    In,
    /// Negated membership (`not in`).
    NotIn,
}

impl CmpOp {
    /// Returns the operator symbol.
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
    /// Modulo (`%`).
    Mod,
}

impl BinOp {
    /// Returns the operator symbol.
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`).
    Neg,
    /// Logical negation (`not`).
    Not,
}

/// Expression node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value (`1`, `2.5`, `'text'`, `true`, `none`).
    Literal(Value),
    /// Name reference resolved against the scope bindings.
    Name(String),
    /// Attribute access (`base.field`).
    Attribute {
        /// Base expression.
        base: Box<Expr>,
        /// Attribute name.
        attr: String,
    },
    /// Index access (`base[index]`).
    Index {
        /// Base expression.
        base: Box<Expr>,
        /// Index expression.
        index: Box<Expr>,
    },
    /// Function call (`name(args...)`).
    Call {
        /// Function name.
        name: String,
        /// Call arguments.
        args: Vec<Expr>,
    },
    /// Unary operation.
    Unary {
        /// Operator kind.
        op: UnaryOp,
        /// Operand expression.
        operand: Box<Expr>,
    },
    /// Binary operation.
    Binary {
        /// Operator kind.
        op: BinOp,
        /// Span of the operator token.
        op_span: SourceSpan,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Comparison chain (`a < b <= c` compares pairwise).
    Compare {
        /// Leftmost operand.
        first: Box<Expr>,
        /// Each following operator and operand, in source order.
        rest: Vec<(CmpOp, SourceSpan, Expr)>,
    },
    /// Boolean chain (`a and b and c`), operands in declaration order.
    Bool {
        /// Connective kind.
        op: BoolOp,
        /// Spans of the operator keywords, one per pair.
        op_spans: Vec<SourceSpan>,
        /// Operand expressions.
        operands: Vec<Expr>,
    },
    /// List literal (`[a, b, c]`).
    List(Vec<Expr>),
}

/// Spanned expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Expression payload.
    pub kind: ExprKind,
    /// Source location within the expression text.
    pub span: SourceSpan,
}
