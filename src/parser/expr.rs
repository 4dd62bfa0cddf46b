//! Expression grammar, lowest precedence first.

use nom::Parser;
use nom::{
    branch::alt,
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::separated_list0,
    sequence::{preceded, tuple},
    Slice,
};

use super::utils;
use super::PResult;
use crate::ast::{BinOp, BoolOp, CmpOp, Expr, ExprKind, UnaryOp};
use crate::span::{Input, SourceSpan};
use crate::value::Value;

/// Words that can never be identifiers or call names.
const KEYWORDS: &[&str] = &["and", "or", "not", "in", "true", "false", "none"];

/// Top-level expression parser.
pub(super) fn expr(input: Input<'_>) -> PResult<'_, Expr> {
    parse_or(input)
}

/// Parses `or` chains; `a or b or c` becomes one node with three operands.
fn parse_or(input: Input<'_>) -> PResult<'_, Expr> {
    parse_bool_chain(input, BoolOp::Or, "or", parse_and)
}

/// Parses `and` chains; `a and b and c` becomes one node with three operands.
fn parse_and(input: Input<'_>) -> PResult<'_, Expr> {
    parse_bool_chain(input, BoolOp::And, "and", parse_not)
}

fn parse_bool_chain<'a>(
    input: Input<'a>,
    op: BoolOp,
    kw: &'static str,
    mut operand: impl FnMut(Input<'a>) -> PResult<'a, Expr>,
) -> PResult<'a, Expr> {
    let (mut input, first) = operand(input)?;
    let mut operands = vec![first];
    let mut op_spans = Vec::new();
    loop {
        let (next, found) = opt(utils::op_keyword(kw)).parse(input)?;
        let Some(op_span) = found else {
            break;
        };
        let (next, right) = operand(next)?;
        op_spans.push(op_span);
        operands.push(right);
        input = next;
    }
    if op_spans.is_empty() {
        // Single operand, no connective: no wrapper node.
        return Ok((input, operands.remove(0)));
    }
    let span = operands[0].span.merge(&operands[operands.len() - 1].span);
    Ok((
        input,
        Expr {
            kind: ExprKind::Bool {
                op,
                op_spans,
                operands,
            },
            span,
        },
    ))
}

/// Parses `not`, which binds looser than comparisons (`not a == b`
/// negates the whole comparison).
fn parse_not(input: Input<'_>) -> PResult<'_, Expr> {
    let (input, _) = utils::ws0(input)?;
    let start = input;
    let (after, kw) = opt(utils::keyword("not")).parse(input)?;
    if kw.is_some() {
        let (after, operand) = parse_not(after)?;
        let mut span = SourceSpan::from_bounds(start, start);
        span.end = operand.span.end;
        return Ok((
            after,
            Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            },
        ));
    }
    parse_comparison(input)
}

/// Parses comparison chains (`a < b <= c` compares pairwise).
fn parse_comparison(input: Input<'_>) -> PResult<'_, Expr> {
    let (mut input, first) = parse_arith(input)?;
    let mut rest = Vec::new();
    loop {
        let (next, op) = opt(cmp_op).parse(input)?;
        let Some((op, op_span)) = op else {
            break;
        };
        let (next, right) = parse_arith(next)?;
        rest.push((op, op_span, right));
        input = next;
    }
    if rest.is_empty() {
        return Ok((input, first));
    }
    let span = first.span.merge(&rest[rest.len() - 1].2.span);
    Ok((
        input,
        Expr {
            kind: ExprKind::Compare {
                first: Box::new(first),
                rest,
            },
            span,
        },
    ))
}

fn cmp_op(input: Input<'_>) -> PResult<'_, (CmpOp, SourceSpan)> {
    alt((
        map(utils::op_token("=="), |s| (CmpOp::Eq, s)),
        map(utils::op_token("!="), |s| (CmpOp::Ne, s)),
        map(utils::op_token("<="), |s| (CmpOp::Le, s)),
        map(utils::op_token(">="), |s| (CmpOp::Ge, s)),
        map(utils::op_token("<"), |s| (CmpOp::Lt, s)),
        map(utils::op_token(">"), |s| (CmpOp::Gt, s)),
        not_in_op,
        map(utils::op_keyword("in"), |s| (CmpOp::In, s)),
    ))
    .parse(input)
}

/// Parses the two-word `not in` operator; the span covers both words.
fn not_in_op(input: Input<'_>) -> PResult<'_, (CmpOp, SourceSpan)> {
    let (input, _) = utils::ws0(input)?;
    let start = input;
    let (input, _) = utils::keyword("not")(input)?;
    let (input, _) = utils::ws0(input)?;
    let (input, _) = utils::keyword("in")(input)?;
    Ok((input, (CmpOp::NotIn, SourceSpan::from_bounds(start, input))))
}

/// Parses left-associative `+`/`-`.
fn parse_arith(input: Input<'_>) -> PResult<'_, Expr> {
    let (mut input, mut left) = parse_term(input)?;
    loop {
        let (next, op) = opt(alt((
            map(utils::op_token("+"), |s| (BinOp::Add, s)),
            map(utils::op_token("-"), |s| (BinOp::Sub, s)),
        )))
        .parse(input)?;
        let Some((op, op_span)) = op else {
            break;
        };

        // Left-associative fold: `a-b-c` becomes `(a-b)-c`.
        let (next, right) = parse_term(next)?;
        let span = left.span.merge(&right.span);
        left = Expr {
            kind: ExprKind::Binary {
                op,
                op_span,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        };
        input = next;
    }
    Ok((input, left))
}

/// Parses left-associative `*`/`/`/`%`.
fn parse_term(input: Input<'_>) -> PResult<'_, Expr> {
    let (mut input, mut left) = parse_factor(input)?;
    loop {
        let (next, op) = opt(alt((
            map(utils::op_token("*"), |s| (BinOp::Mul, s)),
            map(utils::op_token("/"), |s| (BinOp::Div, s)),
            map(utils::op_token("%"), |s| (BinOp::Mod, s)),
        )))
        .parse(input)?;
        let Some((op, op_span)) = op else {
            break;
        };

        let (next, right) = parse_factor(next)?;
        let span = left.span.merge(&right.span);
        left = Expr {
            kind: ExprKind::Binary {
                op,
                op_span,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        };
        input = next;
    }
    Ok((input, left))
}

/// Parses unary minus, recursively to support chains like `--x`.
fn parse_factor(input: Input<'_>) -> PResult<'_, Expr> {
    let (input, _) = utils::ws0(input)?;
    let start = input;
    let (after, dash) = opt(char('-')).parse(input)?;
    if dash.is_some() {
        let (after, operand) = parse_factor(after)?;
        let mut span = SourceSpan::from_bounds(start, start);
        span.end = operand.span.end;
        return Ok((
            after,
            Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                span,
            },
        ));
    }
    parse_postfix(input)
}

/// Parses postfix attribute and index chains (`a.b[0].c`).
fn parse_postfix(input: Input<'_>) -> PResult<'_, Expr> {
    let (mut input, mut node) = parse_primary(input)?;
    loop {
        let (next, attr) = opt(preceded(utils::ws_char('.'), utils::identifier)).parse(input)?;
        if let Some(attr) = attr {
            let mut span = node.span.clone();
            span.end = next.location_offset();
            node = Expr {
                kind: ExprKind::Attribute {
                    base: Box::new(node),
                    attr,
                },
                span,
            };
            input = next;
            continue;
        }
        let (next, index) = opt(index_arg).parse(input)?;
        if let Some(index) = index {
            let mut span = node.span.clone();
            span.end = next.location_offset();
            node = Expr {
                kind: ExprKind::Index {
                    base: Box::new(node),
                    index: Box::new(index),
                },
                span,
            };
            input = next;
            continue;
        }
        break;
    }
    Ok((input, node))
}

fn index_arg(input: Input<'_>) -> PResult<'_, Expr> {
    let (input, _) = utils::ws0(input)?;
    let (input, _) = char('[')(input)?;
    let (input, index) = expr(input)?;
    let (input, _) = utils::ws0(input)?;
    let (input, _) = context("']'", char(']')).parse(input)?;
    Ok((input, index))
}

/// Parses expression atoms.
fn parse_primary(input: Input<'_>) -> PResult<'_, Expr> {
    alt((
        parse_const,
        parse_number,
        parse_string,
        parse_list,
        parse_parenthesized,
        parse_ident_or_call,
    ))
    .parse(input)
}

/// Parses the `true`/`false`/`none` constants.
fn parse_const(input: Input<'_>) -> PResult<'_, Expr> {
    let (input, _) = utils::ws0(input)?;
    let start = input;
    let (input, constant) = alt((
        value(Value::Bool(true), utils::keyword("true")),
        value(Value::Bool(false), utils::keyword("false")),
        value(Value::None, utils::keyword("none")),
    ))
    .parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Literal(constant),
            span,
        },
    ))
}

/// Parses integer and float literals. A literal is a float when it
/// carries a fractional part or an exponent.
fn parse_number(input: Input<'_>) -> PResult<'_, Expr> {
    let (input, _) = utils::ws0(input)?;
    let start = input;
    let (input, text) = recognize(tuple((
        digit1,
        opt(preceded(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))
    .parse(input)?;
    let fragment = *text.fragment();
    let is_float = fragment.contains('.') || fragment.contains('e') || fragment.contains('E');
    let literal = if is_float {
        Value::Float(fragment.parse().unwrap_or(f64::NAN))
    } else {
        match fragment.parse::<i64>() {
            Ok(n) => Value::Int(n),
            // Out-of-range integer literals degrade to floats.
            Err(_) => Value::Float(fragment.parse().unwrap_or(f64::NAN)),
        }
    };
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Literal(literal),
            span,
        },
    ))
}

/// Parses quoted string literals with escape processing.
///
/// Both `'...'` and `"..."` are accepted. `\n`, `\t`, `\r`, `\0`,
/// `\\` and escaped quotes are decoded; an unknown escape keeps the
/// backslash verbatim.
fn parse_string(input: Input<'_>) -> PResult<'_, Expr> {
    let (input, _) = utils::ws0(input)?;
    let start = input;
    let mut chars = input.fragment().char_indices();
    let quote = match chars.next() {
        Some((_, c @ ('\'' | '"'))) => c,
        _ => {
            return Err(nom::Err::Error(VerboseError {
                errors: vec![(input, VerboseErrorKind::Char('\''))],
            }))
        }
    };
    let mut text = String::new();
    let mut escaped = false;
    let mut end = None;
    for (idx, c) in chars {
        if escaped {
            match c {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                'r' => text.push('\r'),
                '0' => text.push('\0'),
                '\\' | '\'' | '"' => text.push(c),
                other => {
                    text.push('\\');
                    text.push(other);
                }
            }
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            end = Some(idx + c.len_utf8());
            break;
        } else {
            text.push(c);
        }
    }
    let Some(end) = end else {
        // Unterminated literal: fail hard so `alt` does not retry.
        return Err(nom::Err::Failure(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context("closing quote"))],
        }));
    };
    let rest = input.slice(end..);
    let span = SourceSpan::from_bounds(start, rest);
    Ok((
        rest,
        Expr {
            kind: ExprKind::Literal(Value::Str(text)),
            span,
        },
    ))
}

/// Parses list literals (`[a, b, c]`).
fn parse_list(input: Input<'_>) -> PResult<'_, Expr> {
    let (input, _) = utils::ws0(input)?;
    let start = input;
    let (input, _) = char('[')(input)?;
    let (input, items) = separated_list0(utils::ws_char(','), expr).parse(input)?;
    let (input, _) = utils::ws0(input)?;
    let (input, _) = context("']'", char(']')).parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::List(items),
            span,
        },
    ))
}

/// Parses parenthesized expressions. The group produces no node of its
/// own; the span stays that of the inner expression so carets point at
/// the expression, not the parentheses.
fn parse_parenthesized(input: Input<'_>) -> PResult<'_, Expr> {
    let (input, _) = utils::ws0(input)?;
    let (input, _) = char('(')(input)?;
    let (input, inner) = expr(input)?;
    let (input, _) = utils::ws0(input)?;
    let (input, _) = context("')'", char(')')).parse(input)?;
    Ok((input, inner))
}

/// Parses either an identifier or a function call expression.
fn parse_ident_or_call(input: Input<'_>) -> PResult<'_, Expr> {
    let (input, _) = utils::ws0(input)?;
    let start = input;
    let (input, name) = utils::identifier(input)?;
    if KEYWORDS.contains(&name.as_str()) {
        return Err(nom::Err::Error(VerboseError {
            errors: vec![(start, VerboseErrorKind::Context("expression"))],
        }));
    }
    let (input, args) = opt(call_args).parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    // A name followed by `(...)` is parsed as a call, otherwise a name.
    let kind = match args {
        Some(args) => ExprKind::Call { name, args },
        None => ExprKind::Name(name),
    };
    Ok((input, Expr { kind, span }))
}

fn call_args(input: Input<'_>) -> PResult<'_, Vec<Expr>> {
    let (input, _) = utils::ws0(input)?;
    let (input, _) = char('(')(input)?;
    let (input, args) = separated_list0(utils::ws_char(','), expr).parse(input)?;
    let (input, _) = utils::ws0(input)?;
    let (input, _) = context("')'", char(')')).parse(input)?;
    Ok((input, args))
}
