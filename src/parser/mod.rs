//! `nom` parser for the assertion expression language.
//!
//! The grammar supports:
//! - numeric, string, boolean and `none` literals
//! - identifiers, attribute access (`a.b`) and indexing (`a[0]`)
//! - function calls, including the reserved capture mark `that(...)`
//! - list literals (`[a, b, c]`)
//! - unary `-` and `not`
//! - binary `+ - * / %`
//! - comparison chains (`a < b <= c`) with `in` / `not in`
//! - short-circuit `and` / `or`
//!
//! Expressions may span multiple lines; every node carries a
//! [`SourceSpan`](crate::span::SourceSpan) so diagnostics can point back
//! into the text the user wrote.

mod expr;
mod utils;

use nom::{
    combinator::all_consuming,
    error::{VerboseError, VerboseErrorKind},
    sequence::delimited,
    Parser,
};

use crate::ast::Expr;
use crate::error::ParseError;
use crate::span::Input;

pub(crate) type PResult<'a, O> = nom::IResult<Input<'a>, O, VerboseError<Input<'a>>>;

/// Parses expression text into a spanned tree.
pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    let input = Input::new(text);
    // `all_consuming` ensures trailing garbage is treated as a syntax error.
    match all_consuming(delimited(utils::ws0, expr::expr, utils::ws0)).parse(input) {
        Ok((_, parsed)) => Ok(parsed),
        Err(err) => Err(to_parse_error(err)),
    }
}

/// Converts a `nom` verbose error to the crate-level parse error.
fn to_parse_error(err: nom::Err<VerboseError<Input<'_>>>) -> ParseError {
    match err {
        nom::Err::Incomplete(_) => ParseError {
            message: "incomplete input".into(),
            line: 1,
            column: 1,
        },
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            // The most recently recorded entry carries the outermost context.
            if let Some((span, kind)) = e.errors.last() {
                let message = match kind {
                    VerboseErrorKind::Context(ctx) => format!("expected {ctx}"),
                    VerboseErrorKind::Char(c) => format!("expected '{c}'"),
                    VerboseErrorKind::Nom(kind) => format!("unexpected input near {kind:?}"),
                };
                ParseError {
                    message,
                    line: span.location_line() as usize,
                    column: span.get_utf8_column(),
                }
            } else {
                ParseError {
                    message: "syntax error".into(),
                    line: 1,
                    column: 1,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, BoolOp, CmpOp, ExprKind, UnaryOp};
    use crate::value::Value;

    #[test]
    fn test_parse_literals() {
        let e = parse_expression("42").unwrap();
        assert_eq!(e.kind, ExprKind::Literal(Value::Int(42)));
        let e = parse_expression("2.5").unwrap();
        assert_eq!(e.kind, ExprKind::Literal(Value::Float(2.5)));
        let e = parse_expression("true").unwrap();
        assert_eq!(e.kind, ExprKind::Literal(Value::Bool(true)));
        let e = parse_expression("none").unwrap();
        assert_eq!(e.kind, ExprKind::Literal(Value::None));
        let e = parse_expression("'a\\nb'").unwrap();
        assert_eq!(e.kind, ExprKind::Literal(Value::Str("a\nb".into())));
    }

    #[test]
    fn test_parse_precedence() {
        // a + b * c parses as a + (b * c)
        let e = parse_expression("a + b * c").unwrap();
        match e.kind {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary {
                        op: BinOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_parse_comparison_chain() {
        let e = parse_expression("a < b <= c").unwrap();
        match e.kind {
            ExprKind::Compare { rest, .. } => {
                assert_eq!(rest.len(), 2);
                assert_eq!(rest[0].0, CmpOp::Lt);
                assert_eq!(rest[1].0, CmpOp::Le);
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_parse_bool_chain_and_spans() {
        let e = parse_expression("a and b and c").unwrap();
        match e.kind {
            ExprKind::Bool {
                op,
                op_spans,
                operands,
            } => {
                assert_eq!(op, BoolOp::And);
                assert_eq!(operands.len(), 3);
                assert_eq!(op_spans.len(), 2);
                assert_eq!(op_spans[0].start, 2);
                assert_eq!(op_spans[1].start, 8);
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_parse_not_in() {
        let e = parse_expression("x not in items").unwrap();
        match e.kind {
            ExprKind::Compare { rest, .. } => {
                assert_eq!(rest[0].0, CmpOp::NotIn);
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unary_not() {
        let e = parse_expression("not a").unwrap();
        assert!(matches!(
            e.kind,
            ExprKind::Unary {
                op: UnaryOp::Not,
                ..
            }
        ));
        assert_eq!(e.span.start, 0);
    }

    #[test]
    fn test_parse_postfix_chain() {
        let e = parse_expression("user.name[0]").unwrap();
        match e.kind {
            ExprKind::Index { base, .. } => {
                assert!(matches!(base.kind, ExprKind::Attribute { .. }));
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_parse_call_with_args() {
        let e = parse_expression("that(read(path))").unwrap();
        match e.kind {
            ExprKind::Call { name, args } => {
                assert_eq!(name, "that");
                assert_eq!(args.len(), 1);
                assert!(matches!(&args[0].kind, ExprKind::Call { name, .. } if name == "read"));
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_parse_list() {
        let e = parse_expression("[1, 2, 3]").unwrap();
        match e.kind {
            ExprKind::List(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_parse_multiline_tracks_lines() {
        let e = parse_expression("a ==\n  b").unwrap();
        match e.kind {
            ExprKind::Compare { rest, .. } => {
                assert_eq!(rest[0].2.span.line, 2);
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_parenthesized_collapses_to_inner_span() {
        let e = parse_expression("(a + b)").unwrap();
        assert_eq!(e.span.start, 1);
        assert_eq!(e.span.end, 6);
        assert!(matches!(e.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        assert!(parse_expression("true == 1").is_ok());
        assert!(parse_expression("and").is_err());
    }

    #[test]
    fn test_trailing_garbage_is_an_error() {
        let err = parse_expression("a == b extra!").unwrap_err();
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        assert!(parse_expression("'open").is_err());
    }

    #[test]
    fn test_operator_span_positions() {
        let e = parse_expression("1 == 2").unwrap();
        match e.kind {
            ExprKind::Compare { rest, .. } => {
                assert_eq!(rest[0].1.start, 2);
                assert_eq!(rest[0].1.end, 4);
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }
}
