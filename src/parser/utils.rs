//! Parser trivia and lexical helpers.

use nom::Parser;
use nom::{
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{map, not, recognize, value},
    sequence::{delimited, pair, terminated},
};

use super::PResult;
use crate::span::{Input, SourceSpan};

/// Skips zero-or-more whitespace, including newlines.
pub(super) fn ws0(input: Input<'_>) -> PResult<'_, ()> {
    value((), multispace0).parse(input)
}

/// Wraps a parser with leading/trailing whitespace skipping.
pub(super) fn ws<'a, O, P>(mut parser: P) -> impl FnMut(Input<'a>) -> PResult<'a, O>
where
    P: FnMut(Input<'a>) -> PResult<'a, O>,
{
    // This helper keeps grammar rules free from manual trivia handling.
    move |input| delimited(ws0, &mut parser, ws0)(input)
}

/// Parses a specific character token with surrounding whitespace.
pub(super) fn ws_char<'a>(c: char) -> impl FnMut(Input<'a>) -> PResult<'a, char> {
    ws(char(c))
}

/// Parses identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
pub(super) fn identifier(input: Input<'_>) -> PResult<'_, String> {
    map(
        recognize(pair(
            take_while1(is_ident_start),
            take_while(is_ident_continue),
        )),
        |s: Input<'_>| s.fragment().to_string(),
    )
    .parse(input)
}

/// Returns whether a char can start an identifier.
pub(super) fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Returns whether a char can continue an identifier.
pub(super) fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Parses a bare keyword, rejecting identifiers that merely start with it.
pub(super) fn keyword<'a>(kw: &'static str) -> impl FnMut(Input<'a>) -> PResult<'a, Input<'a>> {
    move |input| terminated(tag(kw), not(satisfy(is_ident_continue))).parse(input)
}

/// Parses a keyword operator and returns the span of the keyword itself,
/// excluding surrounding whitespace.
pub(super) fn op_keyword<'a>(kw: &'static str) -> impl FnMut(Input<'a>) -> PResult<'a, SourceSpan> {
    move |input| {
        let (input, _) = ws0(input)?;
        let start = input;
        let (input, _) = keyword(kw)(input)?;
        Ok((input, SourceSpan::from_bounds(start, input)))
    }
}

/// Parses a symbolic operator token and returns the span of the token
/// itself, excluding surrounding whitespace.
pub(super) fn op_token<'a>(t: &'static str) -> impl FnMut(Input<'a>) -> PResult<'a, SourceSpan> {
    move |input| {
        let (input, _) = ws0(input)?;
        let start = input;
        let (input, _) = tag(t)(input)?;
        Ok((input, SourceSpan::from_bounds(start, input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_accepts_underscores() {
        let (_, name) = identifier(Input::new("_user_1 rest")).unwrap();
        assert_eq!(name, "_user_1");
    }

    #[test]
    fn test_keyword_requires_boundary() {
        assert!(keyword("in")(Input::new("in x")).is_ok());
        assert!(keyword("in")(Input::new("index")).is_err());
    }

    #[test]
    fn test_op_token_span_excludes_whitespace() {
        let (_, span) = op_token("==")(Input::new("  == rest")).unwrap();
        assert_eq!(span.start, 2);
        assert_eq!(span.end, 4);
        assert_eq!(span.column, 3);
    }
}
