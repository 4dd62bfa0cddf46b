//! Recovery of the failing assert statement from source text.
//!
//! The failure point comes from `#[track_caller]`. From there this module
//! reads the source file, scans up to the `assert!` head, balances
//! delimiters down to the end of the statement, extracts the expression
//! literal together with a byte-offset table back into source columns,
//! and renders the windowed listing. Every failure here is
//! [`Error::LocationUnavailable`]; the report degrades to a value-only
//! layout instead of masking the assertion.

use std::fs;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Error;

/// Call site of the failed assertion, captured by `#[track_caller]`.
#[derive(Debug, Clone)]
pub(crate) struct FailurePoint {
    pub(crate) file: PathBuf,
    pub(crate) line: usize,
}

impl FailurePoint {
    #[track_caller]
    pub(crate) fn here() -> Self {
        let location = Location::caller();
        Self {
            file: PathBuf::from(location.file()),
            line: location.line() as usize,
        }
    }
}

/// Position of an expression byte within the recovered statement:
/// statement line index plus character column in that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextPos {
    pub(crate) line_index: usize,
    pub(crate) column: usize,
}

/// The recovered statement and its surroundings.
#[derive(Debug)]
pub(crate) struct SourceContext {
    pub(crate) file: PathBuf,
    /// First line of the statement, 1-based.
    pub(crate) line: usize,
    /// The statement lines exactly as they appear in the file.
    pub(crate) statement: Vec<String>,
    pub(crate) scope_name: String,
    /// Numbered source listing around the statement, failing line
    /// marked with `|>`.
    pub(crate) window: String,
    offsets: Option<Vec<TextPos>>,
}

impl SourceContext {
    /// Maps a byte offset in the expression text to its source position.
    /// `None` when the literal could not be matched back to the text.
    pub(crate) fn position_of(&self, byte: usize) -> Option<TextPos> {
        self.offsets.as_ref().and_then(|table| table.get(byte).copied())
    }

    /// Whether the extracted literal decoded to the evaluated text.
    pub(crate) fn has_mapping(&self) -> bool {
        self.offsets.is_some()
    }
}

/// Recovers the assert statement enclosing the failure point.
///
/// `expression` is the text that was evaluated; the extracted literal
/// must decode to exactly this text, otherwise the offset table is
/// dropped and carets fall back to the expression's own lines.
pub(crate) fn resolve(point: &FailurePoint, expression: &str) -> Result<SourceContext, Error> {
    let source = fs::read_to_string(&point.file).map_err(|err| {
        Error::LocationUnavailable(format!("cannot read '{}': {err}", point.file.display()))
    })?;
    let lines: Vec<&str> = source.lines().collect();
    if point.line == 0 || point.line > lines.len() {
        return Err(Error::LocationUnavailable(format!(
            "line {} is outside '{}'",
            point.line,
            point.file.display()
        )));
    }

    let (head, paren) = find_statement_head(&lines, point.line)?;
    let last = find_statement_end(&lines, head, paren)?;
    let statement: Vec<String> = lines[head - 1..last].iter().map(|l| l.to_string()).collect();

    let offsets = extract_expression(&statement, paren)
        .and_then(|(text, table)| (text == expression).then_some(table));

    Ok(SourceContext {
        file: point.file.clone(),
        line: head,
        scope_name: find_scope_name(&lines, head),
        window: code_window(&lines, head),
        statement,
        offsets,
    })
}

fn assert_head() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\w!])(?:debug_)?assert!\s*\(")
            .expect("assert head pattern should be valid")
    })
}

fn fn_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^\s*(?:pub\s*(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+([A-Za-z_][A-Za-z0-9_]*)"#,
        )
        .expect("fn item pattern should be valid")
    })
}

/// Scans upward from the failure line for the `assert!` head. Returns
/// the 1-based line number and the byte index of the opening paren.
fn find_statement_head(lines: &[&str], from: usize) -> Result<(usize, usize), Error> {
    for n in (1..=from).rev() {
        if let Some(found) = assert_head().find(lines[n - 1]) {
            return Ok((n, found.end() - 1));
        }
    }
    Err(Error::LocationUnavailable(format!(
        "no assert statement found at or above line {from}"
    )))
}

/// Balances delimiters from the opening paren down to the line where
/// the statement closes. String and char literals and comments are
/// skipped so their brackets never count.
fn find_statement_end(lines: &[&str], head: usize, paren: usize) -> Result<usize, Error> {
    let mut scanner = Scanner::new();
    let mut start = paren;
    for n in head..=lines.len() {
        if scanner.scan_line(lines[n - 1], start) {
            return Ok(n);
        }
        start = 0;
    }
    Err(Error::LocationUnavailable(format!(
        "assert statement at line {head} never closes"
    )))
}

fn find_scope_name(lines: &[&str], head: usize) -> String {
    for n in (1..head).rev() {
        if let Some(caps) = fn_item().captures(lines[n - 1]) {
            return caps[1].to_string();
        }
    }
    "<unknown>".to_string()
}

/// Numbered listing of 8 lines before through 4 after the failing
/// line; stops early at end of file.
fn code_window(lines: &[&str], lineno: usize) -> String {
    let min_n = lineno.saturating_sub(8).max(1);
    let max_n = lineno + 4;
    let width = max_n.to_string().len();

    let mut out = String::new();
    for n in min_n..max_n {
        if n > lines.len() {
            break;
        }
        let mut line = format!("{n:>width$}|  {}\n", lines[n - 1]);
        if n == lineno {
            line = line.replacen("|  ", "|> ", 1);
        }
        out.push_str(&line);
    }
    out
}

#[derive(Clone, Copy)]
enum Mode {
    Code,
    Str { raw: Option<usize> },
    Comment { depth: usize },
}

/// Delimiter-balance scanner with enough Rust lexing to skip string,
/// raw-string and char literals and both comment forms. State carries
/// across lines.
struct Scanner {
    depth: i32,
    mode: Mode,
}

impl Scanner {
    fn new() -> Self {
        Self {
            depth: 0,
            mode: Mode::Code,
        }
    }

    /// Scans one line from `start`; true when the balance returned to
    /// zero on this line.
    fn scan_line(&mut self, text: &str, start: usize) -> bool {
        let bytes = text.as_bytes();
        let mut i = start;
        while i < bytes.len() {
            match self.mode {
                Mode::Code => match bytes[i] {
                    b'(' | b'[' | b'{' => self.depth += 1,
                    b')' | b']' | b'}' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            return true;
                        }
                    }
                    b'"' | b'r' | b'b' => {
                        if let Some((raw, after)) = literal_open(text, i) {
                            self.mode = Mode::Str { raw };
                            i = after;
                            continue;
                        }
                    }
                    b'\'' => {
                        if let Some(after) = char_literal_end(text, i) {
                            i = after;
                            continue;
                        }
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'/') => return false,
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        self.mode = Mode::Comment { depth: 1 };
                        i += 2;
                        continue;
                    }
                    _ => {}
                },
                Mode::Str { raw: None } => match bytes[i] {
                    b'\\' => {
                        i += 2;
                        continue;
                    }
                    b'"' => self.mode = Mode::Code,
                    _ => {}
                },
                Mode::Str { raw: Some(hashes) } => {
                    if bytes[i] == b'"' && closes_raw(bytes, i, hashes) {
                        self.mode = Mode::Code;
                        i += 1 + hashes;
                        continue;
                    }
                }
                Mode::Comment { depth } => {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        self.mode = if depth == 1 {
                            Mode::Code
                        } else {
                            Mode::Comment { depth: depth - 1 }
                        };
                        i += 2;
                        continue;
                    }
                    if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
                        self.mode = Mode::Comment { depth: depth + 1 };
                        i += 2;
                        continue;
                    }
                }
            }
            i += 1;
        }
        false
    }
}

/// Recognizes the opening of a string literal at `i`: plain, byte, raw
/// or raw-byte form. Returns the raw hash count (`None` for escaped
/// forms) and the byte index just past the opening quote.
fn literal_open(text: &str, i: usize) -> Option<(Option<usize>, usize)> {
    let bytes = text.as_bytes();
    if i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_') {
        return None;
    }
    let mut j = i;
    if bytes[j] == b'b' {
        j += 1;
    }
    let raw = bytes.get(j) == Some(&b'r');
    if raw {
        j += 1;
    }
    let mut hashes = 0;
    while raw && bytes.get(j) == Some(&b'#') {
        hashes += 1;
        j += 1;
    }
    if bytes.get(j) != Some(&b'"') {
        return None;
    }
    Some((raw.then_some(hashes), j + 1))
}

fn closes_raw(bytes: &[u8], i: usize, hashes: usize) -> bool {
    bytes.len() > i + hashes && bytes[i + 1..=i + hashes].iter().all(|b| *b == b'#')
}

/// Returns the byte index past a char literal starting at `i`, or
/// `None` when the quote is a lifetime.
fn char_literal_end(text: &str, i: usize) -> Option<usize> {
    let rest = &text[i + 1..];
    let mut chars = rest.char_indices();
    let (_, first) = chars.next()?;
    if first == '\\' {
        chars.next()?;
        for (off, c) in chars {
            if c == '\'' {
                return Some(i + 1 + off + 1);
            }
        }
        None
    } else {
        match chars.next() {
            Some((off, '\'')) => Some(i + 1 + off + 1),
            _ => None,
        }
    }
}

/// Finds the first string literal after the opening paren and decodes
/// it. The table maps every byte of the decoded text to its source
/// position; escape sequences map to the column of their backslash.
fn extract_expression(statement: &[String], start_col: usize) -> Option<(String, Vec<TextPos>)> {
    let mut col = start_col;
    for (line_index, line) in statement.iter().enumerate() {
        let bytes = line.as_bytes();
        let mut i = col;
        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'r' | b'b' => {
                    if let Some((raw, after)) = literal_open(line, i) {
                        return match raw {
                            Some(hashes) => decode_raw(statement, line_index, after, hashes),
                            None => decode_escaped(statement, line_index, after),
                        };
                    }
                }
                b'\'' => {
                    if let Some(after) = char_literal_end(line, i) {
                        i = after;
                        continue;
                    }
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => break,
                _ => {}
            }
            i += 1;
        }
        col = 0;
    }
    None
}

fn push_char(
    text: &mut String,
    table: &mut Vec<TextPos>,
    line: &str,
    line_index: usize,
    at: usize,
    c: char,
) {
    let column = line[..at].chars().count();
    for _ in 0..c.len_utf8() {
        table.push(TextPos { line_index, column });
    }
    text.push(c);
}

/// Decodes a plain (escaped) string literal whose content starts at
/// `start` on `statement[line_index]`.
fn decode_escaped(
    statement: &[String],
    mut line_index: usize,
    mut start: usize,
) -> Option<(String, Vec<TextPos>)> {
    let mut text = String::new();
    let mut table = Vec::new();
    let mut continuation = false;

    loop {
        let line = statement.get(line_index)?;
        if continuation {
            start = line.len() - line.trim_start().len();
            continuation = false;
        }
        let mut chars = line[start..].char_indices();
        let mut closed = false;
        let mut escaped_eol = false;

        while let Some((off, c)) = chars.next() {
            let at = start + off;
            match c {
                '"' => {
                    closed = true;
                    break;
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => push_char(&mut text, &mut table, line, line_index, at, '\n'),
                    Some((_, 't')) => push_char(&mut text, &mut table, line, line_index, at, '\t'),
                    Some((_, 'r')) => push_char(&mut text, &mut table, line, line_index, at, '\r'),
                    Some((_, '0')) => push_char(&mut text, &mut table, line, line_index, at, '\0'),
                    Some((_, '\\')) => push_char(&mut text, &mut table, line, line_index, at, '\\'),
                    Some((_, '"')) => push_char(&mut text, &mut table, line, line_index, at, '"'),
                    Some((_, '\'')) => push_char(&mut text, &mut table, line, line_index, at, '\''),
                    Some((_, 'u')) => {
                        let (_, open) = chars.next()?;
                        if open != '{' {
                            return None;
                        }
                        let mut hex = String::new();
                        loop {
                            let (_, h) = chars.next()?;
                            if h == '}' {
                                break;
                            }
                            hex.push(h);
                        }
                        let code = u32::from_str_radix(&hex, 16).ok()?;
                        push_char(&mut text, &mut table, line, line_index, at, char::from_u32(code)?);
                    }
                    Some((_, 'x')) => {
                        let (_, h1) = chars.next()?;
                        let (_, h2) = chars.next()?;
                        let code = u32::from_str_radix(&format!("{h1}{h2}"), 16).ok()?;
                        push_char(&mut text, &mut table, line, line_index, at, char::from_u32(code)?);
                    }
                    // Backslash at end of line: continuation, the next
                    // line's leading whitespace is skipped.
                    None => escaped_eol = true,
                    Some(_) => return None,
                },
                _ => push_char(&mut text, &mut table, line, line_index, at, c),
            }
        }

        if closed {
            return Some((text, table));
        }
        // The literal runs into the next source line. A plain newline is
        // part of the content; an escaped one is not.
        if escaped_eol {
            continuation = true;
        } else {
            let column = line.chars().count();
            table.push(TextPos { line_index, column });
            text.push('\n');
        }
        line_index += 1;
        start = 0;
    }
}

/// Decodes a raw string literal: no escapes, closed by a quote followed
/// by the opening's hash count.
fn decode_raw(
    statement: &[String],
    mut line_index: usize,
    mut start: usize,
    hashes: usize,
) -> Option<(String, Vec<TextPos>)> {
    let mut text = String::new();
    let mut table = Vec::new();

    loop {
        let line = statement.get(line_index)?;
        for (off, c) in line[start..].char_indices() {
            let at = start + off;
            if c == '"' && closes_raw(line.as_bytes(), at, hashes) {
                return Some((text, table));
            }
            push_char(&mut text, &mut table, line, line_index, at, c);
        }
        let column = line.chars().count();
        table.push(TextPos { line_index, column });
        text.push('\n');
        line_index += 1;
        start = 0;
    }
}
