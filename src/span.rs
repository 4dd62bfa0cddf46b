//! Source spans for expression text.

use nom_locate::LocatedSpan;

/// Parser input span type carrying byte offsets and line/column info.
pub type Input<'a> = LocatedSpan<&'a str>;

/// Source range and anchor position within the expression text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based UTF-8 column.
    pub column: usize,
}

impl SourceSpan {
    /// Creates a source span from parser start/end positions.
    pub fn from_bounds(start: Input<'_>, end: Input<'_>) -> Self {
        Self {
            start: start.location_offset(),
            end: end.location_offset(),
            line: start.location_line() as usize,
            column: start.get_utf8_column(),
        }
    }

    /// Returns span length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns whether the span is empty.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns a span that starts at `self` and ends at `other`.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_anchor() {
        let a = SourceSpan {
            start: 0,
            end: 1,
            line: 1,
            column: 1,
        };
        let b = SourceSpan {
            start: 4,
            end: 5,
            line: 1,
            column: 5,
        };
        let merged = a.merge(&b);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 5);
        assert_eq!(merged.column, 1);
    }

    #[test]
    fn test_len() {
        let span = SourceSpan {
            start: 2,
            end: 7,
            line: 1,
            column: 3,
        };
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
    }
}
