//! Source location tracking

use serde::{Deserialize, Serialize};

/// A span in the source code, with the 1-based line it starts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32) -> Self {
        Self { start, end, line }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// A value with source location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

/// Byte offset to line number lookup for one source text
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the first character of every line
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { line_starts }
    }

    /// 1-based line containing `offset`
    pub fn line_of(&self, offset: usize) -> u32 {
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (idx + 1) as u32
    }

    /// Build a span from two byte offsets
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(start, end, self.line_of(start))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_new() {
        let span = Span::new(10, 20, 3);
        assert_eq!(span.start, 10);
        assert_eq!(span.end, 20);
        assert_eq!(span.line, 3);
    }

    #[test]
    fn test_span_merge_non_overlapping() {
        let a = Span::new(0, 5, 1);
        let b = Span::new(10, 15, 2);
        let merged = a.merge(b);
        assert_eq!(merged, Span::new(0, 15, 1));
    }

    #[test]
    fn test_span_merge_reversed_order() {
        let a = Span::new(10, 20, 4);
        let b = Span::new(0, 5, 1);
        assert_eq!(a.merge(b), Span::new(0, 20, 1));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(format!("{}", Span::new(42, 99, 1)), "42..99");
    }

    #[test]
    fn test_span_to_range() {
        let range: std::ops::Range<usize> = Span::new(5, 15, 1).into();
        assert_eq!(range, 5..15);
    }

    #[test]
    fn test_spanned_map() {
        let s = Spanned::new(10, Span::new(0, 5, 1));
        let mapped = s.map(|n| n * 2);
        assert_eq!(mapped.node, 20);
        assert_eq!(mapped.span, Span::new(0, 5, 1));
    }

    #[test]
    fn test_line_index_single_line() {
        let lines = LineIndex::new("var x = 1;");
        assert_eq!(lines.line_of(0), 1);
        assert_eq!(lines.line_of(9), 1);
        assert_eq!(lines.line_count(), 1);
    }

    #[test]
    fn test_line_index_multi_line() {
        let src = "a\nbc\n\nd";
        let lines = LineIndex::new(src);
        assert_eq!(lines.line_of(0), 1);
        // newline byte belongs to the line it ends
        assert_eq!(lines.line_of(1), 1);
        assert_eq!(lines.line_of(2), 2);
        assert_eq!(lines.line_of(3), 2);
        assert_eq!(lines.line_of(5), 3);
        assert_eq!(lines.line_of(6), 4);
        assert_eq!(lines.line_count(), 4);
    }

    #[test]
    fn test_line_index_span() {
        let lines = LineIndex::new("x\ny\n");
        assert_eq!(lines.span(2, 3), Span::new(2, 3, 2));
    }
}
