//! Source location tracking for diagnostics.
//!
//! Provides [`Span`] to track where tokens, nodes and errors occur.

use std::fmt;

/// A span of source code, represented by its starting position.
///
/// Spans order by line, then column. Sorted diagnostics and unused-local
/// reports at block close follow that ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span is empty (zero length).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The length of this span in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Merge two spans into one that starts at the earlier span and covers both.
    ///
    /// Spans on different lines keep the earlier position and sum the lengths.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        let (first, second) = if other < self { (other, self) } else { (self, other) };
        if first.line == second.line {
            let end_col = (second.col + second.len).max(first.col + first.len);
            Span {
                line: first.line,
                col: first.col,
                len: end_col - first.col,
            }
        } else {
            Span {
                line: first.line,
                col: first.col,
                len: first.len + second.len,
            }
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let span = Span::new(1, 5, 10);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(Span::point(1, 5).is_empty());
    }

    #[test]
    fn span_display() {
        assert_eq!(format!("{}", Span::new(3, 15, 5)), "3:15");
    }

    #[test]
    fn spans_order_by_position() {
        assert!(Span::new(1, 9, 1) < Span::new(2, 1, 1));
        assert!(Span::new(4, 2, 7) < Span::new(4, 3, 1));
    }

    #[test]
    fn span_merge_same_line_reverse_order() {
        let merged = Span::new(1, 10, 3).merge(Span::new(1, 5, 3));
        assert_eq!(merged.col, 5);
        assert_eq!(merged.len, 8);
    }

    #[test]
    fn span_merge_different_lines() {
        let merged = Span::new(3, 10, 5).merge(Span::new(1, 5, 10));
        assert_eq!(merged.line, 1);
        assert_eq!(merged.col, 5);
        assert_eq!(merged.len, 15);
    }
}
