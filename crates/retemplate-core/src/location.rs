//! Source positions, spans and offsets.
//!
//! Every template node carries a [`SourceSpan`] assigned at parse time. Rewrites
//! that add or remove text keep downstream spans accurate by computing an
//! [`Offset`] with [`offset_for`] and shifting every affected span with
//! [`Offset::shift`].
//!
//! ## Coordinate Conventions
//!
//! - Lines are **1-indexed**
//! - Columns are **0-indexed** and count Unicode scalar values
//! - Line 0 marks a synthetic span: a node created by a rewrite that has no
//!   place in the source text

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from span arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// A covering span was requested for a collection with no positioned nodes.
    #[error("cannot compute a span for an empty set of nodes")]
    EmptyInput,
}

// ============================================================================
// Position
// ============================================================================

/// A line/column position in template source.
///
/// Ordering is line-major, then column-minor.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// True for positions that belong to synthetic spans.
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// The position reached after writing `text` starting at `self`.
    pub fn advance(&self, text: &str) -> Position {
        let mut pos = *self;
        for ch in text.chars() {
            if ch == '\n' {
                pos.line += 1;
                pos.column = 0;
            } else {
                pos.column += 1;
            }
        }
        pos
    }

    /// Same line, `delta` columns to the left. Clamps at column 0.
    pub fn back(&self, delta: u32) -> Position {
        Position::new(self.line, self.column.saturating_sub(delta))
    }

    /// Same line, `delta` columns to the right.
    pub fn forward(&self, delta: u32) -> Position {
        Position::new(self.line, self.column + delta)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ============================================================================
// SourceSpan
// ============================================================================

/// A start/end pair of positions. Invariant: `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: Position,
    pub end: Position,
}

impl SourceSpan {
    /// The span given to nodes created by rewrites.
    pub const SYNTHETIC: SourceSpan = SourceSpan {
        start: Position::new(0, 0),
        end: Position::new(0, 0),
    };

    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start <= end, "span start {} after end {}", start, end);
        SourceSpan { start, end }
    }

    /// A zero-width span at `pos`.
    pub fn point(pos: Position) -> Self {
        SourceSpan {
            start: pos,
            end: pos,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.start.is_synthetic()
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `other` lies entirely within `self`.
    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The minimal span covering every positioned span in `spans`.
    ///
    /// Synthetic spans are ignored.
    ///
    /// # Errors
    ///
    /// `LocationError::EmptyInput` when no positioned span was supplied.
    pub fn covering<I>(spans: I) -> Result<SourceSpan, LocationError>
    where
        I: IntoIterator<Item = SourceSpan>,
    {
        spans
            .into_iter()
            .filter(|span| !span.is_synthetic())
            .reduce(|acc, span| SourceSpan {
                start: acc.start.min(span.start),
                end: acc.end.max(span.end),
            })
            .ok_or(LocationError::EmptyInput)
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        SourceSpan::SYNTHETIC
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            write!(f, "<synthetic>")
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

// ============================================================================
// Offset
// ============================================================================

/// A line-scoped delta describing how positions after an edit move.
///
/// Positions on the anchor line (the line the edit ended on) receive both the
/// line and the column delta. Positions on later lines only receive the line
/// delta, since their column is measured from a line start the edit did not
/// touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub lines: i64,
    pub columns: i64,
    pub anchor: Position,
}

impl Offset {
    pub fn is_zero(&self) -> bool {
        self.lines == 0 && self.columns == 0
    }

    /// Move a single position. Synthetic positions never move.
    pub fn apply(&self, pos: Position) -> Position {
        if pos.is_synthetic() {
            return pos;
        }
        let line = shift(pos.line, self.lines).max(1);
        let column = if pos.line == self.anchor.line {
            shift(pos.column, self.columns)
        } else {
            pos.column
        };
        Position::new(line, column)
    }

    /// Shift a span for an edit that took effect at `starting_at`.
    ///
    /// A span starting at or after `starting_at` moves as a whole. A span that
    /// starts before it but ends after it encloses the edit, so only its end
    /// moves.
    pub fn shift(&self, span: SourceSpan, starting_at: Position) -> SourceSpan {
        if span.is_synthetic() {
            span
        } else if span.start >= starting_at {
            SourceSpan {
                start: self.apply(span.start),
                end: self.apply(span.end),
            }
        } else if span.end > starting_at {
            SourceSpan {
                start: span.start,
                end: self.apply(span.end).max(span.start),
            }
        } else {
            span
        }
    }
}

fn shift(value: u32, delta: i64) -> u32 {
    (i64::from(value) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

/// The offset for nodes after `removed.end` when `removed` is replaced by
/// text occupying `inserted`.
///
/// Both spans are expected to start at the same position.
pub fn offset_for(removed: SourceSpan, inserted: SourceSpan) -> Offset {
    let removed_lines = i64::from(removed.end.line) - i64::from(removed.start.line);
    let inserted_lines = i64::from(inserted.end.line) - i64::from(inserted.start.line);
    Offset {
        lines: inserted_lines - removed_lines,
        columns: i64::from(inserted.end.column) - i64::from(removed.end.column),
        anchor: removed.end,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn span(sl: u32, sc: u32, el: u32, ec: u32) -> SourceSpan {
        SourceSpan::new(Position::new(sl, sc), Position::new(el, ec))
    }

    mod position_tests {
        use super::*;

        #[test]
        fn ordering_is_line_major() {
            assert!(Position::new(1, 40) < Position::new(2, 0));
            assert!(Position::new(2, 3) < Position::new(2, 4));
            assert_eq!(
                Position::new(3, 1).max(Position::new(2, 9)),
                Position::new(3, 1)
            );
        }

        #[test]
        fn advance_over_text() {
            let start = Position::new(2, 4);
            assert_eq!(start.advance("abc"), Position::new(2, 7));
            assert_eq!(start.advance("ab\ncd"), Position::new(3, 2));
            assert_eq!(start.advance("\n"), Position::new(3, 0));
            assert_eq!(start.advance("é"), Position::new(2, 5));
        }
    }

    mod covering_tests {
        use super::*;

        #[test]
        fn covers_all_spans() {
            let spans = vec![span(2, 4, 2, 10), span(1, 8, 1, 12), span(2, 0, 3, 1)];
            assert_eq!(SourceSpan::covering(spans), Ok(span(1, 8, 3, 1)));
        }

        #[test]
        fn single_span() {
            let only = span(4, 2, 4, 9);
            assert_eq!(SourceSpan::covering([only]), Ok(only));
        }

        #[test]
        fn empty_input_fails() {
            assert_eq!(
                SourceSpan::covering(Vec::new()),
                Err(LocationError::EmptyInput)
            );
        }

        #[test]
        fn synthetic_spans_ignored() {
            let real = span(1, 0, 1, 4);
            assert_eq!(
                SourceSpan::covering([SourceSpan::SYNTHETIC, real]),
                Ok(real)
            );
            assert_eq!(
                SourceSpan::covering([SourceSpan::SYNTHETIC]),
                Err(LocationError::EmptyInput)
            );
        }

        #[test]
        fn matches_modifier_layout() {
            // `  <h1 {{bind-attr foo=bar baz=foo}}>` on line 2
            let modifier = span(2, 6, 2, 35);
            assert_eq!(SourceSpan::covering([modifier]), Ok(modifier));
            assert!(span(2, 0, 2, 41).contains(&modifier));
            assert!(!modifier.contains(&span(2, 0, 2, 41)));
        }
    }

    mod offset_tests {
        use super::*;

        #[test]
        fn same_line_removal() {
            // `{{#each person in people}}`: drop "person in " (cols 8..18)
            let removed = span(1, 8, 1, 18);
            let inserted = SourceSpan::point(Position::new(1, 8));
            let offset = offset_for(removed, inserted);
            assert_eq!(offset.lines, 0);
            assert_eq!(offset.columns, -10);
            assert_eq!(offset.apply(Position::new(1, 18)), Position::new(1, 8));
            assert_eq!(offset.apply(Position::new(2, 5)), Position::new(2, 5));
        }

        #[test]
        fn removal_spanning_lines() {
            let removed = span(1, 8, 2, 6);
            let inserted = SourceSpan::point(Position::new(1, 8));
            let offset = offset_for(removed, inserted);
            assert_eq!(offset.lines, -1);
            assert_eq!(offset.columns, 2);
            // Same line as the edit end: both deltas
            assert_eq!(offset.apply(Position::new(2, 6)), Position::new(1, 8));
            // Later lines: line delta only
            assert_eq!(offset.apply(Position::new(4, 3)), Position::new(3, 3));
        }

        #[test]
        fn insertion_adding_lines() {
            let removed = span(1, 5, 1, 9);
            let inserted = span(1, 5, 3, 2);
            let offset = offset_for(removed, inserted);
            assert_eq!(offset.lines, 2);
            assert_eq!(offset.columns, -7);
            assert_eq!(offset.apply(Position::new(1, 12)), Position::new(3, 5));
            assert_eq!(offset.apply(Position::new(2, 0)), Position::new(4, 0));
        }

        #[test]
        fn synthetic_never_moves() {
            let offset = offset_for(span(1, 0, 1, 10), SourceSpan::point(Position::new(1, 0)));
            assert_eq!(
                offset.shift(SourceSpan::SYNTHETIC, Position::new(1, 0)),
                SourceSpan::SYNTHETIC
            );
        }

        #[test]
        fn shift_rules() {
            let offset = offset_for(span(1, 8, 1, 18), SourceSpan::point(Position::new(1, 8)));
            let at = Position::new(1, 8);
            // after the edit point: whole span moves
            assert_eq!(offset.shift(span(1, 18, 1, 24), at), span(1, 8, 1, 14));
            // encloses the edit point: only the end moves
            assert_eq!(offset.shift(span(1, 0, 1, 36), at), span(1, 0, 1, 26));
            // entirely before: untouched
            assert_eq!(offset.shift(span(1, 3, 1, 7), at), span(1, 3, 1, 7));
            // ends exactly at the edit point: untouched
            assert_eq!(offset.shift(span(1, 3, 1, 8), at), span(1, 3, 1, 8));
        }

        #[test]
        fn zero_offset() {
            let offset = offset_for(span(1, 2, 1, 4), span(1, 2, 1, 4));
            assert!(offset.is_zero());
            assert_eq!(offset.apply(Position::new(1, 9)), Position::new(1, 9));
        }

        #[test]
        fn serializes_as_json() {
            let offset = offset_for(span(1, 2, 1, 4), span(1, 2, 1, 6));
            let json = serde_json::to_value(offset).unwrap();
            assert_eq!(json["columns"], 2);
            assert_eq!(json["anchor"]["line"], 1);
        }
    }
}
