//! Byte-range edits applied to source text.
//!
//! [`SpliceEditor`] collects [`SpliceEdit`]s against one source string and
//! applies them together. Edits are applied in reverse position order so that
//! earlier byte ranges stay valid while later text changes length. Anything
//! outside the edited ranges is copied through unchanged.
//!
//! | Edit | Effect |
//! |------|--------|
//! | `Replace(range, text)` | `range.start..range.end` becomes `text` |
//! | `Delete(range)` | Equivalent to `Replace(range, "")` |
//! | `InsertAt(position, text)` | Zero-width range at `position` |
//!
//! # Example
//!
//! ```
//! use retemplate_core::splice::{ByteSpan, SpliceEdit, SpliceEditor};
//!
//! let source = "{{#old-modal}}{{/old-modal}}";
//! let mut editor = SpliceEditor::new(source);
//! editor.add(SpliceEdit::Replace {
//!     span: ByteSpan::new(0, source.len()),
//!     text: "{{new-modal}}".to_string(),
//! });
//! assert_eq!(editor.apply().unwrap(), "{{new-modal}}");
//! ```

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;
use tracing::trace;

/// A half-open byte range `[start, end)` in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteSpan {
    pub start: usize,
    pub end: usize,
}

impl ByteSpan {
    pub fn new(start: usize, end: usize) -> Self {
        ByteSpan { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for ByteSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A single edit against source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceEdit {
    /// Replace the content at `span` with `text`.
    Replace { span: ByteSpan, text: String },
    /// Remove the content at `span`.
    Delete { span: ByteSpan },
    /// Insert `text` at an absolute byte position.
    InsertAt { position: usize, text: String },
}

impl SpliceEdit {
    /// The range this edit consumes. Zero-width for insertions.
    pub fn span(&self) -> ByteSpan {
        match self {
            SpliceEdit::Replace { span, .. } | SpliceEdit::Delete { span } => *span,
            SpliceEdit::InsertAt { position, .. } => ByteSpan::new(*position, *position),
        }
    }

    fn text(&self) -> &str {
        match self {
            SpliceEdit::Replace { text, .. } | SpliceEdit::InsertAt { text, .. } => text,
            SpliceEdit::Delete { .. } => "",
        }
    }

    fn is_insertion(&self) -> bool {
        matches!(self, SpliceEdit::InsertAt { .. })
    }
}

/// Errors from applying splice edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    /// Two edits consume overlapping ranges.
    #[error("overlapping edits: {first} and {second}")]
    OverlappingEdits { first: ByteSpan, second: ByteSpan },

    /// An edit range is inverted or extends beyond the source.
    #[error("span {span} is out of bounds for source of length {source_len}")]
    OutOfBounds { span: ByteSpan, source_len: usize },

    /// An edit boundary falls inside a multi-byte character.
    #[error("byte offset {offset} is not a character boundary")]
    NotCharBoundary { offset: usize },

    /// No edits to apply.
    #[error("no edits to apply")]
    EmptyEdits,
}

/// Collects edits against one source string and applies them atomically.
pub struct SpliceEditor<'src> {
    source: &'src str,
    edits: Vec<SpliceEdit>,
}

impl<'src> SpliceEditor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    pub fn add(&mut self, edit: SpliceEdit) {
        self.edits.push(edit);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Check every edit against the source without applying anything.
    pub fn validate(&self) -> Result<(), SpliceError> {
        if self.edits.is_empty() {
            return Err(SpliceError::EmptyEdits);
        }

        let source_len = self.source.len();
        for edit in &self.edits {
            let span = edit.span();
            if span.start > span.end || span.end > source_len {
                return Err(SpliceError::OutOfBounds { span, source_len });
            }
            for offset in [span.start, span.end] {
                if !self.source.is_char_boundary(offset) {
                    return Err(SpliceError::NotCharBoundary { offset });
                }
            }
        }

        let sorted = sorted_descending(self.edits.clone());
        for pair in sorted.windows(2) {
            let (later, earlier) = (pair[0].span(), pair[1].span());
            // Adjacent edits are fine; an insertion may sit on either boundary.
            if earlier.end > later.start {
                return Err(SpliceError::OverlappingEdits {
                    first: earlier,
                    second: later,
                });
            }
        }

        Ok(())
    }

    /// Apply all queued edits and return the transformed source.
    ///
    /// # Errors
    ///
    /// - `SpliceError::EmptyEdits` if nothing was queued
    /// - `SpliceError::OutOfBounds` / `NotCharBoundary` for invalid ranges
    /// - `SpliceError::OverlappingEdits` if two ranges overlap
    pub fn apply(self) -> Result<String, SpliceError> {
        self.validate()?;

        let mut result = self.source.to_string();
        for edit in sorted_descending(self.edits) {
            let span = edit.span();
            trace!(%span, len = edit.text().len(), "splice");
            result.replace_range(span.start..span.end, edit.text());
        }
        Ok(result)
    }
}

/// Sort by position, last first. At equal positions consuming edits run
/// before insertions so the insertion lands at the original position.
fn sorted_descending(mut edits: Vec<SpliceEdit>) -> Vec<SpliceEdit> {
    edits.sort_by(|a, b| match b.span().start.cmp(&a.span().start) {
        Ordering::Equal => match (a.is_insertion(), b.is_insertion()) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            _ => Ordering::Equal,
        },
        other => other,
    });
    edits
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(start: usize, end: usize, text: &str) -> SpliceEdit {
        SpliceEdit::Replace {
            span: ByteSpan::new(start, end),
            text: text.to_string(),
        }
    }

    #[test]
    fn single_replace() {
        let mut editor = SpliceEditor::new("{{foo}} tail");
        editor.add(replace(2, 5, "barbaz"));
        assert_eq!(editor.apply().unwrap(), "{{barbaz}} tail");
    }

    #[test]
    fn multiple_edits_any_order() {
        let source = "a {{x}} b {{y}} c";
        let mut editor = SpliceEditor::new(source);
        editor.add(replace(2, 7, "X"));
        editor.add(SpliceEdit::Delete {
            span: ByteSpan::new(15, 17),
        });
        editor.add(replace(10, 15, "Y"));
        assert_eq!(editor.len(), 3);
        assert_eq!(editor.apply().unwrap(), "a X b Y");
    }

    #[test]
    fn insert_at_edit_boundary() {
        let mut editor = SpliceEditor::new("abcdef");
        editor.add(replace(2, 4, "XY"));
        editor.add(SpliceEdit::InsertAt {
            position: 2,
            text: "<".to_string(),
        });
        assert_eq!(editor.apply().unwrap(), "ab<XYef");
    }

    #[test]
    fn adjacent_edits_allowed() {
        let mut editor = SpliceEditor::new("abcdef");
        editor.add(replace(0, 3, "1"));
        editor.add(replace(3, 6, "2"));
        assert_eq!(editor.apply().unwrap(), "12");
    }

    #[test]
    fn overlap_rejected() {
        let mut editor = SpliceEditor::new("abcdef");
        editor.add(replace(0, 4, "1"));
        editor.add(replace(3, 6, "2"));
        assert!(matches!(
            editor.apply(),
            Err(SpliceError::OverlappingEdits { .. })
        ));
    }

    #[test]
    fn out_of_bounds_rejected() {
        let mut editor = SpliceEditor::new("short");
        editor.add(replace(2, 50, ""));
        assert_eq!(
            editor.apply(),
            Err(SpliceError::OutOfBounds {
                span: ByteSpan::new(2, 50),
                source_len: 5
            })
        );
    }

    #[test]
    fn char_boundary_rejected() {
        let mut editor = SpliceEditor::new("é");
        editor.add(replace(1, 2, ""));
        assert_eq!(
            editor.apply(),
            Err(SpliceError::NotCharBoundary { offset: 1 })
        );
    }

    #[test]
    fn empty_rejected() {
        let editor = SpliceEditor::new("abc");
        assert!(editor.is_empty());
        assert_eq!(editor.apply(), Err(SpliceError::EmptyEdits));
    }

    #[test]
    fn text_outside_edit_untouched() {
        let source = "<p>\u{a0}</p>{{#m}}{{/m}}<b>after</b>";
        let start = source.find("{{#m}}").unwrap();
        let end = start + "{{#m}}{{/m}}".len();
        let mut editor = SpliceEditor::new(source);
        editor.add(replace(start, end, "{{m}}"));
        let result = editor.apply().unwrap();
        assert!(result.starts_with(&source[..start]));
        assert!(result.ends_with(&source[end..]));
    }
}
