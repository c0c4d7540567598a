//! Text position utilities for byte offset and line:column conversions.
//!
//! Template spans are expressed as [`Position`]s (1-indexed lines, 0-indexed
//! char columns). Splicing works on byte offsets. The functions here convert
//! between the two.
//!
//! ## Coordinate Conventions
//!
//! - Lines are **1-indexed**, columns are **0-indexed**
//! - Columns count Unicode scalar values, not bytes
//! - Byte offsets are **0-indexed**
//! - Out-of-range positions clamp to the end of the line or content

use std::ops::Range;

use crate::location::{Position, SourceSpan};

// ============================================================================
// Position Conversions
// ============================================================================

/// Convert a byte offset to a position.
///
/// If `offset` exceeds the content length, returns the position at the end of
/// the content.
pub fn offset_to_position(content: &str, offset: usize) -> Position {
    let mut line = 1u32;
    let mut column = 0u32;

    for (i, ch) in content.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }

    Position::new(line, column)
}

/// Convert a position to a byte offset.
///
/// A column beyond the end of its line clamps to the line end. A line beyond
/// the content returns the content length. Line 0 is treated as line 1.
pub fn position_to_offset(content: &str, pos: Position) -> usize {
    let Some(start) = line_start_offset(content, pos.line.max(1)) else {
        return content.len();
    };

    let line = &content[start..];
    let line_end = line.find('\n').unwrap_or(line.len());
    line[..line_end]
        .char_indices()
        .nth(pos.column as usize)
        .map(|(i, _)| start + i)
        .unwrap_or(start + line_end)
}

/// Convert a span to the byte range it covers.
pub fn span_to_range(content: &str, span: &SourceSpan) -> Range<usize> {
    let start = position_to_offset(content, span.start);
    let end = position_to_offset(content, span.end).max(start);
    start..end
}

/// Extract the text covered by a span.
///
/// Returns `None` for synthetic spans.
pub fn extract_span<'a>(content: &'a str, span: &SourceSpan) -> Option<&'a str> {
    if span.is_synthetic() {
        return None;
    }
    content.get(span_to_range(content, span))
}

// ============================================================================
// Line Utilities
// ============================================================================

/// Get the byte offset of the start of a 1-indexed line.
///
/// Returns `None` for line 0 or a line past the end of the content. The line
/// after a trailing newline exists and is empty.
pub fn line_start_offset(content: &str, line: u32) -> Option<usize> {
    if line == 0 {
        return None;
    }

    if line == 1 {
        return Some(0);
    }

    let mut current_line = 1u32;
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            current_line += 1;
            if current_line == line {
                return Some(i + 1);
            }
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
