// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Position-tracking cursor over template source.
//!
//! The parser reads source through a [`Cursor`], which keeps the byte offset
//! and the line/column position in step so every node can be given an exact
//! span without a second pass.

use memchr::{memchr2, memmem};
use retemplate_core::location::Position;

/// Characters that end a path, keyword or number token inside a mustache.
pub(crate) fn is_expression_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '}' | '=' | '|' | '~' | '"' | '\'' | '{')
}

/// Characters allowed in an element tag name.
pub(crate) fn is_tag_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.' | '@')
}

#[derive(Debug, Clone)]
pub(crate) struct Cursor<'src> {
    src: &'src str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'src> Cursor<'src> {
    pub(crate) fn new(src: &'src str) -> Self {
        Cursor {
            src,
            offset: 0,
            line: 1,
            column: 0,
        }
    }

    pub(crate) fn source(&self) -> &'src str {
        self.src
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub(crate) fn rest(&self) -> &'src str {
        &self.src[self.offset..]
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.offset >= self.src.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    pub(crate) fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Consume `prefix` if the input starts with it.
    pub(crate) fn eat(&mut self, prefix: &str) -> bool {
        if self.starts_with(prefix) {
            self.advance(prefix.len());
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_char(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume `len` bytes, which must end on a character boundary.
    pub(crate) fn advance(&mut self, len: usize) -> &'src str {
        let end = (self.offset + len).min(self.src.len());
        let text = &self.src[self.offset..end];
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.offset = end;
        text
    }

    /// Consume characters while `pred` holds.
    pub(crate) fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'src str {
        let len = self
            .rest()
            .char_indices()
            .find(|&(_, ch)| !pred(ch))
            .map(|(i, _)| i)
            .unwrap_or(self.rest().len());
        self.advance(len)
    }

    pub(crate) fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// Byte distance from the cursor to the next occurrence of `needle`.
    pub(crate) fn find(&self, needle: &str) -> Option<usize> {
        memmem::find(self.rest().as_bytes(), needle.as_bytes())
    }

    /// Byte distance to the next `{` or `<`, the only bytes that can start a
    /// construct inside template content.
    pub(crate) fn find_content_break(&self) -> Option<usize> {
        memchr2(b'{', b'<', self.rest().as_bytes())
    }
}
