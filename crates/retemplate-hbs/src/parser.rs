// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Recursive-descent parser for Handlebars/Glimmer templates.
//!
//! The parser is span-exact: every node records where it starts and ends,
//! text nodes keep their source text verbatim, and nothing is normalized.
//! That is what lets the printer reproduce untouched templates byte for byte.

use retemplate_core::location::{Position, SourceSpan};
use thiserror::Error;

use crate::nodes::*;
use crate::tokenizer::{is_expression_delimiter, is_tag_name_char, Cursor};

/// Elements whose content is text and mustaches only.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// A template that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {position}")]
pub struct ParserError {
    pub message: String,
    pub position: Position,
    /// Byte offset of `position` in the parsed text.
    pub offset: usize,
}

/// Parse template source into a [`Template`].
///
/// # Errors
///
/// Returns a [`ParserError`] for unterminated tags, strings and comments,
/// mismatched close tags, stray `{{else}}`/close tags and unexpected tokens.
pub fn parse_template(source: &str) -> Result<Template, ParserError> {
    let mut parser = Parser {
        cursor: Cursor::new(source),
    };
    let body = parser.parse_content(None)?;
    if !parser.cursor.is_eof() {
        return Err(parser.unexpected());
    }
    Ok(Template {
        body,
        span: SourceSpan::new(Position::new(1, 0), parser.cursor.position()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MustacheKind {
    Mustache,
    Block,
    Close,
    Else,
    Comment,
    Partial,
    Inverse,
}

/// Positional params, hash pairs and block params of one tag.
struct Arguments {
    params: Vec<Expression>,
    hash: Hash,
    block_params: Vec<String>,
    block_params_span: SourceSpan,
}

/// The program and inverse of a block, with the strip flags of its `{{else}}`.
struct BlockBody {
    program: Program,
    inverse: Option<Program>,
    inverse_strip: StripFlags,
}

struct Parser<'src> {
    cursor: Cursor<'src>,
}

impl<'src> Parser<'src> {
    // ========================================================================
    // Errors
    // ========================================================================

    fn error(&self, message: impl Into<String>) -> ParserError {
        ParserError {
            message: message.into(),
            position: self.cursor.position(),
            offset: self.cursor.offset(),
        }
    }

    fn error_at(&self, message: impl Into<String>, position: Position, offset: usize) -> ParserError {
        ParserError {
            message: message.into(),
            position,
            offset,
        }
    }

    /// Describe whatever stopped content parsing where it was not expected.
    fn unexpected(&self) -> ParserError {
        let rest = self.cursor.rest();
        let snippet: String = rest.chars().take_while(|&c| c != '\n').take(24).collect();
        if self.cursor.starts_with("</") {
            self.error(format!("unexpected closing tag `{}`", snippet))
        } else if self.cursor.starts_with("{{") {
            self.error(format!("unexpected `{}`", snippet))
        } else {
            self.error(format!("unexpected input `{}`", snippet))
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), ParserError> {
        if self.cursor.eat(token) {
            Ok(())
        } else if self.cursor.is_eof() {
            Err(self.error(format!("expected `{}` but reached end of template", token)))
        } else {
            let found: String = self.cursor.rest().chars().take(8).collect();
            Err(self.error(format!("expected `{}`, found `{}`", token, found)))
        }
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Parse statements until end of input, a block boundary (`{{/`,
    /// `{{else`) or a closing element tag. The caller decides whether the
    /// stop is legal.
    fn parse_content(&mut self, raw: Option<&str>) -> Result<Vec<Statement>, ParserError> {
        let mut body = Vec::new();

        while !self.cursor.is_eof() {
            if self.cursor.starts_with("{{") {
                match self.mustache_kind() {
                    MustacheKind::Close | MustacheKind::Else => break,
                    MustacheKind::Comment => {
                        body.push(Statement::MustacheComment(self.parse_mustache_comment()?))
                    }
                    MustacheKind::Block => {
                        body.push(Statement::Block(Box::new(self.parse_block()?)))
                    }
                    MustacheKind::Partial => {
                        return Err(self.error("partials are not supported"));
                    }
                    MustacheKind::Inverse => {
                        return Err(self.error("inverse sections are not supported"));
                    }
                    MustacheKind::Mustache => {
                        body.push(Statement::Mustache(self.parse_mustache()?))
                    }
                }
            } else if self.at_close_tag(raw) {
                break;
            } else if raw.is_none() && self.cursor.starts_with("<!--") {
                body.push(Statement::Comment(self.parse_html_comment()?));
            } else if raw.is_none() && self.at_element_start() {
                body.push(Statement::Element(Box::new(self.parse_element()?)));
            } else {
                body.push(Statement::Text(self.parse_text(raw)));
            }
        }

        Ok(body)
    }

    fn mustache_kind(&self) -> MustacheKind {
        let rest = &self.cursor.rest()[2..];
        let rest = rest.strip_prefix('~').unwrap_or(rest);
        match rest.chars().next() {
            Some('!') => MustacheKind::Comment,
            Some('#') => MustacheKind::Block,
            Some('/') => MustacheKind::Close,
            Some('>') => MustacheKind::Partial,
            Some('^') => MustacheKind::Inverse,
            _ if is_else(rest) => MustacheKind::Else,
            _ => MustacheKind::Mustache,
        }
    }

    fn at_element_start(&self) -> bool {
        self.cursor.peek() == Some('<')
            && self
                .cursor
                .peek_nth(1)
                .is_some_and(|c| c.is_alphabetic() || c == '@' || c == ':')
    }

    fn at_close_tag(&self, raw: Option<&str>) -> bool {
        let Some(after) = self.cursor.rest().strip_prefix("</") else {
            return false;
        };
        match raw {
            None => true,
            Some(tag) => {
                after.len() >= tag.len()
                    && after.is_char_boundary(tag.len())
                    && after[..tag.len()].eq_ignore_ascii_case(tag)
                    && after[tag.len()..].starts_with(|c: char| c == '>' || c.is_whitespace())
            }
        }
    }

    /// A run of text up to the next construct. Always consumes at least one
    /// character.
    fn parse_text(&mut self, raw: Option<&str>) -> TextNode {
        let start = self.cursor.position();
        let begin = self.cursor.offset();

        if let Some(ch) = self.cursor.bump() {
            // A `\{{` escape keeps the braces as text.
            if ch == '\\' && self.cursor.starts_with("{{") {
                self.cursor.advance(2);
            }
        }

        loop {
            match self.cursor.find_content_break() {
                None => {
                    let len = self.cursor.rest().len();
                    self.cursor.advance(len);
                    break;
                }
                Some(distance) => {
                    self.cursor.advance(distance);
                    if self.cursor.starts_with("{{") {
                        if is_escaped(&self.cursor.source()[begin..self.cursor.offset()]) {
                            self.cursor.advance(2);
                            continue;
                        }
                        break;
                    }
                    let markup = self.at_close_tag(raw)
                        || (raw.is_none()
                            && (self.cursor.starts_with("<!--") || self.at_element_start()));
                    if markup {
                        break;
                    }
                    self.cursor.bump();
                }
            }
        }

        let chars = &self.cursor.source()[begin..self.cursor.offset()];
        TextNode {
            chars: chars.to_string(),
            span: SourceSpan::new(start, self.cursor.position()),
        }
    }

    fn parse_html_comment(&mut self) -> Result<CommentStatement, ParserError> {
        let start = self.cursor.position();
        let begin = self.cursor.offset();
        self.expect("<!--")?;
        let Some(len) = self.cursor.find("-->") else {
            return Err(self.error_at("unclosed HTML comment", start, begin));
        };
        let value = self.cursor.advance(len).to_string();
        self.expect("-->")?;
        Ok(CommentStatement {
            value,
            span: SourceSpan::new(start, self.cursor.position()),
        })
    }

    // ========================================================================
    // Mustaches
    // ========================================================================

    fn parse_mustache_comment(&mut self) -> Result<MustacheCommentStatement, ParserError> {
        let start = self.cursor.position();
        let begin = self.cursor.offset();
        self.expect("{{")?;
        let mut strip = StripFlags {
            open: self.cursor.eat_char('~'),
            close: false,
        };
        self.expect("!")?;

        let long = self.cursor.eat("--");
        let value = if long {
            let end = [self.cursor.find("--}}"), self.cursor.find("--~}}")]
                .into_iter()
                .flatten()
                .min();
            let Some(len) = end else {
                return Err(self.error_at("unclosed comment `{{!--`", start, begin));
            };
            let value = self.cursor.advance(len).to_string();
            self.expect("--")?;
            value
        } else {
            let Some(len) = self.cursor.find("}}") else {
                return Err(self.error_at("unclosed comment `{{!`", start, begin));
            };
            let raw = &self.cursor.rest()[..len];
            let value = raw.strip_suffix('~').unwrap_or(raw).to_string();
            self.cursor.advance(value.len());
            value
        };
        strip.close = self.cursor.eat_char('~');
        self.expect("}}")?;

        Ok(MustacheCommentStatement {
            value,
            long,
            strip,
            span: SourceSpan::new(start, self.cursor.position()),
        })
    }

    fn parse_mustache(&mut self) -> Result<MustacheStatement, ParserError> {
        let start = self.cursor.position();
        self.expect("{{")?;
        let trusting = self.cursor.eat_char('{');
        let open = self.cursor.eat_char('~');
        self.cursor.skip_whitespace();

        let path = self.parse_expression()?;
        let args = self.parse_arguments(false)?;
        let close = self.parse_tag_end(if trusting { "}}}" } else { "}}" })?;

        Ok(MustacheStatement {
            path,
            params: args.params,
            hash: args.hash,
            trusting,
            strip: StripFlags { open, close },
            span: SourceSpan::new(start, self.cursor.position()),
        })
    }

    /// Consume optional whitespace, an optional `~` and the closing braces.
    /// Returns whether the `~` was present.
    fn parse_tag_end(&mut self, close: &str) -> Result<bool, ParserError> {
        self.cursor.skip_whitespace();
        let strip = self.cursor.eat_char('~');
        self.expect(close)?;
        Ok(strip)
    }

    fn parse_block(&mut self) -> Result<BlockStatement, ParserError> {
        let start = self.cursor.position();
        let begin = self.cursor.offset();
        self.expect("{{")?;
        let open = self.cursor.eat_char('~');
        self.expect("#")?;
        if matches!(self.cursor.peek(), Some('>') | Some('*')) {
            return Err(self.error("partial blocks and decorators are not supported"));
        }
        self.cursor.skip_whitespace();

        let path = self.parse_expression()?;
        let Some(name) = path.as_path().map(|p| p.original.clone()) else {
            return Err(self.error_at("block helper name must be a path", start, begin));
        };
        let args = self.parse_arguments(true)?;
        let close = self.parse_tag_end("}}")?;
        let open_span = SourceSpan::new(start, self.cursor.position());

        let body = self.parse_block_body(&name, args.block_params, args.block_params_span, start, begin)?;

        // `{{/name}}`
        let close_pos = self.cursor.position();
        let close_offset = self.cursor.offset();
        self.expect("{{")?;
        let close_open = self.cursor.eat_char('~');
        self.expect("/")?;
        self.cursor.skip_whitespace();
        let closing = self.cursor.take_while(|c| !is_expression_delimiter(c));
        if closing != name {
            return Err(self.error_at(
                format!("`{{{{#{}}}}}` was closed by `{{{{/{}}}}}`", name, closing),
                close_pos,
                close_offset,
            ));
        }
        let close_close = self.parse_tag_end("}}")?;

        Ok(BlockStatement {
            path,
            params: args.params,
            hash: args.hash,
            program: body.program,
            inverse: body.inverse,
            chained: false,
            open_strip: StripFlags { open, close },
            inverse_strip: body.inverse_strip,
            close_strip: StripFlags {
                open: close_open,
                close: close_close,
            },
            open: open_span,
            span: SourceSpan::new(start, self.cursor.position()),
        })
    }

    /// `{{else if cond}}`: a block whose close tag belongs to the chain head.
    fn parse_chained_block(&mut self, name: &str) -> Result<BlockStatement, ParserError> {
        let start = self.cursor.position();
        let begin = self.cursor.offset();
        self.expect("{{")?;
        let open = self.cursor.eat_char('~');
        self.cursor.skip_whitespace();
        self.expect("else")?;
        self.cursor.skip_whitespace();

        let path = self.parse_expression()?;
        if path.as_path().is_none() {
            return Err(self.error_at("`{{else}}` helper must be a path", start, begin));
        }
        let args = self.parse_arguments(true)?;
        let close = self.parse_tag_end("}}")?;
        let open_span = SourceSpan::new(start, self.cursor.position());

        let body = self.parse_block_body(name, args.block_params, args.block_params_span, start, begin)?;

        Ok(BlockStatement {
            path,
            params: args.params,
            hash: args.hash,
            program: body.program,
            inverse: body.inverse,
            chained: true,
            open_strip: StripFlags { open, close },
            inverse_strip: body.inverse_strip,
            close_strip: StripFlags::default(),
            open: open_span,
            span: SourceSpan::new(start, self.cursor.position()),
        })
    }

    /// Parse a block's program and optional inverse, stopping at its close tag.
    fn parse_block_body(
        &mut self,
        name: &str,
        block_params: Vec<String>,
        block_params_span: SourceSpan,
        start: Position,
        begin: usize,
    ) -> Result<BlockBody, ParserError> {
        let program_start = self.cursor.position();
        let body = self.parse_content(None)?;
        let program = Program {
            body,
            block_params,
            block_params_span,
            span: SourceSpan::new(program_start, self.cursor.position()),
        };

        let mut inverse = None;
        let mut inverse_strip = StripFlags::default();

        if self.at_block_boundary(MustacheKind::Else) {
            if is_plain_else(&self.cursor.rest()[2..]) {
                self.expect("{{")?;
                inverse_strip.open = self.cursor.eat_char('~');
                self.cursor.skip_whitespace();
                self.expect("else")?;
                inverse_strip.close = self.parse_tag_end("}}")?;

                let inverse_start = self.cursor.position();
                let body = self.parse_content(None)?;
                if self.at_block_boundary(MustacheKind::Else) {
                    return Err(self.error("unexpected `{{else}}` after `{{else}}`"));
                }
                inverse = Some(Program {
                    body,
                    block_params: Vec::new(),
                    block_params_span: SourceSpan::SYNTHETIC,
                    span: SourceSpan::new(inverse_start, self.cursor.position()),
                });
            } else {
                let chained = self.parse_chained_block(name)?;
                inverse_strip = chained.open_strip;
                inverse = Some(Program {
                    span: chained.span,
                    body: vec![Statement::Block(Box::new(chained))],
                    block_params: Vec::new(),
                    block_params_span: SourceSpan::SYNTHETIC,
                });
            }
        }

        if self.cursor.is_eof() {
            return Err(self.error_at(format!("unclosed block `{{{{#{}}}}}`", name), start, begin));
        }
        if !self.at_block_boundary(MustacheKind::Close) {
            return Err(self.unexpected());
        }

        Ok(BlockBody {
            program,
            inverse,
            inverse_strip,
        })
    }

    fn at_block_boundary(&self, kind: MustacheKind) -> bool {
        self.cursor.starts_with("{{") && self.mustache_kind() == kind
    }

    // ========================================================================
    // Arguments and expressions
    // ========================================================================

    /// Params, hash pairs and (optionally) `as |x y|`, up to the tag end.
    fn parse_arguments(&mut self, allow_block_params: bool) -> Result<Arguments, ParserError> {
        let mut params = Vec::new();
        let mut pairs: Vec<HashPair> = Vec::new();
        let mut block_params = Vec::new();
        let mut block_params_span = SourceSpan::SYNTHETIC;

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                None => return Err(self.error("unclosed mustache")),
                Some('}') | Some('~') | Some(')') => break,
                _ => {}
            }

            if self.at_block_params() {
                if !allow_block_params || !block_params_span.is_synthetic() {
                    return Err(self.error("unexpected block params"));
                }
                let (names, span) = self.parse_block_params()?;
                block_params = names;
                block_params_span = span;
                continue;
            }
            if !block_params_span.is_synthetic() {
                return Err(self.error("block params must come last"));
            }

            if let Some(key_len) = self.hash_key_len() {
                let pair = self.parse_hash_pair(key_len)?;
                if pairs.iter().any(|existing| existing.key == pair.key) {
                    return Err(self.error_at(
                        format!("duplicate hash key `{}`", pair.key),
                        pair.span.start,
                        self.cursor.offset(),
                    ));
                }
                pairs.push(pair);
            } else if !pairs.is_empty() {
                return Err(self.error("positional params must come before hash pairs"));
            } else {
                params.push(self.parse_expression()?);
            }
        }

        let span = SourceSpan::covering(pairs.iter().map(|pair| pair.span))
            .unwrap_or(SourceSpan::SYNTHETIC);
        Ok(Arguments {
            params,
            hash: Hash { pairs, span },
            block_params,
            block_params_span,
        })
    }

    fn at_block_params(&self) -> bool {
        self.cursor
            .rest()
            .strip_prefix("as")
            .filter(|after| after.starts_with(char::is_whitespace))
            .is_some_and(|after| after.trim_start().starts_with('|'))
    }

    fn parse_block_params(&mut self) -> Result<(Vec<String>, SourceSpan), ParserError> {
        let start = self.cursor.position();
        self.expect("as")?;
        self.cursor.skip_whitespace();
        self.expect("|")?;

        let mut names = Vec::new();
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.eat_char('|') {
                break;
            }
            let name = self
                .cursor
                .take_while(|c| !c.is_whitespace() && !matches!(c, '|' | '}' | '>'));
            if name.is_empty() {
                return Err(self.error("unclosed block params"));
            }
            names.push(name.to_string());
        }
        if names.is_empty() {
            return Err(self.error("block params must name at least one binding"));
        }

        Ok((names, SourceSpan::new(start, self.cursor.position())))
    }

    /// Length of a `key=` prefix at the cursor, if the next token is a hash key.
    fn hash_key_len(&self) -> Option<usize> {
        let rest = self.cursor.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| is_expression_delimiter(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        rest[len..].trim_start().starts_with('=').then_some(len)
    }

    fn parse_hash_pair(&mut self, key_len: usize) -> Result<HashPair, ParserError> {
        let start = self.cursor.position();
        let key = self.cursor.advance(key_len).to_string();
        self.cursor.skip_whitespace();
        self.expect("=")?;
        self.cursor.skip_whitespace();
        let value = self.parse_expression()?;
        Ok(HashPair {
            key,
            span: SourceSpan::new(start, value.span().end),
            value,
        })
    }

    fn parse_expression(&mut self) -> Result<Expression, ParserError> {
        let start = self.cursor.position();
        match self.cursor.peek() {
            Some('(') => Ok(Expression::SubExpression(Box::new(self.parse_sub_expression()?))),
            Some(quote @ ('"' | '\'')) => {
                let value = self.parse_string(quote)?;
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::String(value),
                    span: SourceSpan::new(start, self.cursor.position()),
                }))
            }
            _ => {
                let token = self.cursor.take_while(|c| !is_expression_delimiter(c));
                if token.is_empty() {
                    return Err(match self.cursor.peek() {
                        Some(c) => self.error(format!("expected an expression, found `{}`", c)),
                        None => self.error("expected an expression but reached end of template"),
                    });
                }
                let span = SourceSpan::new(start, self.cursor.position());
                let literal = match token {
                    "true" => Some(LiteralValue::Boolean(true)),
                    "false" => Some(LiteralValue::Boolean(false)),
                    "null" => Some(LiteralValue::Null),
                    "undefined" => Some(LiteralValue::Undefined),
                    _ if is_number(token) => Some(LiteralValue::Number(token.to_string())),
                    _ => None,
                };
                Ok(match literal {
                    Some(value) => Expression::Literal(Literal { value, span }),
                    None => Expression::Path(PathExpression::new(token, span)),
                })
            }
        }
    }

    fn parse_sub_expression(&mut self) -> Result<SubExpression, ParserError> {
        let start = self.cursor.position();
        self.expect("(")?;
        self.cursor.skip_whitespace();
        let path = self.parse_expression()?;
        let args = self.parse_arguments(false)?;
        self.cursor.skip_whitespace();
        self.expect(")")?;
        Ok(SubExpression {
            path,
            params: args.params,
            hash: args.hash,
            span: SourceSpan::new(start, self.cursor.position()),
        })
    }

    /// A quoted string. Only the quote character itself can be escaped.
    fn parse_string(&mut self, quote: char) -> Result<String, ParserError> {
        let start = self.cursor.position();
        let begin = self.cursor.offset();
        self.cursor.bump();

        let mut value = String::new();
        loop {
            match self.cursor.bump() {
                None => return Err(self.error_at("unterminated string", start, begin)),
                Some('\\') if self.cursor.peek() == Some(quote) => {
                    self.cursor.bump();
                    value.push(quote);
                }
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
            }
        }
        Ok(value)
    }

    // ========================================================================
    // Elements
    // ========================================================================

    fn parse_element(&mut self) -> Result<ElementNode, ParserError> {
        let start = self.cursor.position();
        let begin = self.cursor.offset();
        self.expect("<")?;
        let tag = self.cursor.take_while(is_tag_name_char).to_string();

        let mut attributes = Vec::new();
        let mut modifiers = Vec::new();
        let mut comments = Vec::new();
        let mut block_params = Vec::new();
        let mut block_params_span = SourceSpan::SYNTHETIC;

        let self_closing = loop {
            self.cursor.skip_whitespace();
            if self.cursor.eat("/>") {
                break true;
            }
            if self.cursor.eat_char('>') {
                break false;
            }
            if self.cursor.is_eof() {
                return Err(self.error_at(format!("unclosed start tag `<{}`", tag), start, begin));
            }

            if self.cursor.starts_with("{{") {
                if self.mustache_kind() == MustacheKind::Comment {
                    comments.push(self.parse_mustache_comment()?);
                } else {
                    modifiers.push(self.parse_modifier()?);
                }
            } else if self.at_block_params() {
                let (names, span) = self.parse_block_params()?;
                block_params = names;
                block_params_span = span;
            } else {
                attributes.push(self.parse_attribute()?);
            }
        };
        let start_tag = SourceSpan::new(start, self.cursor.position());

        let children = if self_closing || is_void_tag(&tag) {
            Vec::new()
        } else {
            let raw = RAW_TEXT_ELEMENTS
                .iter()
                .find(|raw| raw.eq_ignore_ascii_case(&tag))
                .copied();
            let children = self.parse_content(raw)?;
            self.parse_end_tag(&tag, start, begin)?;
            children
        };

        Ok(ElementNode {
            tag,
            attributes,
            modifiers,
            comments,
            block_params,
            block_params_span,
            children,
            self_closing,
            start_tag,
            span: SourceSpan::new(start, self.cursor.position()),
        })
    }

    fn parse_end_tag(&mut self, tag: &str, start: Position, begin: usize) -> Result<(), ParserError> {
        if self.cursor.is_eof() {
            return Err(self.error_at(format!("unclosed element `<{}>`", tag), start, begin));
        }
        if !self.cursor.starts_with("</") {
            return Err(self.unexpected());
        }

        let close_pos = self.cursor.position();
        let close_offset = self.cursor.offset();
        self.expect("</")?;
        let closing = self.cursor.take_while(is_tag_name_char);
        if closing != tag {
            return Err(self.error_at(
                format!("closing tag `</{}>` did not match `<{}>`", closing, tag),
                close_pos,
                close_offset,
            ));
        }
        self.cursor.skip_whitespace();
        self.expect(">")
    }

    fn parse_modifier(&mut self) -> Result<ElementModifierStatement, ParserError> {
        let start = self.cursor.position();
        self.expect("{{")?;
        if self.cursor.starts_with("{") || self.mustache_kind_after_open() != MustacheKind::Mustache {
            return Err(self.error("only plain mustaches may appear in an element start tag"));
        }
        self.cursor.eat_char('~');
        self.cursor.skip_whitespace();
        let path = self.parse_expression()?;
        let args = self.parse_arguments(false)?;
        self.parse_tag_end("}}")?;
        Ok(ElementModifierStatement {
            path,
            params: args.params,
            hash: args.hash,
            span: SourceSpan::new(start, self.cursor.position()),
        })
    }

    /// Kind of the tag whose `{{` was just consumed.
    fn mustache_kind_after_open(&self) -> MustacheKind {
        match self.cursor.peek() {
            Some('#') => MustacheKind::Block,
            Some('/') => MustacheKind::Close,
            _ if is_else(self.cursor.rest()) => MustacheKind::Else,
            _ => MustacheKind::Mustache,
        }
    }

    fn parse_attribute(&mut self) -> Result<AttrNode, ParserError> {
        let start = self.cursor.position();
        let begin = self.cursor.offset();
        loop {
            match self.cursor.peek() {
                Some('/') if self.cursor.peek_nth(1) == Some('>') => break,
                Some(c) if c.is_whitespace() || matches!(c, '=' | '>' | '"' | '\'' | '{') => break,
                Some(_) => {
                    self.cursor.bump();
                }
                None => break,
            }
        }
        let name = self.cursor.source()[begin..self.cursor.offset()].to_string();
        if name.is_empty() {
            return Err(self.unexpected());
        }

        let before_value = self.cursor.clone();
        self.cursor.skip_whitespace();
        let (value, quote) = if self.cursor.eat_char('=') {
            self.cursor.skip_whitespace();
            let (value, quote) = self.parse_attribute_value()?;
            (Some(value), quote)
        } else {
            self.cursor = before_value;
            (None, None)
        };

        Ok(AttrNode {
            name,
            value,
            quote,
            span: SourceSpan::new(start, self.cursor.position()),
        })
    }

    fn parse_attribute_value(&mut self) -> Result<(AttrValue, Option<char>), ParserError> {
        match self.cursor.peek() {
            Some(quote @ ('"' | '\'')) => {
                let open = self.cursor.position();
                let begin = self.cursor.offset();
                self.cursor.bump();
                let value = self.parse_quoted_value(quote, open, begin)?;
                Ok((value, Some(quote)))
            }
            Some('{') if self.cursor.starts_with("{{") => {
                Ok((AttrValue::Mustache(self.parse_mustache()?), None))
            }
            _ => {
                let start = self.cursor.position();
                let chars = self
                    .cursor
                    .take_while(|c| !c.is_whitespace() && c != '>')
                    .to_string();
                if chars.is_empty() {
                    return Err(self.error("expected an attribute value"));
                }
                Ok((
                    AttrValue::Text(TextNode {
                        chars,
                        span: SourceSpan::new(start, self.cursor.position()),
                    }),
                    None,
                ))
            }
        }
    }

    /// The inside of a quoted attribute value; consumes the closing quote.
    fn parse_quoted_value(&mut self, quote: char, open: Position, begin: usize) -> Result<AttrValue, ParserError> {
        let inner_start = self.cursor.position();
        let mut parts = Vec::new();
        let mut text_start = inner_start;
        let mut text_begin = self.cursor.offset();
        let mut has_mustache = false;

        loop {
            match self.cursor.peek() {
                None => return Err(self.error_at("unterminated attribute value", open, begin)),
                Some(c) if c == quote => break,
                Some('{') if self.cursor.starts_with("{{") => {
                    if self.cursor.offset() > text_begin {
                        parts.push(Statement::Text(TextNode {
                            chars: self.cursor.source()[text_begin..self.cursor.offset()].to_string(),
                            span: SourceSpan::new(text_start, self.cursor.position()),
                        }));
                    }
                    if self.mustache_kind() != MustacheKind::Mustache {
                        return Err(self.error("only plain mustaches may appear in an attribute value"));
                    }
                    parts.push(Statement::Mustache(self.parse_mustache()?));
                    has_mustache = true;
                    text_start = self.cursor.position();
                    text_begin = self.cursor.offset();
                }
                Some(_) => {
                    self.cursor.bump();
                }
            }
        }

        let inner_end = self.cursor.position();
        if self.cursor.offset() > text_begin {
            parts.push(Statement::Text(TextNode {
                chars: self.cursor.source()[text_begin..self.cursor.offset()].to_string(),
                span: SourceSpan::new(text_start, inner_end),
            }));
        }
        self.cursor.bump();

        let span = SourceSpan::new(inner_start, inner_end);
        if has_mustache {
            return Ok(AttrValue::Concat(ConcatStatement { parts, span }));
        }
        let chars = match parts.pop() {
            Some(Statement::Text(text)) => text.chars,
            _ => String::new(),
        };
        Ok(AttrValue::Text(TextNode { chars, span }))
    }
}

/// True when `rest` (the text after `{{` and any `~`) opens an `{{else}}`.
fn is_else(rest: &str) -> bool {
    rest.trim_start()
        .strip_prefix("else")
        .is_some_and(|after| after.starts_with(|c: char| c.is_whitespace() || c == '~' || c == '}'))
}

/// True for a bare `{{else}}` as opposed to `{{else if ...}}`.
fn is_plain_else(rest: &str) -> bool {
    let rest = rest.strip_prefix('~').unwrap_or(rest);
    rest.trim_start()
        .strip_prefix("else")
        .map(|after| after.trim_start())
        .is_some_and(|after| after.starts_with("}}") || after.starts_with("~}}"))
}

/// True when the text before a `{{` ends in an odd run of backslashes.
fn is_escaped(before: &str) -> bool {
    before.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn is_number(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

// ============================================================================
// Tests
// ============================================================================
