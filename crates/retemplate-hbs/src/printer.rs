// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Template printer.
//!
//! Text, comments and attribute values are emitted verbatim. The inside of a
//! tag is rebuilt part by part: whitespace between two parts that both carry
//! real spans is reconstructed from the spans (line breaks and column
//! padding), while any gap touching a synthetic part gets canonical spacing.
//! An untouched template therefore prints back byte for byte, and rewritten
//! regions come out in a stable canonical layout.
//!
//! Close tags are always canonical: `</tag>` and `{{/path}}`.

use retemplate_core::location::{Position, SourceSpan};
use serde::{Deserialize, Serialize};

use crate::nodes::*;

/// Quote character for string literals inside mustaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStyle {
    #[default]
    #[serde(rename = "\"")]
    Double,
    #[serde(rename = "'")]
    Single,
}

impl QuoteStyle {
    pub fn as_char(self) -> char {
        match self {
            QuoteStyle::Double => '"',
            QuoteStyle::Single => '\'',
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
    pub mustache_quote: QuoteStyle,
    /// Print blocks with no body and no inverse as `{{name ...}}`.
    pub compact_empty_blocks: bool,
}

/// Print a whole template.
pub fn print(template: &Template, options: &PrintOptions) -> String {
    let mut printer = Printer::new(*options);
    printer.print_statements(&template.body);
    printer.finish()
}

/// Print a statement list, such as a block's program body.
pub fn print_statements(statements: &[Statement], options: &PrintOptions) -> String {
    let mut printer = Printer::new(*options);
    printer.print_statements(statements);
    printer.finish()
}

/// Print one attribute as it would appear in a start tag.
pub fn print_attribute(attr: &AttrNode, options: &PrintOptions) -> String {
    let mut printer = Printer::new(*options);
    printer.print_attribute(attr);
    printer.finish()
}

fn spaces(count: u32) -> String {
    " ".repeat(count as usize)
}

/// Whitespace that separates a part ending at `from` from one starting at
/// `to`. Synthetic positions get `min` spaces.
fn gap(from: Position, to: Position, min: u32) -> String {
    if from.is_synthetic() || to.is_synthetic() || to < from {
        return spaces(min);
    }
    if to.line > from.line {
        let mut out = "\n".repeat((to.line - from.line) as usize);
        out.push_str(&spaces(to.column));
        return out;
    }
    spaces((to.column - from.column).max(min))
}

/// Tracks the previous part of a tag while its parts are printed.
struct Layout {
    prev_end: Position,
    last_real_end: Position,
}

impl Layout {
    fn new(inner_start: Position) -> Self {
        Layout {
            prev_end: inner_start,
            last_real_end: inner_start,
        }
    }

    /// The separator before a part at `span`.
    fn before(&mut self, span: SourceSpan, min: u32) -> String {
        let sep = gap(self.prev_end, span.start, min);
        self.prev_end = span.end;
        if !span.is_synthetic() {
            self.last_real_end = span.end;
        }
        sep
    }

    /// A part laid out canonically regardless of its span.
    fn detach(&mut self) {
        self.prev_end = Position::default();
        self.last_real_end = Position::default();
    }

    /// Whitespace between the last real part and the closing token.
    fn trailing(&self, close_start: Position, min: u32) -> String {
        gap(self.last_real_end, close_start, min)
    }
}

/// A helper invocation: the shared shape of mustaches, blocks, modifiers and
/// sub-expressions.
struct Call<'a> {
    path: &'a Expression,
    params: &'a [Expression],
    hash: &'a Hash,
    block_params: &'a [String],
    block_params_span: SourceSpan,
}

/// Where a tag's parts start and its closing token begins, in source.
#[derive(Clone, Copy)]
struct Frame {
    inner_start: Position,
    close_start: Position,
    lead_min: u32,
    trail_min: u32,
}

impl Frame {
    fn new(span: SourceSpan, open_len: u32, close_len: u32) -> Self {
        if span.is_synthetic() {
            return Frame {
                inner_start: Position::default(),
                close_start: Position::default(),
                lead_min: 0,
                trail_min: 0,
            };
        }
        Frame {
            inner_start: span.start.forward(open_len),
            close_start: span.end.back(close_len),
            lead_min: 0,
            trail_min: 0,
        }
    }
}

enum TagPart<'a> {
    Attribute(&'a AttrNode),
    Modifier(&'a ElementModifierStatement),
    Comment(&'a MustacheCommentStatement),
}

impl TagPart<'_> {
    fn span(&self) -> SourceSpan {
        match self {
            TagPart::Attribute(node) => node.span,
            TagPart::Modifier(node) => node.span,
            TagPart::Comment(node) => node.span,
        }
    }
}

pub struct Printer {
    options: PrintOptions,
    out: String,
    /// Column of the first output character.
    base_column: u32,
    /// Quote of the attribute value currently being printed.
    attr_quote: Option<char>,
}

impl Printer {
    pub fn new(options: PrintOptions) -> Self {
        Printer {
            options,
            out: String::new(),
            base_column: 0,
            attr_quote: None,
        }
    }

    /// Start printing as if the output were placed at `column` of a line.
    pub fn with_column(mut self, column: u32) -> Self {
        self.base_column = column;
        self
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn column(&self) -> u32 {
        match self.out.rfind('\n') {
            Some(newline) => self.out[newline + 1..].chars().count() as u32,
            None => self.base_column + self.out.chars().count() as u32,
        }
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn push_if(&mut self, condition: bool, text: &str) {
        if condition {
            self.out.push_str(text);
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn print_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.print_statement(statement);
        }
    }

    pub fn print_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Text(text) => self.push(&text.chars),
            Statement::Comment(comment) => {
                self.push("<!--");
                self.push(&comment.value);
                self.push("-->");
            }
            Statement::MustacheComment(comment) => self.print_mustache_comment(comment),
            Statement::Mustache(mustache) => self.print_mustache(mustache),
            Statement::Block(block) if block.chained => self.print_chained_block(block),
            Statement::Block(block) => self.print_block(block),
            Statement::Element(element) => self.print_element(element),
        }
    }

    fn print_mustache_comment(&mut self, comment: &MustacheCommentStatement) {
        self.push("{{");
        self.push_if(comment.strip.open, "~");
        self.push("!");
        self.push_if(comment.long, "--");
        self.push(&comment.value);
        self.push_if(comment.long, "--");
        self.push_if(comment.strip.close, "~");
        self.push("}}");
    }

    fn print_mustache(&mut self, mustache: &MustacheStatement) {
        let tag_column = self.column();
        let (open, close) = if mustache.trusting {
            ("{{{", "}}}")
        } else {
            ("{{", "}}")
        };
        let strip = mustache.strip;

        self.push(open);
        self.push_if(strip.open, "~");
        let frame = Frame::new(
            mustache.span,
            open.len() as u32 + u32::from(strip.open),
            close.len() as u32 + u32::from(strip.close),
        );
        self.print_call(
            &Call {
                path: &mustache.path,
                params: &mustache.params,
                hash: &mustache.hash,
                block_params: &[],
                block_params_span: SourceSpan::SYNTHETIC,
            },
            frame,
            tag_column,
        );
        self.push_if(strip.close, "~");
        self.push(close);
    }

    fn print_block(&mut self, block: &BlockStatement) {
        let tag_column = self.column();
        let compact = self.options.compact_empty_blocks
            && block.program.body.is_empty()
            && block.inverse.is_none();
        let strip = block.open_strip;

        self.push("{{");
        self.push_if(strip.open, "~");
        self.push_if(!compact, "#");
        let frame = Frame::new(block.open, 3 + u32::from(strip.open), 2 + u32::from(strip.close));
        self.print_call(&block_call(block), frame, tag_column);
        self.push_if(strip.close, "~");
        self.push("}}");

        if compact {
            return;
        }

        self.print_statements(&block.program.body);
        self.print_inverse(block);

        self.push("{{");
        self.push_if(block.close_strip.open, "~");
        self.push("/");
        self.print_expression(&block.path);
        self.push_if(block.close_strip.close, "~");
        self.push("}}");
    }

    /// `{{else if ...}}` and everything up to the chain head's close tag.
    fn print_chained_block(&mut self, block: &BlockStatement) {
        let tag_column = self.column();
        let strip = block.open_strip;

        self.push("{{");
        self.push_if(strip.open, "~");
        self.push("else");
        let mut frame = Frame::new(block.open, 6 + u32::from(strip.open), 2 + u32::from(strip.close));
        frame.lead_min = 1;
        self.print_call(&block_call(block), frame, tag_column);
        self.push_if(strip.close, "~");
        self.push("}}");

        self.print_statements(&block.program.body);
        self.print_inverse(block);
    }

    fn print_inverse(&mut self, block: &BlockStatement) {
        let Some(inverse) = &block.inverse else {
            return;
        };
        if let Some(chained) = block.chained_inverse() {
            self.print_chained_block(chained);
            return;
        }

        self.push("{{");
        self.push_if(block.inverse_strip.open, "~");
        self.push("else");
        self.push_if(block.inverse_strip.close, "~");
        self.push("}}");
        self.print_statements(&inverse.body);
    }

    fn print_element(&mut self, element: &ElementNode) {
        let tag_column = self.column();
        self.push("<");
        self.push(&element.tag);

        let tag_len = element.tag.chars().count() as u32;
        let mut frame = Frame::new(
            element.start_tag,
            1 + tag_len,
            if element.self_closing { 2 } else { 1 },
        );
        frame.lead_min = 1;
        frame.trail_min = u32::from(element.self_closing);

        let mut parts: Vec<TagPart<'_>> = Vec::new();
        parts.extend(element.attributes.iter().map(TagPart::Attribute));
        parts.extend(element.modifiers.iter().map(TagPart::Modifier));
        parts.extend(element.comments.iter().map(TagPart::Comment));
        parts.sort_by_key(|part| {
            let span = part.span();
            (span.is_synthetic(), span.start)
        });

        let mut layout = Layout::new(frame.inner_start);
        for part in &parts {
            let sep = layout.before(part.span(), 1);
            self.push(&sep);
            match part {
                TagPart::Attribute(attr) => self.print_attribute(attr),
                TagPart::Modifier(modifier) => self.print_modifier(modifier, tag_column),
                TagPart::Comment(comment) => self.print_mustache_comment(comment),
            }
        }
        if !element.block_params.is_empty() {
            let sep = layout.before(element.block_params_span, 1);
            self.push(&sep);
            self.print_block_params(&element.block_params);
        }
        let trailing = layout.trailing(frame.close_start, frame.trail_min);
        self.push(&trailing);

        if element.self_closing {
            self.push("/>");
            return;
        }
        self.push(">");
        if element.is_void() {
            return;
        }

        self.print_statements(&element.children);
        self.push("</");
        self.push(&element.tag);
        self.push(">");
    }

    fn print_modifier(&mut self, modifier: &ElementModifierStatement, tag_column: u32) {
        self.push("{{");
        let frame = Frame::new(modifier.span, 2, 2);
        self.print_call(
            &Call {
                path: &modifier.path,
                params: &modifier.params,
                hash: &modifier.hash,
                block_params: &[],
                block_params_span: SourceSpan::SYNTHETIC,
            },
            frame,
            tag_column,
        );
        self.push("}}");
    }

    pub fn print_attribute(&mut self, attr: &AttrNode) {
        self.push(&attr.name);
        let Some(value) = &attr.value else {
            return;
        };
        self.push("=");

        match value {
            AttrValue::Text(text) => match attr.quote {
                Some(quote) => {
                    self.out.push(quote);
                    self.push(&text.chars);
                    self.out.push(quote);
                }
                None => self.push(&text.chars),
            },
            AttrValue::Mustache(mustache) => match attr.quote {
                Some(quote) => self.print_quoted(quote, |printer| printer.print_mustache(mustache)),
                None => self.print_mustache(mustache),
            },
            AttrValue::Concat(concat) => {
                let quote = attr.quote.unwrap_or('"');
                self.print_quoted(quote, |printer| printer.print_statements(&concat.parts));
            }
        }
    }

    fn print_quoted(&mut self, quote: char, body: impl FnOnce(&mut Printer)) {
        self.out.push(quote);
        let outer = self.attr_quote.replace(quote);
        body(self);
        self.attr_quote = outer;
        self.out.push(quote);
    }

    // ========================================================================
    // Calls and expressions
    // ========================================================================

    fn print_call(&mut self, call: &Call<'_>, frame: Frame, tag_column: u32) {
        let mut layout = Layout::new(frame.inner_start);

        let sep = layout.before(call.path.span(), frame.lead_min);
        self.push(&sep);
        self.print_expression(call.path);

        for param in call.params {
            let sep = layout.before(param.span(), 1);
            self.push(&sep);
            self.print_expression(param);
        }

        let pairs = &call.hash.pairs;
        let canonical_hash = pairs.len() > 2 && pairs.iter().any(|pair| pair.span.is_synthetic());
        for pair in pairs {
            if canonical_hash {
                self.push("\n");
                self.push(&spaces(tag_column + 4));
            } else {
                let sep = layout.before(pair.span, 1);
                self.push(&sep);
            }
            self.push(&pair.key);
            self.push("=");
            self.print_expression(&pair.value);
        }
        if canonical_hash {
            layout.detach();
        }

        if !call.block_params.is_empty() {
            let sep = layout.before(call.block_params_span, 1);
            self.push(&sep);
            self.print_block_params(call.block_params);
        }

        let trailing = layout.trailing(frame.close_start, frame.trail_min);
        self.push(&trailing);
    }

    fn print_block_params(&mut self, names: &[String]) {
        self.push("as |");
        self.push(&names.join(" "));
        self.push("|");
    }

    fn print_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Path(path) => self.push(&path.original),
            Expression::Literal(literal) => self.print_literal(&literal.value),
            Expression::SubExpression(sub) => {
                let tag_column = self.column();
                self.push("(");
                let frame = Frame::new(sub.span, 1, 1);
                self.print_call(
                    &Call {
                        path: &sub.path,
                        params: &sub.params,
                        hash: &sub.hash,
                        block_params: &[],
                        block_params_span: SourceSpan::SYNTHETIC,
                    },
                    frame,
                    tag_column,
                );
                self.push(")");
            }
        }
    }

    fn print_literal(&mut self, value: &LiteralValue) {
        match value {
            LiteralValue::String(value) => {
                let quoted = self.quote_string(value);
                self.push(&quoted);
            }
            LiteralValue::Boolean(value) => self.push(if *value { "true" } else { "false" }),
            LiteralValue::Number(raw) => self.push(raw),
            LiteralValue::Null => self.push("null"),
            LiteralValue::Undefined => self.push("undefined"),
        }
    }

    /// Quote a string literal with the configured quote, or the other one if
    /// that avoids escaping. Inside a quoted attribute value the attribute's
    /// own quote character is avoided.
    fn quote_string(&self, value: &str) -> String {
        let configured = self.options.mustache_quote.as_char();
        let (preferred, other) = match self.attr_quote {
            Some(outer) if outer == configured => (flip(configured), configured),
            _ => (configured, flip(configured)),
        };

        let quote = if !value.contains(preferred) || value.contains(other) {
            preferred
        } else {
            other
        };

        let mut out = String::with_capacity(value.len() + 2);
        out.push(quote);
        for ch in value.chars() {
            if ch == quote {
                out.push('\\');
            }
            out.push(ch);
        }
        out.push(quote);
        out
    }
}

fn flip(quote: char) -> char {
    if quote == '"' {
        '\''
    } else {
        '"'
    }
}

fn block_call(block: &BlockStatement) -> Call<'_> {
    Call {
        path: &block.path,
        params: &block.params,
        hash: &block.hash,
        block_params: &block.program.block_params,
        block_params_span: block.program.block_params_span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_template;

    fn roundtrip(source: &str) -> String {
        let template = parse_template(source).unwrap_or_else(|e| panic!("{}", e));
        print(&template, &PrintOptions::default())
    }

    fn single_quotes() -> PrintOptions {
        PrintOptions {
            mustache_quote: QuoteStyle::Single,
            ..PrintOptions::default()
        }
    }

    mod faithful_tests {
        use super::*;

        #[test]
        fn reproduces_spacing_inside_tags() {
            let sources = [
                "{{foo}}",
                "{{ foo  bar   baz=qux }}",
                "{{#if  a}}x{{else if b }}y{{else}}z{{/if}}",
                "{{~#each items as |item i|~}}{{item}}{{~/each~}}",
                "<div\n  class=\"a {{b}}\"\n  {{on \"click\" this.go}}\n>text</div>",
                "{{{raw  html}}}",
                "{{t (concat \"a\" (upper b)  c=d)}}",
                "<input disabled value={{v}}>",
                "<Foo @a={{b}} as |x| />",
                "{{!-- note --}}<!-- html -->{{! short ~}}",
                "{{format-date\n    date\n    format=\"YYYY\"\n}}",
            ];
            for source in sources {
                assert_eq!(roundtrip(source), source);
            }
        }

        #[test]
        fn literals_print_back() {
            let source = "{{helper 1 -2.5 true false null undefined \"s\"}}";
            assert_eq!(roundtrip(source), source);
        }

        #[test]
        fn attribute_quotes_are_avoided_inside_values() {
            let source = "<div class=\"{{if active 'on' 'off'}}\"></div>";
            assert_eq!(roundtrip(source), source);
        }
    }

    mod quote_tests {
        use super::*;

        #[test]
        fn configured_quote() {
            let template = parse_template("{{t \"hello\" x=\"y\"}}").unwrap();
            assert_eq!(print(&template, &single_quotes()), "{{t 'hello' x='y'}}");
        }

        #[test]
        fn switches_quote_to_avoid_escaping() {
            let template = parse_template("{{t \"it's\"}}").unwrap();
            assert_eq!(print(&template, &single_quotes()), "{{t \"it's\"}}");
        }

        #[test]
        fn escapes_when_both_quotes_appear() {
            let template = parse_template(r#"{{t 'say "it\'s"'}}"#).unwrap();
            assert_eq!(
                print(&template, &PrintOptions::default()),
                r#"{{t "say \"it's\""}}"#
            );
        }

        #[test]
        fn text_is_not_requoted() {
            let source = "<p title=\"x\">\"quoted\" 'text'</p>";
            let template = parse_template(source).unwrap();
            assert_eq!(print(&template, &single_quotes()), source);
        }
    }

    mod synthetic_tests {
        use super::*;

        fn path(name: &str) -> Expression {
            Expression::Path(PathExpression::synthetic(name))
        }

        fn string(value: &str) -> Expression {
            Expression::Literal(Literal::synthetic(LiteralValue::String(value.to_string())))
        }

        #[test]
        fn canonical_mustache() {
            let mut mustache = MustacheStatement::synthetic(path("if"), vec![path("a"), string("b")]);
            mustache.hash.insert("c", path("d"));
            let out = print_statements(&[Statement::Mustache(mustache)], &PrintOptions::default());
            assert_eq!(out, "{{if a \"b\" c=d}}");
        }

        #[test]
        fn many_synthetic_pairs_go_one_per_line() {
            let mut hash = Hash::default();
            hash.insert("a", path("x"));
            hash.insert("b", path("y"));
            hash.insert("c", path("z"));
            let block = BlockStatement::synthetic("wrapper", hash, Program::synthetic(vec![]));
            let mut printer = Printer::new(PrintOptions::default()).with_column(2);
            printer.print_statement(&Statement::Block(Box::new(block)));
            assert_eq!(
                printer.finish(),
                "{{#wrapper\n      a=x\n      b=y\n      c=z}}{{/wrapper}}"
            );
        }

        #[test]
        fn compact_empty_blocks() {
            let options = PrintOptions {
                compact_empty_blocks: true,
                ..PrintOptions::default()
            };
            let mut hash = Hash::default();
            hash.insert("title", string("t"));
            let empty = BlockStatement::synthetic("section.header", hash, Program::synthetic(vec![]));
            let full = BlockStatement::synthetic(
                "section.body",
                Hash::default(),
                Program::synthetic(vec![Statement::Text(TextNode::synthetic("x"))]),
            );
            let out = print_statements(
                &[Statement::Block(Box::new(empty)), Statement::Block(Box::new(full))],
                &options,
            );
            assert_eq!(out, "{{section.header title=\"t\"}}{{#section.body}}x{{/section.body}}");
        }

        #[test]
        fn synthetic_block_params_after_real_parts() {
            let mut template = parse_template("{{#each people}}{{person}}{{/each}}").unwrap();
            let Statement::Block(block) = &mut template.body[0] else {
                panic!("expected block");
            };
            block.program.block_params = vec!["person".to_string()];
            assert_eq!(
                print(&template, &PrintOptions::default()),
                "{{#each people as |person|}}{{person}}{{/each}}"
            );
        }

        #[test]
        fn synthetic_sub_expression() {
            let mut mustache = MustacheStatement::synthetic(path("x"), Vec::new());
            mustache.hash.insert(
                "onClick",
                Expression::SubExpression(Box::new(SubExpression::synthetic(
                    "action",
                    vec![string("save")],
                ))),
            );
            let out = print_statements(&[Statement::Mustache(mustache)], &single_quotes());
            assert_eq!(out, "{{x onClick=(action 'save')}}");
        }

        #[test]
        fn synthetic_attribute() {
            let attr = AttrNode {
                name: "class".to_string(),
                value: Some(AttrValue::Concat(ConcatStatement {
                    parts: vec![
                        Statement::Text(TextNode::synthetic("btn ")),
                        Statement::Mustache(MustacheStatement::synthetic(
                            path("if"),
                            vec![path("active"), string("on")],
                        )),
                    ],
                    span: SourceSpan::SYNTHETIC,
                })),
                quote: Some('"'),
                span: SourceSpan::SYNTHETIC,
            };
            assert_eq!(
                print_attribute(&attr, &PrintOptions::default()),
                "class=\"btn {{if active 'on'}}\""
            );
        }
    }
}
