//! `convert-content-modal`: migrate `{{#content-modal}}` to the sectioned
//! `{{#content-modal-v2 as |section|}}` API.
//!
//! The old helper took every setting on one tag and optional
//! `content-modal-header` / `-body` / `-footer` child blocks. The new one
//! yields a `section` with one contextual component per slot:
//!
//! ```text
//! {{#content-modal-v2 as |section|}}
//!     {{section.header isCloseByXorOutsideVisible=true}}
//!     {{section.body}}
//!     {{section.footer}}
//! {{/content-modal-v2}}
//! ```
//!
//! Hash keys are routed to a section by a fixed table, with unknown keys
//! staying on the outer tag. Button actions become closure actions.
//!
//! The rewrite replaces the block's own text and nothing else. Only the first
//! `content-modal` block in a template is converted; later ones are left as
//! they are and reported with a warning.

use retemplate_core::location::SourceSpan;
use retemplate_core::splice::{ByteSpan, SpliceEdit, SpliceEditor};
use retemplate_core::text::span_to_range;
use retemplate_hbs::{
    detach, inspect, print_statements, BlockStatement, Expression, Hash, Literal, LiteralValue,
    NodeRef, PrintOptions, Printer, Program, Statement, SubExpression, Template, TextNode,
    VisitResult,
};
use tracing::{debug, warn};

use crate::error::RewriteError;

const HELPER: &str = "content-modal";
const NEW_HELPER: &str = "content-modal-v2";
const OPEN: &str = "{{#content-modal";
const CLOSE: &str = "{{/content-modal}}";
const CLOSE_KEY: &str = "isCloseByXorOutsideVisible";
const SECTION_CONTEXT: &str = "sectionContext";
const CHILD_INDENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Body,
    Footer,
    /// Settings the new helper no longer needs.
    Dropped,
}

const KEY_TO_SECTION: [(&str, Section); 14] = [
    ("buttonLeftAction", Section::Footer),
    ("buttonLeftText", Section::Footer),
    ("buttonRightPrimaryAction", Section::Footer),
    ("buttonRightPrimaryText", Section::Footer),
    ("buttonRightSecondaryAction", Section::Footer),
    ("buttonRightSecondaryText", Section::Footer),
    ("buttonRightTertiaryAction", Section::Footer),
    ("buttonRightTertiaryText", Section::Footer),
    ("hasCustomBody", Section::Dropped),
    ("hasCustomFooter", Section::Dropped),
    ("hasCustomHeader", Section::Dropped),
    ("notifyCloseByX", Section::Header),
    ("subtitle", Section::Header),
    ("title", Section::Header),
];

const BLOCK_TO_SECTION: [(&str, Section); 3] = [
    ("content-modal-body", Section::Body),
    ("content-modal-footer", Section::Footer),
    ("content-modal-header", Section::Header),
];

/// Keys whose value names an action and must become `(action value)`.
const CLOSURE_ACTIONS: [&str; 4] = [
    "buttonLeftAction",
    "buttonRightPrimaryAction",
    "buttonRightSecondaryAction",
    "buttonRightTertiaryAction",
];

fn key_section(key: &str) -> Option<Section> {
    KEY_TO_SECTION
        .iter()
        .find(|(name, _)| *name == key)
        .map(|&(_, section)| section)
}

fn block_section(block: &BlockStatement) -> Option<Section> {
    let name = block.name()?;
    BLOCK_TO_SECTION
        .iter()
        .find(|(block_name, _)| *block_name == name)
        .map(|&(_, section)| section)
}

fn is_content_modal(block: &BlockStatement) -> bool {
    !block.chained && block.name() == Some(HELPER)
}

pub fn convert_content_modal(
    tree: &Template,
    text: &str,
    options: &PrintOptions,
) -> Result<String, RewriteError> {
    let mut first: Option<&BlockStatement> = None;
    let mut repeats = 0;
    inspect(tree, |node, _| {
        if let NodeRef::Block(block) = node {
            if is_content_modal(block) {
                match first {
                    None => first = Some(block),
                    Some(_) => repeats += 1,
                }
            }
        }
        VisitResult::Continue
    });

    let Some(modal) = first else {
        return Ok(text.to_string());
    };
    if repeats > 0 {
        warn!(
            skipped = repeats,
            "only the first content-modal block in a template is converted"
        );
    }

    // The new helper has nowhere to put an `{{else}}` branch.
    if modal.inverse.is_some() {
        return Err(RewriteError::SpliceTargetNotFound {
            helper: HELPER.to_string(),
        });
    }

    let range = locate(text, modal.span)?;
    let column = modal.span.start.column;
    let replacement = render(modal, column, options);
    debug!(start = range.start, end = range.end, "splicing content-modal-v2");

    let mut editor = SpliceEditor::new(text);
    editor.add(SpliceEdit::Replace {
        span: range,
        text: replacement,
    });
    Ok(editor.apply()?)
}

/// The byte range of the block's text, from `{{#content-modal` through its
/// `{{/content-modal}}`.
fn locate(text: &str, span: SourceSpan) -> Result<ByteSpan, RewriteError> {
    let not_found = || RewriteError::SpliceTargetNotFound {
        helper: HELPER.to_string(),
    };
    if span.is_synthetic() {
        return Err(not_found());
    }

    let range = span_to_range(text, &span);
    let source = text.get(range.clone()).ok_or_else(not_found)?;
    let opens_here = source
        .strip_prefix(OPEN)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|next| next.is_whitespace() || matches!(next, '}' | '~'));
    if !opens_here || !source.ends_with(CLOSE) {
        return Err(not_found());
    }
    Ok(ByteSpan::new(range.start, range.end))
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Default)]
struct Sections {
    root: Hash,
    header: Hash,
    body: Hash,
    footer: Hash,
    header_text: String,
    body_text: Option<String>,
    footer_text: String,
}

impl Sections {
    fn hash_mut(&mut self, section: Section) -> Option<&mut Hash> {
        match section {
            Section::Header => Some(&mut self.header),
            Section::Body => Some(&mut self.body),
            Section::Footer => Some(&mut self.footer),
            Section::Dropped => None,
        }
    }
}

fn detached(value: &Expression) -> Expression {
    let mut value = value.clone();
    detach(&mut value);
    value
}

fn route_hash(modal: &BlockStatement, sections: &mut Sections) {
    for pair in &modal.hash.pairs {
        let mut value = detached(&pair.value);
        if CLOSURE_ACTIONS.contains(&pair.key.as_str()) {
            value = Expression::SubExpression(Box::new(SubExpression::synthetic(
                "action",
                vec![value],
            )));
        }
        match key_section(&pair.key) {
            Some(section) => {
                if let Some(hash) = sections.hash_mut(section) {
                    hash.insert(&pair.key, value);
                }
            }
            None => sections.root.insert(&pair.key, value),
        }
    }

    let closes_by_default = !matches!(
        sections.root.get(CLOSE_KEY),
        Some(Expression::Literal(Literal {
            value: LiteralValue::Boolean(false),
            ..
        }))
    );
    if closes_by_default {
        sections.header.insert(
            CLOSE_KEY,
            Expression::Literal(Literal::synthetic(LiteralValue::Boolean(true))),
        );
    }
}

fn route_children(modal: &BlockStatement, sections: &mut Sections, options: &PrintOptions) {
    let mut rest = Vec::new();
    for child in &modal.program.body {
        let section = match child {
            Statement::Block(block) => block_section(block).map(|section| (block, section)),
            _ => None,
        };
        let Some((block, section)) = section else {
            rest.push(child.clone());
            continue;
        };

        let body = print_statements(&block.program.body, options)
            .trim()
            .to_string();
        match section {
            Section::Header => sections.header_text = body,
            Section::Body => sections.body_text = Some(body),
            Section::Footer => sections.footer_text = body,
            Section::Dropped => {}
        }
        if let Some(hash) = sections.hash_mut(section) {
            for pair in &block.hash.pairs {
                if pair.key != SECTION_CONTEXT {
                    hash.insert(&pair.key, detached(&pair.value));
                }
            }
        }
    }

    if sections.body_text.is_none() {
        sections.body_text = Some(print_statements(&rest, options).trim().to_string());
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// `{{#name hash}}body\n{indent}{{/name}}`, or `{{name hash}}` when empty.
fn section_block(name: &str, hash: Hash, body: &str, indent: &str) -> Statement {
    let program = if body.is_empty() {
        Program::synthetic(Vec::new())
    } else {
        Program::synthetic(vec![Statement::Text(TextNode::synthetic(format!(
            "{}\n{}",
            body, indent
        )))])
    };
    Statement::Block(Box::new(BlockStatement::synthetic(name, hash, program)))
}

fn render(modal: &BlockStatement, column: u32, options: &PrintOptions) -> String {
    let mut sections = Sections::default();
    route_hash(modal, &mut sections);
    route_children(modal, &mut sections, options);

    let indent = " ".repeat(column as usize);
    let child_indent = " ".repeat(column as usize + CHILD_INDENT);
    let line = |indent: &str| Statement::Text(TextNode::synthetic(format!("\n{}", indent)));

    let body_text = sections.body_text.take().unwrap_or_default();
    let body = vec![
        line(&child_indent),
        section_block(
            "section.header",
            sections.header,
            &sections.header_text,
            &child_indent,
        ),
        line(&child_indent),
        section_block("section.body", sections.body, &body_text, &child_indent),
        line(&child_indent),
        section_block(
            "section.footer",
            sections.footer,
            &sections.footer_text,
            &child_indent,
        ),
        line(&indent),
    ];

    let mut program = Program::synthetic(body);
    program.block_params = vec!["section".to_string()];
    let block = BlockStatement::synthetic(NEW_HELPER, sections.root, program);

    let options = PrintOptions {
        compact_empty_blocks: true,
        ..*options
    };
    let mut printer = Printer::new(options).with_column(column);
    printer.print_statement(&Statement::Block(Box::new(block)));
    printer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use retemplate_hbs::parse_template;

    fn convert(source: &str) -> String {
        let tree = parse_template(source).unwrap();
        convert_content_modal(&tree, source, &PrintOptions::default()).unwrap()
    }

    #[test]
    fn empty_modal() {
        assert_eq!(
            convert("{{#content-modal}}{{/content-modal}}"),
            "{{#content-modal-v2 as |section|}}\n    {{section.header isCloseByXorOutsideVisible=true}}\n    {{section.body}}\n    {{section.footer}}\n{{/content-modal-v2}}"
        );
    }

    #[test]
    fn routes_keys_to_sections() {
        assert_eq!(
            convert(
                "{{#content-modal buttonLeftAction=\"leftAction\" title=\"title\" isCloseByXorOutsideVisible=false}}{{/content-modal}}"
            ),
            "{{#content-modal-v2 isCloseByXorOutsideVisible=false as |section|}}\n    {{section.header title=\"title\"}}\n    {{section.body}}\n    {{section.footer buttonLeftAction=(action \"leftAction\")}}\n{{/content-modal-v2}}"
        );
    }

    #[test]
    fn body_without_section_blocks() {
        let source = "{{#content-modal title=t}}\n  <p>Hi {{name}}</p>\n{{/content-modal}}";
        assert_eq!(
            convert(source),
            "{{#content-modal-v2 as |section|}}\n    {{section.header title=t isCloseByXorOutsideVisible=true}}\n    {{#section.body}}<p>Hi {{name}}</p>\n    {{/section.body}}\n    {{section.footer}}\n{{/content-modal-v2}}"
        );
    }

    #[test]
    fn nested_section_blocks_and_indent() {
        let source = "<div>\n  {{#content-modal title=\"Edit\" buttonLeftText=\"Cancel\" buttonLeftAction=\"cancel\" buttonRightPrimaryText=\"Save\" buttonRightPrimaryAction=\"save\" hasCustomBody=true}}\n    {{#content-modal-header sectionContext=this class=\"hd\"}}\n      <h2>Header</h2>\n    {{/content-modal-header}}\n    {{#content-modal-body}}\n      <p>Body</p>\n    {{/content-modal-body}}\n  {{/content-modal}}\n</div>\n";
        let expected = "<div>\n  {{#content-modal-v2 as |section|}}\n      {{#section.header\n          title=\"Edit\"\n          isCloseByXorOutsideVisible=true\n          class=\"hd\"}}<h2>Header</h2>\n      {{/section.header}}\n      {{#section.body}}<p>Body</p>\n      {{/section.body}}\n      {{section.footer\n          buttonLeftText=\"Cancel\"\n          buttonLeftAction=(action \"cancel\")\n          buttonRightPrimaryText=\"Save\"\n          buttonRightPrimaryAction=(action \"save\")}}\n  {{/content-modal-v2}}\n</div>\n";
        assert_eq!(convert(source), expected);
    }

    #[test]
    fn unknown_keys_stay_on_the_outer_tag() {
        assert_eq!(
            convert("{{#content-modal size=\"lg\" onClose=(action \"close\")}}{{/content-modal}}"),
            "{{#content-modal-v2 size=\"lg\" onClose=(action \"close\") as |section|}}\n    {{section.header isCloseByXorOutsideVisible=true}}\n    {{section.body}}\n    {{section.footer}}\n{{/content-modal-v2}}"
        );
    }

    #[test]
    fn text_outside_the_block_is_untouched() {
        let before = "<p>&nbsp;keep  this</p>\n<b>";
        let after = "</b>\n{{other \"x\"}}  \n";
        let source = format!("{}{{{{#content-modal}}}}{{{{/content-modal}}}}{}", before, after);
        let output = convert(&source);
        assert!(output.starts_with(before));
        assert!(output.ends_with(after));
    }

    #[test]
    fn only_the_first_block_is_converted() {
        let second = "{{#content-modal title=\"b\"}}{{/content-modal}}";
        let source = format!("{{{{#content-modal}}}}{{{{/content-modal}}}}\n{}", second);
        let output = convert(&source);
        assert!(output.starts_with("{{#content-modal-v2 as |section|}}"));
        assert!(output.ends_with(&format!("{{{{/content-modal-v2}}}}\n{}", second)));
    }

    #[test]
    fn converted_blocks_are_ignored() {
        let source = "{{#content-modal-v2 as |section|}}{{section.body}}{{/content-modal-v2}}";
        assert_eq!(convert(source), source);
    }

    #[test]
    fn no_match_is_a_no_op() {
        let source = "<div>{{#if a}}b{{/if}}</div>";
        assert_eq!(convert(source), source);
    }

    #[test]
    fn else_branch_is_rejected() {
        let source = "{{#content-modal}}a{{else}}b{{/content-modal}}";
        let tree = parse_template(source).unwrap();
        let err = convert_content_modal(&tree, source, &PrintOptions::default()).unwrap_err();
        assert!(matches!(err, RewriteError::SpliceTargetNotFound { .. }));
    }

    #[test]
    fn whitespace_controlled_close_is_rejected() {
        let source = "{{#content-modal}}{{~/content-modal}}";
        let tree = parse_template(source).unwrap();
        let err = convert_content_modal(&tree, source, &PrintOptions::default()).unwrap_err();
        assert!(matches!(err, RewriteError::SpliceTargetNotFound { .. }));
    }
}
