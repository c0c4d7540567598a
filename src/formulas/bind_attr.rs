//! `convert-bind-attr`: replace `{{bind-attr}}` modifiers with attributes.
//!
//! ```text
//! <div {{bind-attr class=":static isActive:active:inactive" title=tooltip}}></div>
//! <div class="static {{if isActive 'active' 'inactive'}}" title={{tooltip}}></div>
//! ```
//!
//! Each hash pair becomes one attribute placed where the modifier was. A
//! string value names a property, so it is bound as a path. The `class` key
//! has its own micro-syntax of space-separated bindings:
//!
//! | Binding | Result |
//! |---------|--------|
//! | `:static` | `static` |
//! | `prop:yes:no` | `{{if prop 'yes' 'no'}}` |
//! | `prop:yes` | `{{if prop 'yes'}}` |
//! | `prop::no` | `{{unless prop 'no'}}` |
//! | `prop` | `{{prop}}` |
//!
//! The new attributes are shorter or longer than the modifier they replace,
//! so every span after the modifier is shifted to match.

use retemplate_core::location::{offset_for, SourceSpan};
use retemplate_hbs::{
    apply_offset, detach, print_attribute, resolve, resolve_mut, span_of, walk, AttrNode,
    AttrValue, ConcatStatement, ElementModifierStatement, Expression, Literal, LiteralValue,
    MustacheStatement, NodeMut, NodePath, NodeRef, PathExpression, PrintOptions, Statement,
    Template, TextNode, VisitResult,
};
use tracing::debug;

use crate::error::RewriteError;

const HELPER: &str = "bind-attr";

pub fn convert_bind_attr(template: &mut Template) -> Result<(), RewriteError> {
    let mut converted = 0;
    walk(template, &mut |tree: &mut Template, path: &NodePath| {
        if matches!(resolve(tree, path), Some(NodeRef::Element(_))) {
            converted += convert_element(tree, path);
        }
        VisitResult::Continue
    });
    debug!(converted, "converted bind-attr modifiers");
    Ok(())
}

fn is_bind_attr(modifier: &ElementModifierStatement) -> bool {
    modifier.name() == Some(HELPER) && !modifier.hash.is_empty()
}

/// Convert every `bind-attr` modifier on the element at `path`.
fn convert_element(tree: &mut Template, path: &NodePath) -> usize {
    let mut count = 0;
    loop {
        let Some(NodeMut::Element(element)) = resolve_mut(tree, path) else {
            break;
        };
        let Some(index) = element.modifiers.iter().position(is_bind_attr) else {
            break;
        };
        let modifier = element.modifiers.remove(index);
        let attributes = build_attributes(&modifier);

        if let Ok(inserted) = span_of(&attributes) {
            let offset = offset_for(modifier.span, inserted);
            apply_offset(tree, &offset, modifier.span.end);
        }

        if let Some(NodeMut::Element(element)) = resolve_mut(tree, path) {
            element.attributes.extend(attributes);
            // Source order, as a parse of the printed tag would give.
            element
                .attributes
                .sort_by_key(|attr| (attr.span.is_synthetic(), attr.span.start));
        }
        count += 1;
    }
    count
}

/// One attribute per hash pair, laid out from the modifier's start with a
/// single space between attributes.
fn build_attributes(modifier: &ElementModifierStatement) -> Vec<AttrNode> {
    let measure = PrintOptions::default();
    let mut position = modifier.span.start;

    modifier
        .hash
        .pairs
        .iter()
        .map(|pair| {
            let (value, quote) = attribute_value(&pair.key, &pair.value);
            let mut attr = AttrNode {
                name: pair.key.clone(),
                value: Some(value),
                quote,
                span: SourceSpan::SYNTHETIC,
            };
            if !modifier.span.is_synthetic() {
                let end = position.advance(&print_attribute(&attr, &measure));
                attr.span = SourceSpan::new(position, end);
                position = end.forward(1);
            }
            attr
        })
        .collect()
}

fn bound(path: Expression, params: Vec<Expression>) -> MustacheStatement {
    let mut mustache = MustacheStatement::synthetic(path, params);
    detach(&mut mustache);
    mustache
}

fn attribute_value(key: &str, value: &Expression) -> (AttrValue, Option<char>) {
    match value {
        Expression::Literal(Literal {
            value: LiteralValue::String(text),
            ..
        }) => {
            if key == "class" {
                return (class_value(text), Some('"'));
            }
            let property = text.trim();
            if property.is_empty() {
                return (AttrValue::Text(TextNode::synthetic("")), Some('"'));
            }
            let path = Expression::Path(PathExpression::synthetic(property));
            (AttrValue::Mustache(bound(path, Vec::new())), None)
        }
        Expression::SubExpression(sub) => {
            let mut mustache = bound(sub.path.clone(), sub.params.clone());
            mustache.hash = sub.hash.clone();
            detach(&mut mustache);
            (AttrValue::Mustache(mustache), None)
        }
        other => (AttrValue::Mustache(bound(other.clone(), Vec::new())), None),
    }
}

enum ClassBinding<'a> {
    Static(&'a str),
    Dynamic(MustacheStatement),
}

fn quoted(text: &str) -> Expression {
    Expression::Literal(Literal::synthetic(LiteralValue::String(text.to_string())))
}

fn property(name: &str) -> Expression {
    Expression::Path(PathExpression::synthetic(name))
}

fn helper(name: &str, params: Vec<Expression>) -> MustacheStatement {
    MustacheStatement::synthetic(property(name), params)
}

fn class_binding(token: &str) -> ClassBinding<'_> {
    if let Some(name) = token.strip_prefix(':') {
        return ClassBinding::Static(name);
    }
    let mut pieces = token.splitn(3, ':');
    let prop = pieces.next().unwrap_or(token);
    let binding = match (pieces.next(), pieces.next()) {
        (None | Some(""), None) | (Some(""), Some("")) => helper(prop, Vec::new()),
        (Some(""), Some(no)) => helper("unless", vec![property(prop), quoted(no)]),
        (Some(yes), None | Some("")) => helper("if", vec![property(prop), quoted(yes)]),
        (Some(yes), Some(no)) => helper("if", vec![property(prop), quoted(yes), quoted(no)]),
        (None, Some(_)) => helper(prop, Vec::new()),
    };
    ClassBinding::Dynamic(binding)
}

/// The value of a converted `class` binding: plain text when every class is
/// static, otherwise text and mustaches concatenated.
fn class_value(bindings: &str) -> AttrValue {
    let mut parts = Vec::new();
    let mut text = String::new();

    for (i, token) in bindings.split_whitespace().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        match class_binding(token) {
            ClassBinding::Static(name) => text.push_str(name),
            ClassBinding::Dynamic(mustache) => {
                if !text.is_empty() {
                    parts.push(Statement::Text(TextNode::synthetic(std::mem::take(&mut text))));
                }
                parts.push(Statement::Mustache(mustache));
            }
        }
    }

    if parts.is_empty() {
        return AttrValue::Text(TextNode::synthetic(text));
    }
    if !text.is_empty() {
        parts.push(Statement::Text(TextNode::synthetic(text)));
    }
    AttrValue::Concat(ConcatStatement {
        parts,
        span: SourceSpan::SYNTHETIC,
    })
}
