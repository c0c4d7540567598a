//! `convert-bindings`: drop the `Binding` suffix from hash keys.
//!
//! `{{input valueBinding="model.name"}}` becomes `{{input value=model.name}}`.
//! A string value named the bound property, so it turns into a path. Any
//! other value, and an empty string, is kept as it is.
//!
//! Every hash is visited: mustaches, blocks, element modifiers and
//! sub-expressions alike. Each rename shortens the text, so the spans after
//! the dropped suffix and the dropped quotes are shifted to match.

use retemplate_core::location::{offset_for, SourceSpan};
use retemplate_hbs::{
    apply_offset, resolve, resolve_mut, walk, Expression, HashPair, Literal, LiteralValue,
    NodeMut, NodePath, NodeRef, PathExpression, Spanned, Template, VisitResult,
};
use tracing::{debug, warn};

use crate::error::RewriteError;

const SUFFIX: &str = "Binding";

pub fn convert_bindings(template: &mut Template) -> Result<(), RewriteError> {
    let mut converted = 0;
    walk(template, &mut |tree: &mut Template, path: &NodePath| {
        let pairs = match resolve(tree, path) {
            Some(NodeRef::Hash(hash)) => hash.pairs.len(),
            _ => 0,
        };
        for index in 0..pairs {
            if convert_pair(tree, path, index) {
                converted += 1;
            }
        }
        VisitResult::Continue
    });
    debug!(converted, "converted bindings");
    Ok(())
}

/// What a rename of one pair needs to know before the tree is touched.
struct Rename {
    key: String,
    pair: SourceSpan,
    property: Option<String>,
}

fn rename_for(tree: &Template, path: &NodePath, index: usize) -> Option<Rename> {
    let Some(NodeRef::Hash(hash)) = resolve(tree, path) else {
        return None;
    };
    let pair = hash.pairs.get(index)?;
    let key = pair.key.strip_suffix(SUFFIX)?;
    if key.is_empty() {
        return None;
    }
    if hash.get(key).is_some() {
        warn!(key, "leaving binding in place; the hash already has this key");
        return None;
    }
    let property = match &pair.value {
        Expression::Literal(Literal {
            value: LiteralValue::String(property),
            ..
        }) if !property.is_empty() => Some(property.clone()),
        _ => None,
    };
    Some(Rename {
        key: key.to_string(),
        pair: pair.span,
        property,
    })
}

fn convert_pair(tree: &mut Template, path: &NodePath, index: usize) -> bool {
    let Some(rename) = rename_for(tree, path, index) else {
        return false;
    };
    let positioned = !rename.pair.is_synthetic();

    // The suffix sits right before the `=`.
    if positioned {
        let key_end = rename.pair.start.forward(rename.key.chars().count() as u32);
        let removed = SourceSpan::new(key_end, key_end.forward(SUFFIX.len() as u32));
        apply_offset(tree, &offset_for(removed, SourceSpan::point(key_end)), key_end);
    }

    let Some(pair) = pair_mut(tree, path, index) else {
        return false;
    };
    pair.key = rename.key;
    let Some(property) = rename.property else {
        return true;
    };

    // A quoted property becomes a bare path, shorter by its quotes. The
    // offset runs from the literal's start so the pair and hash that end
    // with it are stretched too.
    let literal = pair.value.span();
    if !positioned || literal.is_synthetic() {
        pair.value = Expression::Path(PathExpression::new(&property, SourceSpan::SYNTHETIC));
        return true;
    }
    let written = SourceSpan::new(literal.start, literal.start.advance(&property));
    apply_offset(tree, &offset_for(literal, written), literal.start);
    if let Some(pair) = pair_mut(tree, path, index) {
        pair.value = Expression::Path(PathExpression::new(&property, written));
    }
    true
}

fn pair_mut<'a>(tree: &'a mut Template, path: &NodePath, index: usize) -> Option<&'a mut HashPair> {
    match resolve_mut(tree, path) {
        Some(NodeMut::Hash(hash)) => hash.pairs.get_mut(index),
        _ => None,
    }
}
