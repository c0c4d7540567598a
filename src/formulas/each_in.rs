//! `convert-each-in`: `{{#each item in items}}` becomes
//! `{{#each items as |item|}}`.
//!
//! The `item in ` text is deleted from the open tag, so every span from the
//! item onwards moves left by that much before the two params are dropped.
//! The `as |item|` the printer adds after the last argument moves them right
//! again, which keeps every span equal to what a fresh parse of the printed
//! text would give.

use std::iter;

use retemplate_core::location::{offset_for, Position, SourceSpan};
use retemplate_hbs::{
    apply_offset, resolve, resolve_mut, walk, BlockStatement, Expression, NodeMut, NodePath,
    NodeRef, Spanned, Template, VisitResult,
};
use tracing::debug;

use crate::error::RewriteError;

pub fn convert_each_in(template: &mut Template) -> Result<(), RewriteError> {
    let mut converted = 0;
    walk(template, &mut |tree: &mut Template, path: &NodePath| {
        let target = match resolve(tree, path) {
            Some(NodeRef::Block(block)) => each_in_target(block),
            _ => None,
        };
        if let Some(target) = target {
            convert_block(tree, path, target);
            converted += 1;
        }
        VisitResult::Continue
    });
    debug!(converted, "converted each-in blocks");
    Ok(())
}

struct EachIn {
    item: String,
    /// From the item's start to the collection's start.
    removed: SourceSpan,
}

fn each_in_target(block: &BlockStatement) -> Option<EachIn> {
    if block.chained || block.path.head() != Some("each") {
        return None;
    }
    if !block.program.block_params.is_empty() {
        return None;
    }
    let [Expression::Path(item), Expression::Path(separator), collection, ..] =
        block.params.as_slice()
    else {
        return None;
    };
    if separator.original != "in" || item.parts.len() != 1 || item.this || item.data {
        return None;
    }

    let removed = if item.span.is_synthetic() || collection.span().is_synthetic() {
        SourceSpan::SYNTHETIC
    } else {
        SourceSpan::new(item.span.start, collection.span().start)
    };
    Some(EachIn {
        item: item.original.clone(),
        removed,
    })
}

fn convert_block(tree: &mut Template, path: &NodePath, target: EachIn) {
    let positioned = !target.removed.is_synthetic();
    if positioned {
        let start = target.removed.start;
        let offset = offset_for(target.removed, SourceSpan::point(start));
        apply_offset(tree, &offset, start);
    }

    let Some(NodeMut::Block(block)) = resolve_mut(tree, path) else {
        return;
    };
    block.params.drain(..2);
    let tail = open_tag_tail(block).filter(|_| positioned);
    let written = format!("as |{}|", target.item);
    block.program.block_params = vec![target.item];
    block.program.block_params_span = SourceSpan::SYNTHETIC;

    // The printer puts the block params one space after the last argument.
    let Some(tail) = tail else {
        return;
    };
    let start = tail.forward(1);
    let params_span = SourceSpan::new(start, start.advance(&written));
    let offset = offset_for(SourceSpan::point(tail), SourceSpan::new(tail, params_span.end));
    apply_offset(tree, &offset, tail);
    if let Some(NodeMut::Block(block)) = resolve_mut(tree, path) {
        block.program.block_params_span = params_span;
    }
}

/// End of the last positioned argument in the open tag.
fn open_tag_tail(block: &BlockStatement) -> Option<Position> {
    let parts = iter::once(block.path.span())
        .chain(block.params.iter().map(Spanned::span))
        .chain(block.hash.pairs.iter().map(|pair| pair.span));
    SourceSpan::covering(parts).ok().map(|span| span.end)
}
