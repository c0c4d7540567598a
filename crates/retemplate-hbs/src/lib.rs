// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A Handlebars/Glimmer template parser, walker and printer.
//!
//! This crate parses `.hbs` templates into a span-exact syntax tree, walks
//! and edits that tree, and prints it back to text.
//!
//! # Overview
//!
//! - **Parsing**: [`parse_template`] produces a [`Template`] in which every
//!   node carries its source span and text is kept verbatim.
//! - **Walking**: [`walk`] visits every node in document order and tolerates
//!   edits to the tree while it runs; [`inspect`] is the read-only form.
//! - **Locations**: [`span_of`] and [`apply_offset`] keep spans accurate
//!   after a rewrite changes the length of some text.
//! - **Printing**: [`print`] rebuilds text from the tree, reproducing the
//!   source layout wherever spans are real.
//!
//! # Quick Start
//!
//! ```
//! use retemplate_hbs::{parse_template, print, PrintOptions};
//!
//! let source = "{{#each people as |person|}}{{person.name}}{{/each}}";
//! let template = parse_template(source).expect("parse error");
//! assert_eq!(print(&template, &PrintOptions::default()), source);
//! ```

use retemplate_core::text::line_start_offset;

pub mod location;
pub mod nodes;
pub mod parser;
pub mod printer;
mod tokenizer;
pub mod walker;

pub use location::{apply_offset, detach, span_of, SpansMut};
pub use nodes::*;
pub use parser::{parse_template, ParserError};
pub use printer::{print, print_attribute, print_statements, PrintOptions, Printer, QuoteStyle};
pub use walker::{inspect, resolve, resolve_mut, walk, NodeMut, NodePath, NodeRef, Step, VisitResult, Visitor};

/// Formats a parser error with the surrounding source lines.
///
/// # Arguments
///
/// * `err` - The parser error to format.
/// * `source` - The text that was parsed.
/// * `label` - A label for the error (e.g., file name).
pub fn prettify_error(err: &ParserError, source: &str, label: &str) -> String {
    use annotate_snippets::{Level, Renderer, Snippet};

    let context = 1;
    let line = err.position.line.max(1);
    let line_start = line.saturating_sub(context).max(1);
    let start_offset = line_start_offset(source, line_start).unwrap_or(0);
    let end_offset = line_start_offset(source, line + context + 1).unwrap_or(source.len());
    let snippet = &source[start_offset..end_offset];

    let start = err.offset.clamp(start_offset, end_offset) - start_offset;
    let end = start + snippet[start..].chars().next().map_or(1, char::len_utf8);

    Renderer::plain()
        .render(
            Level::Error.title(label).snippet(
                Snippet::source(snippet)
                    .line_start(line_start as usize)
                    .fold(false)
                    .annotations(vec![Level::Error.span(start..end).label(&err.message)]),
            ),
        )
        .to_string()
}
