//! Core infrastructure for retemplate.
//!
//! This crate holds the pieces of the rewrite engine that know nothing about
//! template syntax:
//!
//! - [`location`]: line/column positions, spans and line-scoped offsets
//! - [`text`]: conversions between byte offsets and positions
//! - [`splice`]: byte-range edits applied to source text
//! - [`whitespace`]: reversible encoding of non-breaking-space entities

pub mod location;
pub mod splice;
pub mod text;
pub mod whitespace;

pub use location::{LocationError, Offset, Position, SourceSpan};
