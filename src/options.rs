//! Rewrite options.
//!
//! Options are plain data: the ordered list of formula names to run and the
//! quote style for string literals the printer emits. They deserialize from
//! camelCase JSON so a project can keep them in a file next to its templates:
//!
//! ```json
//! { "formulas": ["convert-each-in"], "quotes": { "mustache": "'" } }
//! ```

use std::fs;
use std::path::Path;

use retemplate_hbs::{PrintOptions, QuoteStyle};
use serde::{Deserialize, Serialize};

use crate::error::RewriteError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewriteOptions {
    /// Formula names, run in order.
    pub formulas: Vec<String>,
    pub quotes: QuoteOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteOptions {
    /// Quote character for string literals inside mustaches.
    pub mustache: QuoteStyle,
}

impl RewriteOptions {
    pub fn new<I, S>(formulas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RewriteOptions {
            formulas: formulas.into_iter().map(Into::into).collect(),
            quotes: QuoteOptions::default(),
        }
    }

    pub fn with_mustache_quote(mut self, quote: QuoteStyle) -> Self {
        self.quotes.mustache = quote;
        self
    }

    /// Parse options from JSON text.
    pub fn from_json(json: &str) -> Result<Self, RewriteError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from a JSON file.
    pub fn load(path: &Path) -> Result<Self, RewriteError> {
        let json = fs::read_to_string(path).map_err(|e| {
            RewriteError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Printer settings derived from these options.
    pub fn print_options(&self) -> PrintOptions {
        PrintOptions {
            mustache_quote: self.quotes.mustache,
            compact_empty_blocks: false,
        }
    }
}
