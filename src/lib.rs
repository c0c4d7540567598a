//! Retemplate: source-to-source rewriting for Handlebars-style templates.
//!
//! Templates are parsed into a span-exact tree, rewritten by named formulas,
//! and printed back so that everything a formula did not touch comes out
//! byte for byte as it went in.
//!
//! ```
//! use retemplate::{process, RewriteOptions};
//!
//! let options = RewriteOptions::new(["convert-each-in"]);
//! let output = process("{{#each person in people}}{{person.name}}{{/each}}", &options).unwrap();
//! assert_eq!(output, "{{#each people as |person|}}{{person.name}}{{/each}}");
//! ```

pub mod error;
pub mod files;
pub mod formulas;
pub mod options;
pub mod output;
pub mod rewrite;

// Front door
pub mod cli;

pub use error::{OutputErrorCode, RewriteError};
pub use options::{QuoteOptions, RewriteOptions};
pub use retemplate_hbs::QuoteStyle;
pub use rewrite::process;
