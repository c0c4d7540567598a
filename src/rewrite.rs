//! The rewrite orchestrator.
//!
//! [`process`] takes template text and an ordered list of formula names and
//! returns the rewritten text:
//!
//! 1. Resolve every name, failing before any work on an unknown one.
//! 2. Escape non-breaking-space spellings and parse.
//! 3. Run the formulas in order. Structural formulas share one tree. A splice
//!    formula works on text, so pending tree edits are printed (and the
//!    result reparsed) before it runs.
//! 4. Print the tree if it holds the latest edits, otherwise keep the spliced
//!    text as it is. Restore the escaped spellings.
//!
//! With no formulas the template is printed unchanged, apart from the
//! configured mustache quote style.

use retemplate_core::whitespace;
use retemplate_hbs::{parse_template, print, Template};
use tracing::debug;

use crate::error::RewriteError;
use crate::formulas::{self, Formula};
use crate::options::RewriteOptions;

/// Rewrite `template` with the formulas named in `options`.
///
/// # Errors
///
/// - `RewriteError::UnknownFormula` if a name is not registered
/// - `RewriteError::MalformedTemplate` if the text cannot be parsed, before or
///   after a splice
/// - splice failures from splice formulas
pub fn process(template: &str, options: &RewriteOptions) -> Result<String, RewriteError> {
    let formulas = resolve(&options.formulas)?;
    let print_options = options.print_options();

    let mut text = whitespace::escape(template);
    let mut state = State::Tree {
        tree: parse_template(&text)?,
        edited: false,
    };

    for (name, formula) in formulas {
        debug!(formula = name, "applying formula");
        state = match formula {
            Formula::Structural(apply) => {
                let mut tree = state.into_tree(&text)?;
                apply(&mut tree)?;
                State::Tree { tree, edited: true }
            }
            Formula::Splice(apply) => {
                let tree = match state {
                    State::Tree { tree, edited: true } => {
                        text = print(&tree, &print_options);
                        parse_template(&text)?
                    }
                    state => state.into_tree(&text)?,
                };
                text = apply(&tree, &text, &print_options)?;
                State::Text
            }
        };
    }

    let output = match state {
        State::Tree { tree, .. } => print(&tree, &print_options),
        State::Text => text,
    };
    Ok(whitespace::unescape(&output))
}

fn resolve(names: &[String]) -> Result<Vec<(&str, Formula)>, RewriteError> {
    names
        .iter()
        .map(|name| {
            formulas::lookup(name)
                .map(|formula| (name.as_str(), formula))
                .ok_or_else(|| RewriteError::UnknownFormula { name: name.clone() })
        })
        .collect()
}

/// Which representation holds the latest edits.
enum State {
    /// `edited` is set once a structural formula has changed the tree, so
    /// the text no longer matches it.
    Tree { tree: Template, edited: bool },
    /// A splice produced the text; there is no tree for it yet.
    Text,
}

impl State {
    fn into_tree(self, text: &str) -> Result<Template, RewriteError> {
        match self {
            State::Tree { tree, .. } => Ok(tree),
            State::Text => Ok(parse_template(text)?),
        }
    }
}
