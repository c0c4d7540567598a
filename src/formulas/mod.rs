//! Rewrite formulas and the registry that names them.
//!
//! A formula is one migration step. Most formulas are structural: they edit
//! the syntax tree in place and leave printing to the orchestrator. A splice
//! formula instead produces new text directly, replacing only the byte range
//! it matched so that everything around it survives untouched.
//!
//! | Name | Kind |
//! |------|------|
//! | `convert-bind-attr` | structural |
//! | `convert-bindings` | structural |
//! | `convert-each-in` | structural |
//! | `convert-content-modal` | splice |

use retemplate_hbs::{PrintOptions, Template};

use crate::error::RewriteError;

pub mod bind_attr;
pub mod bindings;
pub mod content_modal;
pub mod each_in;

/// Edits the tree in place.
pub type StructuralFn = fn(&mut Template) -> Result<(), RewriteError>;

/// Returns new text for the escaped `text` that `tree` was parsed from.
pub type SpliceFn = fn(&Template, &str, &PrintOptions) -> Result<String, RewriteError>;

#[derive(Debug, Clone, Copy)]
pub enum Formula {
    Structural(StructuralFn),
    Splice(SpliceFn),
}

const REGISTRY: [(&str, Formula); 4] = [
    (
        "convert-bind-attr",
        Formula::Structural(bind_attr::convert_bind_attr),
    ),
    (
        "convert-bindings",
        Formula::Structural(bindings::convert_bindings),
    ),
    (
        "convert-content-modal",
        Formula::Splice(content_modal::convert_content_modal),
    ),
    ("convert-each-in", Formula::Structural(each_in::convert_each_in)),
];

/// Find a formula by name.
pub fn lookup(name: &str) -> Option<Formula> {
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|&(_, formula)| formula)
}

/// Every registered formula name, sorted.
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|&(name, _)| name)
}
