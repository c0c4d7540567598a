//! Golden tests for formula output.
//!
//! Each directory under `tests/golden/fixtures/` is named after a formula.
//! Every `<name>.hbs` in it is rewritten with that formula and compared
//! against `<name>.expected.hbs`.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test golden
//! ```
//!
//! ## Updating Golden Files
//!
//! When making intentional output changes:
//! ```bash
//! RETEMPLATE_UPDATE_GOLDEN=1 cargo test golden
//! git diff tests/golden/  # Review changes
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use difference::assert_diff;
use itertools::Itertools;
use retemplate::formulas::{self, Formula};
use retemplate::{process, RewriteOptions};

// ============================================================================
// Test Infrastructure
// ============================================================================

const EXPECTED_SUFFIX: &str = ".expected.hbs";

/// Directory containing golden test fixtures.
fn golden_fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("golden")
        .join("fixtures")
}

/// Check if golden update mode is enabled.
fn update_mode() -> bool {
    std::env::var("RETEMPLATE_UPDATE_GOLDEN").is_ok()
}

/// Helper to visualize whitespace differences in test output
fn visualize(s: &str) -> String {
    s.replace(' ', "▩").lines().join("↩\n")
}

/// Input fixtures in `dir`, sorted.
fn inputs(dir: &Path) -> Vec<PathBuf> {
    dir.read_dir()
        .expect("read_dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| {
            let name = path.to_string_lossy();
            name.ends_with(".hbs") && !name.ends_with(EXPECTED_SUFFIX)
        })
        .sorted()
        .collect()
}

fn expected_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .expect("fixture name")
        .to_string_lossy()
        .to_string();
    input.with_file_name(format!("{}{}", stem, EXPECTED_SUFFIX))
}

fn rewrite(formula: &str, source: &str, label: &str) -> String {
    match process(source, &RewriteOptions::new([formula])) {
        Ok(output) => output,
        Err(e) => panic!("{}: {}", label, e),
    }
}

fn check_fixture(formula: &str, input: &Path) {
    let label = input.display().to_string();
    let source = fs::read_to_string(input).expect("reading fixture");
    let actual = rewrite(formula, &source, &label);

    let expected_file = expected_path(input);
    if update_mode() {
        fs::write(&expected_file, &actual).expect("writing golden file");
        return;
    }
    let expected = fs::read_to_string(&expected_file)
        .unwrap_or_else(|_| panic!("missing golden file for {}", label));
    if expected != actual {
        let expected = visualize(&expected);
        let actual = visualize(&actual);
        assert_diff!(expected.as_ref(), actual.as_ref(), "", 0);
    }

    // Tree formulas leave nothing behind for a second run to change.
    if matches!(formulas::lookup(formula), Some(Formula::Structural(_))) {
        assert_eq!(rewrite(formula, &actual, &label), actual, "{} rerun", label);
    }
}

// ============================================================================
// Golden Tests
// ============================================================================

#[test]
fn golden_fixtures() {
    let dirs: Vec<PathBuf> = golden_fixtures_dir()
        .read_dir()
        .expect("read_dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.is_dir())
        .sorted()
        .collect();
    assert!(!dirs.is_empty(), "no golden fixtures found");

    for dir in dirs {
        let formula = dir
            .file_name()
            .expect("directory name")
            .to_string_lossy()
            .to_string();
        assert!(
            formulas::lookup(&formula).is_some(),
            "fixture directory {} does not name a formula",
            formula
        );
        for input in inputs(&dir) {
            check_fixture(&formula, &input);
        }
    }
}

#[test]
fn every_formula_has_fixtures() {
    for name in formulas::names() {
        let dir = golden_fixtures_dir().join(name);
        assert!(!inputs(&dir).is_empty(), "no fixtures for {}", name);
    }
}
