// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Round-trip tests for the retemplate-hbs parser and printer.
//!
//! These tests verify that `print(parse(source)) == source` for templates
//! written in the default quote style, and that switching the quote style
//! and switching back again is lossless.
//!
//! To add a fixture, drop an `.hbs` file into `tests/fixtures/`; every file
//! in that directory is checked by `roundtrip_fixtures`.

use difference::assert_diff;
use itertools::Itertools;
use retemplate_hbs::{parse_template, prettify_error, print, PrintOptions, QuoteStyle, Template};
use std::path::PathBuf;

/// Helper to visualize whitespace differences in test output
fn visualize(s: &str) -> String {
    s.replace(' ', "▩").lines().join("↩\n")
}

fn all_fixtures() -> impl Iterator<Item = (PathBuf, String)> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");

    path.read_dir()
        .expect("read_dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "hbs"))
        .sorted()
        .map(|path| {
            let contents = std::fs::read_to_string(&path).expect("reading fixture");
            (path, contents)
        })
}

fn parse(source: &str, label: &str) -> Template {
    match parse_template(source) {
        Ok(template) => template,
        Err(e) => panic!("{}", prettify_error(&e, source, label)),
    }
}

fn assert_same(expected: &str, got: &str) {
    if expected != got {
        let expected = visualize(expected);
        let got = visualize(got);
        assert_diff!(expected.as_ref(), got.as_ref(), "", 0);
    }
}

fn assert_roundtrip(input: &str, label: &str) {
    let template = parse(input, label);
    let generated = print(&template, &PrintOptions::default());
    assert_same(input, &generated);
}

#[test]
fn roundtrip_fixtures() {
    let mut count = 0;
    for (path, input) in all_fixtures() {
        assert_roundtrip(&input, &format!("{:?}", path));
        count += 1;
    }
    assert!(count >= 4, "expected fixtures in tests/fixtures");
}

#[test]
fn quote_style_switch_is_reversible() {
    let single = PrintOptions {
        mustache_quote: QuoteStyle::Single,
        ..PrintOptions::default()
    };
    for (path, input) in all_fixtures() {
        let label = format!("{:?}", path);
        let flipped = print(&parse(&input, &label), &single);
        let restored = print(&parse(&flipped, &label), &PrintOptions::default());
        assert_same(&input, &restored);
    }
}

// =============================================================================
// Inline round-trip tests
// =============================================================================

#[test]
fn roundtrip_empty_template() {
    assert_roundtrip("", "empty");
}

#[test]
fn roundtrip_text_only() {
    assert_roundtrip("just some text\nacross lines\n", "text");
}

#[test]
fn roundtrip_nested_else_chains() {
    assert_roundtrip(
        "{{#if a}}\n  A\n{{else if b}}\n  B\n{{else if c}}\n  C\n{{else}}\n  D\n{{/if}}\n",
        "chains",
    );
}

#[test]
fn roundtrip_each_in() {
    assert_roundtrip(
        "{{#each person in people}}\n  {{person.name}}\n{{/each}}",
        "each-in",
    );
}

#[test]
fn roundtrip_bind_attr() {
    assert_roundtrip(
        "<div {{bind-attr class=\":static isActive:active:inactive\" title=tooltip}}></div>",
        "bind-attr",
    );
}

#[test]
fn roundtrip_multiline_block_open() {
    assert_roundtrip(
        "{{#content-modal\n  title=\"Edit\"\n  buttonLeftAction=\"cancel\"\n  as |modal|\n}}\n  body\n{{/content-modal}}\n",
        "multiline",
    );
}

#[test]
fn roundtrip_entities_and_unicode() {
    assert_roundtrip("<p>caf\u{e9}&nbsp;{{t \"d\u{e9}j\u{e0}\"}}\u{a0}&#160;</p>", "unicode");
}

#[test]
fn roundtrip_attribute_shapes() {
    assert_roundtrip(
        "<a href=\"/users/{{user.id}}/edit\" target=_blank class='x {{y}}' download>link</a>",
        "attributes",
    );
}
