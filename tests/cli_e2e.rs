//! CLI end-to-end tests.
//!
//! These tests spawn the actual `retemplate` binary against templates in a
//! temporary directory and validate stdout, exit codes and file contents.
//!
//! Exit code expectations:
//! - 0: Success
//! - 2: Invalid arguments (unknown formula, bad options file)
//! - 3: A template could not be parsed
//! - 4: The template path could not be read

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Run retemplate with given arguments and return (stdout, stderr, exit_code).
fn run_retemplate(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_retemplate"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute retemplate");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn json(stdout: &str) -> Value {
    serde_json::from_str(stdout).expect("stdout should be valid JSON")
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read(dir: &Path, relative: &str) -> String {
    fs::read_to_string(dir.join(relative)).unwrap()
}

// ============================================================================
// Rewrite Commands
// ============================================================================

#[test]
fn convert_each_in_rewrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "app/templates/people.hbs",
        "{{#each person in people}}{{person.name}}{{/each}}\n",
    );
    write(dir.path(), "app/templates/plain.hbs", "<p>{{title}}</p>\n");

    let (stdout, _stderr, exit_code) = run_retemplate(dir.path(), &["convert-each-in"]);
    assert_eq!(exit_code, 0, "stdout: {}", stdout);

    let json = json(&stdout);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["formulas"][0], "convert-each-in");
    assert_eq!(json["summary"]["files_scanned"], 2);
    assert_eq!(json["summary"]["files_changed"], 1);
    assert_eq!(json["files"][0]["status"], "changed");
    assert_eq!(json["files"][1]["status"], "unchanged");

    assert_eq!(
        read(dir.path(), "app/templates/people.hbs"),
        "{{#each people as |person|}}{{person.name}}{{/each}}\n"
    );
    assert_eq!(read(dir.path(), "app/templates/plain.hbs"), "<p>{{title}}</p>\n");
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = "<div {{bind-attr title=tip}}></div>\n";
    write(dir.path(), "t.hbs", source);

    let (stdout, _stderr, exit_code) =
        run_retemplate(dir.path(), &["--dry-run", "convert-bind-attr", "t.hbs"]);
    assert_eq!(exit_code, 0);

    let json = json(&stdout);
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["files"][0]["status"], "changed");
    assert_eq!(read(dir.path(), "t.hbs"), source);
}

#[test]
fn config_file_supplies_formulas_and_quotes() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "retemplate.json",
        r#"{"formulas": ["convert-bindings"], "quotes": {"mustache": "'"}}"#,
    );
    write(
        dir.path(),
        "templates/form.hbs",
        "{{input type=\"text\" valueBinding=\"name\"}}",
    );

    let (stdout, _stderr, exit_code) = run_retemplate(
        dir.path(),
        &["--config", "retemplate.json", "rewrite", "templates"],
    );
    assert_eq!(exit_code, 0, "stdout: {}", stdout);
    assert_eq!(
        read(dir.path(), "templates/form.hbs"),
        "{{input type='text' value=name}}"
    );
}

#[test]
fn quote_flag_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "opts.json", r#"{"quotes": {"mustache": "'"}}"#);
    write(dir.path(), "a.hbs", "{{t 'hello'}}");

    let (_stdout, _stderr, exit_code) = run_retemplate(
        dir.path(),
        &["--config", "opts.json", "rewrite", "a.hbs", "--double-quote-mustache"],
    );
    assert_eq!(exit_code, 0);
    assert_eq!(read(dir.path(), "a.hbs"), "{{t \"hello\"}}");
}

#[test]
fn formulas_lists_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _stderr, exit_code) = run_retemplate(dir.path(), &["formulas"]);
    assert_eq!(exit_code, 0);

    let json = json(&stdout);
    assert_eq!(json["status"], "ok");
    let names: Vec<&str> = json["formulas"]
        .as_array()
        .unwrap()
        .iter()
        .map(|name| name.as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        [
            "convert-bind-attr",
            "convert-bindings",
            "convert-content-modal",
            "convert-each-in"
        ]
    );
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn unknown_formula_in_config_returns_exit_2() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "opts.json", r#"{"formulas": ["convert-everything"]}"#);
    write(dir.path(), "a.hbs", "{{x}}");

    let (stdout, _stderr, exit_code) =
        run_retemplate(dir.path(), &["--config", "opts.json", "rewrite", "."]);
    assert_eq!(exit_code, 2);

    let json = json(&stdout);
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 2);
    assert_eq!(json["error"]["details"]["formula"], "convert-everything");
}

#[test]
fn bad_config_returns_exit_2() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "opts.json", "{ not json");

    let (stdout, _stderr, exit_code) =
        run_retemplate(dir.path(), &["--config", "opts.json", "rewrite", "."]);
    assert_eq!(exit_code, 2);
    assert_eq!(json(&stdout)["status"], "error");
}

#[test]
fn malformed_template_is_reported_and_others_still_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.hbs", "{{#if ready}}\n  <p>never closed\n");
    write(dir.path(), "b.hbs", "{{#each x in xs}}{{x}}{{/each}}");

    let (stdout, _stderr, exit_code) = run_retemplate(dir.path(), &["convert-each-in", "."]);
    assert_eq!(exit_code, 3);

    let json = json(&stdout);
    assert_eq!(json["status"], "error");
    assert_eq!(json["summary"]["files_failed"], 1);
    assert_eq!(json["files"][0]["status"], "failed");
    assert_eq!(json["files"][0]["error"]["code"], 3);
    assert!(json["files"][0]["error"]["location"]["line"].is_number());
    assert_eq!(json["files"][1]["status"], "changed");

    assert_eq!(read(dir.path(), "a.hbs"), "{{#if ready}}\n  <p>never closed\n");
    assert_eq!(read(dir.path(), "b.hbs"), "{{#each xs as |x|}}{{x}}{{/each}}");
}

#[test]
fn missing_path_returns_exit_4() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _stderr, exit_code) =
        run_retemplate(dir.path(), &["convert-bindings", "no/such/dir"]);
    assert_eq!(exit_code, 4);
    assert_eq!(json(&stdout)["error"]["code"], 4);
}
