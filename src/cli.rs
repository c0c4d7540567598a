//! CLI front door: rewrite template files in place.
//!
//! [`run_rewrite`] applies one set of [`RewriteOptions`] to every template
//! under a path. Each file is its own error boundary: a template that fails
//! to parse or rewrite is reported and left untouched, and the run moves on
//! to the next file.
//!
//! Files are only written when the rewritten text differs from what is on
//! disk, and never in a dry run.

use std::fs;
use std::path::Path;

use tracing::{debug, error, info};

use crate::error::RewriteError;
use crate::files::collect_templates;
use crate::formulas;
use crate::options::RewriteOptions;
use crate::output::{FileReport, FileStatus, RewriteResponse};
use crate::rewrite::process;

/// Rewrite every template under `root`.
///
/// # Errors
///
/// Only for failures that stop the run before any file is touched: an
/// unknown formula name, or a `root` that cannot be walked. Per-file
/// failures are recorded in the response instead.
pub fn run_rewrite(
    root: &Path,
    options: &RewriteOptions,
    dry_run: bool,
) -> Result<RewriteResponse, RewriteError> {
    if let Some(name) = options
        .formulas
        .iter()
        .find(|name| formulas::lookup(name).is_none())
    {
        return Err(RewriteError::UnknownFormula { name: name.clone() });
    }

    let templates = collect_templates(root)?;
    info!(count = templates.len(), root = %root.display(), "rewriting templates");

    let reports = templates
        .iter()
        .map(|path| {
            let file = path.display().to_string();
            match rewrite_file(path, options, dry_run) {
                Ok(status) => FileReport::new(file, status),
                Err(err) => {
                    error!(file = %file, %err, "rewrite failed");
                    FileReport::failed(file, &err)
                }
            }
        })
        .collect();

    Ok(RewriteResponse::new(
        options.formulas.clone(),
        dry_run,
        reports,
    ))
}

/// Rewrite one template.
pub fn rewrite_file(
    path: &Path,
    options: &RewriteOptions,
    dry_run: bool,
) -> Result<FileStatus, RewriteError> {
    let source = fs::read_to_string(path)?;
    let output = process(&source, options)?;

    if output == source {
        debug!(file = %path.display(), "unchanged");
        return Ok(FileStatus::Unchanged);
    }
    if dry_run {
        info!(file = %path.display(), "would change");
    } else {
        fs::write(path, &output)?;
        info!(file = %path.display(), "changed");
    }
    Ok(FileStatus::Changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_formula_stops_before_walking() {
        let options = RewriteOptions::new(["convert-nothing"]);
        let err = run_rewrite(Path::new("/definitely/not/here"), &options, true).unwrap_err();
        assert!(matches!(err, RewriteError::UnknownFormula { .. }));
    }

    #[test]
    fn failed_file_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.hbs"), "{{#if ready}}").unwrap();
        fs::write(dir.path().join("b.hbs"), "{{#each x in xs}}{{x}}{{/each}}").unwrap();

        let options = RewriteOptions::new(["convert-each-in"]);
        let response = run_rewrite(dir.path(), &options, false).unwrap();
        assert_eq!(response.status, "error");
        assert_eq!(response.files[0].status, FileStatus::Failed);
        assert!(response.files[0].path.ends_with("a.hbs"));
        assert_eq!(response.files[1].status, FileStatus::Changed);
        assert_eq!(response.first_error_code(), Some(3));
    }

    #[test]
    fn dry_run_leaves_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.hbs");
        let source = "{{#each x in xs}}{{x}}{{/each}}";
        fs::write(&file, source).unwrap();

        let options = RewriteOptions::new(["convert-each-in"]);
        let status = rewrite_file(&file, &options, true).unwrap();
        assert_eq!(status, FileStatus::Changed);
        assert_eq!(fs::read_to_string(&file).unwrap(), source);

        let status = rewrite_file(&file, &options, false).unwrap();
        assert_eq!(status, FileStatus::Changed);
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "{{#each xs as |x|}}{{x}}{{/each}}"
        );
        assert_eq!(
            rewrite_file(&file, &options, false).unwrap(),
            FileStatus::Unchanged
        );
    }
}
