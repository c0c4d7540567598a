//! Template file discovery.
//!
//! A path on the command line names either one template or a directory to
//! search. Directories are walked for `.hbs` files, skipping hidden
//! directories and build or dependency output.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::RewriteError;

/// Extension of the templates the rewriter touches.
pub const TEMPLATE_EXTENSION: &str = "hbs";

/// Directory names never searched.
const EXCLUDED_DIRS: [&str; 3] = ["node_modules", "tmp", "dist"];

fn is_excluded(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref())
}

fn is_template(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION)
}

/// Collect the templates under `root`, sorted by path.
///
/// A file is returned as is, whatever its extension.
///
/// # Errors
///
/// `RewriteError::Io` if `root` does not exist or cannot be read.
pub fn collect_templates(root: &Path) -> Result<Vec<PathBuf>, RewriteError> {
    if !root.exists() {
        return Err(RewriteError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", root.display()),
        )));
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut templates = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry))
    {
        let entry = entry.map_err(|e| RewriteError::Io(e.into()))?;
        if entry.file_type().is_file() && is_template(entry.path()) {
            templates.push(entry.into_path());
        }
    }

    templates.sort();
    Ok(templates)
}
