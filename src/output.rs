//! JSON output types for the CLI.
//!
//! Every command prints exactly one JSON document to stdout. Logs go to
//! stderr, so stdout can always be parsed.
//!
//! ## Design Principles
//!
//! 1. **Always JSON:** All CLI output is valid JSON (no mixed text/JSON)
//! 2. **Status first:** Every response has `status` as first field
//! 3. **Deterministic:** Same input -> same output (field order, file order)
//! 4. **Versioned:** Schema version in response enables forward compatibility

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{OutputErrorCode, RewriteError};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Common Types
// ============================================================================

/// A position in a template file.
///
/// - `file`: Path as given on the command line, joined with the walked name
/// - `line`: 1-indexed line number
/// - `col`: 0-indexed column, in characters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
        }
    }
}

/// Error information for error responses and failed files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, also used as the exit code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Where the error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ErrorInfo {
    /// Create from a RewriteError. `file` names the template being rewritten,
    /// if there is one.
    pub fn from_error(err: &RewriteError, file: Option<&str>) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let (details, location) = match (err, file) {
            (RewriteError::MalformedTemplate { line, column, .. }, Some(file)) => {
                (None, Some(Location::new(file, *line, *column)))
            }
            (RewriteError::UnknownFormula { name }, _) => {
                let known: Vec<_> = crate::formulas::names().collect();
                (
                    Some(serde_json::json!({ "formula": name, "known": known })),
                    None,
                )
            }
            (RewriteError::SpliceTargetNotFound { helper }, _) => {
                (Some(serde_json::json!({ "helper": helper })), None)
            }
            _ => (None, None),
        };

        ErrorInfo {
            code,
            message,
            details,
            location,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Error response, for failures that stop a command before any file is
/// processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a RewriteError.
    pub fn from_error(err: &RewriteError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err, None),
        }
    }
}

/// What happened to one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// The rewrite changed the text (written unless this is a dry run).
    Changed,
    /// The rewrite produced identical text.
    Unchanged,
    /// The rewrite failed; the file was left alone.
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl FileReport {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        FileReport {
            path: path.into(),
            status,
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, err: &RewriteError) -> Self {
        let path = path.into();
        let error = ErrorInfo::from_error(err, Some(&path));
        FileReport {
            path,
            status: FileStatus::Failed,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub files_scanned: u32,
    pub files_changed: u32,
    pub files_failed: u32,
}

/// Response for the rewrite commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteResponse {
    /// Status: "ok", or "error" if any file failed.
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Formulas applied, in order.
    pub formulas: Vec<String>,
    /// True when no file was written.
    pub dry_run: bool,
    /// One entry per template, sorted by path.
    pub files: Vec<FileReport>,
    pub summary: Summary,
}

impl RewriteResponse {
    pub fn new(formulas: Vec<String>, dry_run: bool, mut files: Vec<FileReport>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let mut summary = Summary {
            files_scanned: files.len() as u32,
            ..Summary::default()
        };
        for file in &files {
            match file.status {
                FileStatus::Changed => summary.files_changed += 1,
                FileStatus::Failed => summary.files_failed += 1,
                FileStatus::Unchanged => {}
            }
        }
        let status = if summary.files_failed == 0 { "ok" } else { "error" };
        RewriteResponse {
            status: status.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            formulas,
            dry_run,
            files,
            summary,
        }
    }

    /// The error code of the first failed file, if any.
    pub fn first_error_code(&self) -> Option<u8> {
        self.files
            .iter()
            .find_map(|file| file.error.as_ref().map(|error| error.code))
    }
}

/// Response for the `formulas` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulasResponse {
    pub status: String,
    pub schema_version: String,
    pub formulas: Vec<String>,
}

impl FormulasResponse {
    pub fn new(formulas: Vec<String>) -> Self {
        FormulasResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            formulas,
        }
    }
}

// ============================================================================
// Emit
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_info_tests {
        use super::*;

        #[test]
        fn malformed_template_has_location() {
            let err = RewriteError::MalformedTemplate {
                message: "unclosed mustache".to_string(),
                line: 4,
                column: 2,
            };
            let info = ErrorInfo::from_error(&err, Some("app/templates/a.hbs"));
            assert_eq!(info.code, 3);
            assert_eq!(
                info.location,
                Some(Location::new("app/templates/a.hbs", 4, 2))
            );
        }

        #[test]
        fn unknown_formula_lists_known_names() {
            let err = RewriteError::UnknownFormula {
                name: "convert-all".to_string(),
            };
            let info = ErrorInfo::from_error(&err, None);
            let details = info.details.unwrap();
            assert_eq!(details["formula"], "convert-all");
            assert_eq!(details["known"].as_array().map(Vec::len), Some(4));
        }

        #[test]
        fn absent_fields_are_skipped() {
            let info = ErrorInfo::from_error(&RewriteError::EmptyInput, None);
            let json = serde_json::to_string(&info).unwrap();
            assert!(!json.contains("details"));
            assert!(!json.contains("location"));
        }
    }

    mod response_tests {
        use super::*;

        fn reports() -> Vec<FileReport> {
            vec![
                FileReport::new("b.hbs", FileStatus::Unchanged),
                FileReport::failed(
                    "c.hbs",
                    &RewriteError::MalformedTemplate {
                        message: "x".to_string(),
                        line: 1,
                        column: 0,
                    },
                ),
                FileReport::new("a.hbs", FileStatus::Changed),
            ]
        }

        #[test]
        fn summary_and_order() {
            let response = RewriteResponse::new(vec!["convert-each-in".to_string()], false, reports());
            let paths: Vec<_> = response.files.iter().map(|f| f.path.as_str()).collect();
            assert_eq!(paths, ["a.hbs", "b.hbs", "c.hbs"]);
            assert_eq!(
                response.summary,
                Summary {
                    files_scanned: 3,
                    files_changed: 1,
                    files_failed: 1,
                }
            );
            assert_eq!(response.status, "error");
            assert_eq!(response.first_error_code(), Some(3));
        }

        #[test]
        fn status_is_the_first_field() {
            let response = RewriteResponse::new(Vec::new(), true, Vec::new());
            let mut out = Vec::new();
            emit_response(&response, &mut out).unwrap();
            let json = String::from_utf8(out).unwrap();
            assert!(json.starts_with("{\n  \"status\": \"ok\""));
            let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed["dry_run"], true);
        }

        #[test]
        fn file_status_serializes_snake_case() {
            let json = serde_json::to_string(&FileReport::new("a.hbs", FileStatus::Unchanged)).unwrap();
            assert_eq!(json, r#"{"path":"a.hbs","status":"unchanged"}"#);
        }

        #[test]
        fn error_response() {
            let response = ErrorResponse::from_error(&RewriteError::config("bad json"));
            let json = serde_json::to_value(&response).unwrap();
            assert_eq!(json["status"], "error");
            assert_eq!(json["error"]["code"], 2);
        }
    }
}
