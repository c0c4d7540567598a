//! Error types and error code constants for retemplate.
//!
//! [`RewriteError`] is the single error type returned by the rewrite entry
//! points and rendered by the CLI. Errors from the core and syntax crates are
//! bridged into it with `From` impls so `?` works throughout.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (unknown formula, bad configuration)
//! - `3`: Malformed template (the input could not be parsed)
//! - `4`: Apply errors (reading or writing template files)
//! - `10`: Internal errors (a rewrite produced inconsistent state)

use std::fmt;
use std::io;

use retemplate_core::location::LocationError;
use retemplate_core::splice::SpliceError;
use retemplate_hbs::ParserError;
use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output; also the CLI exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (unknown formula, malformed config).
    InvalidArguments = 2,
    /// The template could not be parsed.
    MalformedTemplate = 3,
    /// Reading or writing a template failed.
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum RewriteError {
    /// A requested formula name is not registered.
    #[error("unknown formula '{name}'")]
    UnknownFormula { name: String },

    /// The template could not be parsed.
    #[error("malformed template: {message} at {line}:{column}")]
    MalformedTemplate {
        message: String,
        line: u32,
        column: u32,
    },

    /// A span was requested for an empty node list.
    #[error("cannot compute a span for an empty node list")]
    EmptyInput,

    /// A text splice could not be applied.
    #[error("splice failed: {0}")]
    Splice(#[from] SpliceError),

    /// The helper a splice formula matched could not be located in the text.
    #[error("could not locate '{helper}' in the template text")]
    SpliceTargetNotFound { helper: String },

    /// The options file could not be read or parsed.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// Reading or writing a template failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl RewriteError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        RewriteError::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&RewriteError> for OutputErrorCode {
    fn from(err: &RewriteError) -> Self {
        match err {
            RewriteError::UnknownFormula { .. } => OutputErrorCode::InvalidArguments,
            RewriteError::Config { .. } => OutputErrorCode::InvalidArguments,
            RewriteError::MalformedTemplate { .. } => OutputErrorCode::MalformedTemplate,
            RewriteError::Io(_) => OutputErrorCode::ApplyError,
            RewriteError::EmptyInput => OutputErrorCode::InternalError,
            RewriteError::Splice(_) => OutputErrorCode::InternalError,
            RewriteError::SpliceTargetNotFound { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<RewriteError> for OutputErrorCode {
    fn from(err: RewriteError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<ParserError> for RewriteError {
    fn from(err: ParserError) -> Self {
        RewriteError::MalformedTemplate {
            message: err.message,
            line: err.position.line,
            column: err.position.column,
        }
    }
}

impl From<LocationError> for RewriteError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::EmptyInput => RewriteError::EmptyInput,
        }
    }
}

impl From<serde_json::Error> for RewriteError {
    fn from(err: serde_json::Error) -> Self {
        RewriteError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retemplate_core::location::Position;

    #[test]
    fn codes() {
        let cases = [
            (
                RewriteError::UnknownFormula {
                    name: "nope".to_string(),
                },
                2,
            ),
            (RewriteError::config("bad"), 2),
            (
                RewriteError::MalformedTemplate {
                    message: "x".to_string(),
                    line: 1,
                    column: 0,
                },
                3,
            ),
            (RewriteError::Io(io::Error::other("disk")), 4),
            (RewriteError::EmptyInput, 10),
            (
                RewriteError::SpliceTargetNotFound {
                    helper: "content-modal".to_string(),
                },
                10,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(OutputErrorCode::from(&err).code(), code, "{}", err);
        }
    }

    #[test]
    fn parser_error_keeps_position() {
        let err = RewriteError::from(ParserError {
            message: "unclosed block `{{#if}}`".to_string(),
            position: Position::new(3, 4),
            offset: 20,
        });
        assert_eq!(
            err.to_string(),
            "malformed template: unclosed block `{{#if}}` at 3:4"
        );
    }

    #[test]
    fn display_unknown_formula() {
        let err = RewriteError::UnknownFormula {
            name: "convert-everything".to_string(),
        };
        assert_eq!(err.to_string(), "unknown formula 'convert-everything'");
    }
}
