//! Error types for changedoc.
//!
//! Library crates use [`ChangeDocError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all changedoc operations.
#[derive(Debug, thiserror::Error)]
pub enum ChangeDocError {
    /// Configuration loading or validation error. Fatal for the run.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport error talking to the advisory provider.
    #[error("network error: {0}")]
    Network(String),

    /// The advisory provider answered with a non-success status.
    #[error("provider error: HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    /// Structured-data parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Page store read or write failure.
    #[error("store error: {0}")]
    Store(String),

    /// Source-control error (unknown reference, failed git command).
    #[error("git error: {0}")]
    Git(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ChangeDocError>;

impl ChangeDocError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
