//! Error types for the dossier compiler.
//!
//! Library crates use [`DossierError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all dossier operations.
#[derive(Debug, thiserror::Error)]
pub enum DossierError {
    /// Invalid compilation request or configuration (fatal, raised before any work).
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A single document's binary content could not be embedded.
    #[error("document '{document}' could not be merged: {message}")]
    DocumentMerge { document: String, message: String },

    /// A synthetic page or the final concatenation could not be produced.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed manifest, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The compilation was cancelled between documents.
    #[error("compilation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DossierError>;

impl DossierError {
    /// Create a configuration error from any displayable message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a merge error for the named document.
    pub fn merge(document: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::DocumentMerge {
            document: document.into(),
            message: msg.into(),
        }
    }

    /// Create a render error from any displayable message.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
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

    /// Whether this error was raised by request/config validation.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
