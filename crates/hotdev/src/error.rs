//! Error types for the hotdev core.
//!
//! Setup problems (bad configuration, no async runtime, a compiler that
//! refuses to start) surface as [`HotdevError`]. Per-request problems never
//! do: lookups that fail are downgraded to "pass the request on" inside the
//! coordinator, so the only errors a running server sees come from the
//! compiler handle or the artifact store.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the hotdev core.
#[derive(Debug, Error)]
pub enum HotdevError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Artifact store operation failed
    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    /// The compiler refused to watch or run
    #[error("Compiler error: {0}")]
    Compiler(#[from] CompilerError),

    /// A session was created outside of a tokio runtime
    #[error("No tokio runtime available\n\nHint: Create the session from within an async context")]
    NoRuntime,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
///
/// Raised once, while a [`HotdevConfig`](crate::config::HotdevConfig) is
/// validated. These are fatal: a session is never created from a
/// configuration that fails validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A whole configuration section is absent
    #[error("Missing configuration section: {section}\n\nHint: {hint}")]
    MissingSection {
        /// Name of the missing section
        section: String,
        /// How to provide it
        hint: String,
    },

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Artifact store errors.
///
/// The request path treats every one of these as "not found"; they only
/// carry detail for the compiler side that writes into the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("No such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Is a directory: {}", .0.display())]
    IsADirectory(PathBuf),

    #[error("Directory not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    /// Relative paths and `..` components are rejected
    #[error("Invalid store path: {}", .0.display())]
    InvalidPath(PathBuf),
}

/// Errors reported by a [`Compiler`](crate::compiler::Compiler) implementation.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Watching could not be set up
    #[error("Failed to start watching: {0}")]
    Watch(String),

    /// A one-shot run could not be started
    #[error("Failed to start compile: {0}")]
    Run(String),

    /// Writing output into the artifact store failed
    #[error("Failed to write output: {0}")]
    Output(#[from] StoreError),
}

/// Result type alias using `HotdevError` as the default error type.
pub type Result<T, E = HotdevError> = std::result::Result<T, E>;
