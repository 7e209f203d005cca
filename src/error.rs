//! Error types for chatshelf
//!
//! This module defines the error kinds produced by the session lifecycle
//! engine, using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for chatshelf operations
///
/// Per-item failures inside a batch carry one of these as their reason;
/// discovery failures other than a missing root propagate to the caller.
#[derive(Error, Debug)]
pub enum ChatshelfError {
    /// A file or directory the operation requires does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Archive/unarchive requested from the wrong state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// A move would overwrite an existing file
    #[error("Destination already exists: {0}")]
    DestinationExists(String),

    /// A composed path escaped the root it must stay inside
    #[error("Path escapes {label} root: {path}")]
    OutOfBoundsPath {
        /// Which root was being guarded (e.g. "trash payload")
        label: String,
        /// The offending input
        path: String,
    },

    /// A file name did not match the provider's naming grammar
    #[error("Unparsable location: {0}")]
    UnparsableLocation(String),

    /// A trash id contained characters outside the safe token set
    #[error("Malformed trash id: {0}")]
    MalformedToken(String),

    /// File content or metadata could not be interpreted
    #[error("Unclassifiable content: {0}")]
    Unclassifiable(String),

    /// The provider does not support the requested operation
    #[error("Operation not supported for {provider}: {operation}")]
    UnsupportedOperation {
        /// Provider tag
        provider: String,
        /// Operation name
        operation: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for chatshelf operations
///
/// Uses `anyhow::Error` so call sites can attach path context; the
/// domain kind is recovered with `downcast_ref::<ChatshelfError>()`.
pub type Result<T> = anyhow::Result<T>;

/// Returns true when the error (or its source chain) is an `io::ErrorKind::NotFound`
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return io.kind() == std::io::ErrorKind::NotFound;
        }
        matches!(
            cause.downcast_ref::<ChatshelfError>(),
            Some(ChatshelfError::Io(io)) if io.kind() == std::io::ErrorKind::NotFound
        )
    })
}
