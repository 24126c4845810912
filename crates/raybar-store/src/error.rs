//! Store error types.

use thiserror::Error;

/// Errors that can occur while reading or writing the settings file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error (reading, writing, or creating directories).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The home directory could not be resolved.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
