//! Error types for timerdeck-core.
//!
//! Validation failures are reported synchronously to the caller and never
//! mutate state. Storage failures are caught at the write-through boundary
//! and logged; the in-memory collection stays authoritative for the session.

use thiserror::Error;

/// Umbrella error type for timerdeck-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Command rejected before any state change
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persistence backend failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command-level validation errors. Nothing reaches persistence when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field missing or blank after trimming
    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },

    /// Invalid field value
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },

    /// Category already registered (comparison is case-insensitive)
    #[error("category '{0}' already exists")]
    DuplicateCategory(String),

    /// Timer references a category that was never added
    #[error("category '{0}' does not exist")]
    UnknownCategory(String),

    /// Timer name already taken within the category
    #[error("timer '{name}' already exists in category '{category}'")]
    DuplicateTimer { category: String, name: String },

    /// No timer with the given name
    #[error("no timer named '{0}'")]
    UnknownTimer(String),
}

/// Persistence backend errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend read/write failed
    #[error("storage backend failure for key '{key}': {source}")]
    Backend {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored payload could not be decoded
    #[error("corrupt payload under key '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend refused the operation
    #[error("{0}")]
    Unavailable(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
