//! Storage error types.

use thiserror::Error;
use trustie_core::TreeError;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from rusqlite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (e.g., creating directories).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Key or value not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Key still has subkeys.
    #[error("Key has subkeys: {0}")]
    HasChildren(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<StorageError> for TreeError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => TreeError::KeyNotFound(what),
            StorageError::HasChildren(what) => TreeError::KeyHasChildren(what),
            StorageError::Io(e) => TreeError::Io(e),
            other => TreeError::Backend(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
