//! Error types for the storage module.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
