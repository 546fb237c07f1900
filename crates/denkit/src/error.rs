//! Error types for the den store facade.

use denkit_caps::CapsError;
use denkit_core::CoreError;
use denkit_crdt::CrdtError;
use denkit_store::StorageError;
use thiserror::Error;

/// Errors that can occur during den operations.
#[derive(Debug, Error)]
pub enum DenError {
    /// Core primitive error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Replicated document error.
    #[error("document error: {0}")]
    Crdt(#[from] CrdtError),

    /// Capability or encryption error.
    #[error("capability error: {0}")]
    Caps(#[from] CapsError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A record was not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A stored record could not be decoded.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Result type for den operations.
pub type Result<T> = std::result::Result<T, DenError>;
