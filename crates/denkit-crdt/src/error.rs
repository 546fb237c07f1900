//! Error types for the document engine.

use thiserror::Error;

/// Errors raised while encoding or decoding document state.
///
/// Merging itself is total: any two decoded states merge without error.
#[derive(Debug, Error)]
pub enum CrdtError {
    /// State bytes could not be decoded.
    #[error("state decoding failed: {0}")]
    Decode(String),

    /// State carries a version this engine does not understand.
    #[error("unsupported state version: {0}")]
    UnsupportedVersion(u16),
}

/// Result type for document engine operations.
pub type Result<T> = std::result::Result<T, CrdtError>;
