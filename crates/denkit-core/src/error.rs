//! Error types for denkit core primitives.

use thiserror::Error;

/// Errors from codec and identifier handling.
///
/// Everything here is an input problem: detected up front, never after
/// partial work.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed a structural check.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Text that should have been base64 could not be decoded.
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    /// Bytes that should have been UTF-8 could not be decoded.
    #[error("invalid utf-8 at byte {0}")]
    InvalidUtf8(usize),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
