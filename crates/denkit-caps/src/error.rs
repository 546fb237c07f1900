//! Error types for the capability module.

use thiserror::Error;

/// Errors that can occur during key and capability operations.
///
/// Failures are distinguishable by kind and raised before any partial
/// output exists; no variant ever accompanies recovered plaintext.
#[derive(Debug, Error)]
pub enum CapsError {
    /// Malformed input, caught before any cryptographic operation runs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An algorithm tag this implementation does not support.
    #[error("unsupported algorithm: expected {expected}, got {got}")]
    AlgorithmMismatch {
        /// The one algorithm identifier this build accepts.
        expected: &'static str,
        /// The tag found in the container.
        got: String,
    },

    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Wrong key or tampered ciphertext.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Attempt to read raw bytes out of a non-extractable key handle.
    #[error("key is not extractable")]
    KeyNotExtractable,

    /// Payload serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] denkit_core::CoreError),
}

/// Result type for capability operations.
pub type Result<T> = std::result::Result<T, CapsError>;
