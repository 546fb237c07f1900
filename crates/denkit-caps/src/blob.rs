//! Symmetric blob cipher.
//!
//! An [`EncryptedBlob`] is a self-describing ChaCha20-Poly1305 container:
//! algorithm tag, per-call nonce, and ciphertext with the authentication
//! tag included. Any single-bit corruption makes decryption fail; partial
//! plaintext is never returned.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use denkit_core::codec;

use crate::crypto::SymmetricKey;
use crate::error::{CapsError, Result};

/// Algorithm identifier carried by every blob.
pub const BLOB_ALG: &str = "chacha20poly1305";

/// Nonce length for the blob cipher (96-bit).
pub const BLOB_NONCE_LEN: usize = 12;

/// Self-describing symmetric ciphertext container.
///
/// In JSON the byte fields travel as base64url text, so a blob can be
/// stored or relayed by collaborators that never see plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBlob {
    /// Algorithm tag; decryption rejects anything but [`BLOB_ALG`].
    pub alg: String,

    /// Fresh random nonce, generated per encryption, never reused.
    #[serde(with = "codec::b64")]
    pub iv: Vec<u8>,

    /// Ciphertext including the authentication tag.
    #[serde(with = "codec::b64")]
    pub ciphertext: Vec<u8>,
}

/// Encrypt plaintext under a symmetric key with a fresh nonce.
pub fn encrypt_blob(plaintext: &[u8], key: &SymmetricKey) -> Result<EncryptedBlob> {
    let iv = codec::random_bytes(BLOB_NONCE_LEN);
    let cipher = ChaCha20Poly1305::new_from_slice(key.material())
        .map_err(|e| CapsError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CapsError::Encryption(e.to_string()))?;

    Ok(EncryptedBlob {
        alg: BLOB_ALG.to_string(),
        iv,
        ciphertext,
    })
}

/// Decrypt a blob under a symmetric key.
///
/// Fails with an algorithm mismatch for an unrecognized `alg` tag, and
/// with a decryption failure for a wrong key or any altered byte.
pub fn decrypt_blob(blob: &EncryptedBlob, key: &SymmetricKey) -> Result<Vec<u8>> {
    if blob.alg != BLOB_ALG {
        return Err(CapsError::AlgorithmMismatch {
            expected: BLOB_ALG,
            got: blob.alg.clone(),
        });
    }
    if blob.iv.len() != BLOB_NONCE_LEN {
        return Err(CapsError::InvalidInput(format!(
            "nonce must be {BLOB_NONCE_LEN} bytes, got {}",
            blob.iv.len()
        )));
    }

    let cipher = ChaCha20Poly1305::new_from_slice(key.material())
        .map_err(|e| CapsError::Encryption(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(&blob.iv), blob.ciphertext.as_slice())
        .map_err(|_| CapsError::DecryptionFailed)
}

/// Encrypt a UTF-8 string.
pub fn encrypt_string(text: &str, key: &SymmetricKey) -> Result<EncryptedBlob> {
    encrypt_blob(&codec::encode_utf8(text), key)
}

/// Decrypt a blob back into a UTF-8 string.
pub fn decrypt_string(blob: &EncryptedBlob, key: &SymmetricKey) -> Result<String> {
    Ok(codec::decode_utf8(&decrypt_blob(blob, key)?)?)
}

/// Serialize a value as JSON and encrypt it.
pub fn encrypt_json<T: Serialize>(value: &T, key: &SymmetricKey) -> Result<EncryptedBlob> {
    let plaintext = serde_json::to_vec(value).map_err(|e| CapsError::Serialization(e.to_string()))?;
    encrypt_blob(&plaintext, key)
}

/// Decrypt a blob and parse the plaintext as JSON.
pub fn decrypt_json<T: DeserializeOwned>(blob: &EncryptedBlob, key: &SymmetricKey) -> Result<T> {
    let plaintext = decrypt_blob(blob, key)?;
    serde_json::from_slice(&plaintext).map_err(|e| CapsError::Serialization(e.to_string()))
}
