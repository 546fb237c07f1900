//! Byte and text codecs.
//!
//! Every byte field that crosses a wire or a storage boundary goes through
//! these helpers: unpadded base64url for text armoring, UTF-8 for strings,
//! plus the secure random source and the constant-time comparison used for
//! key material.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::RngCore;

use crate::error::{CoreError, Result};

/// Encode bytes as unpadded base64url text.
pub fn to_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url text to bytes.
///
/// Padded input and standard-alphabet input are accepted too, so values
/// armored by other tooling still round-trip. Output is always re-encoded
/// unpadded by [`to_base64url`].
pub fn from_base64url(text: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text)
        .or_else(|_| URL_SAFE.decode(text))
        .or_else(|_| STANDARD_NO_PAD.decode(text))
        .or_else(|_| STANDARD.decode(text))
        .map_err(|e| CoreError::InvalidBase64(e.to_string()))
}

/// Encode text as UTF-8 bytes.
pub fn encode_utf8(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Decode UTF-8 bytes to text.
pub fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| CoreError::InvalidUtf8(e.utf8_error().valid_up_to()))
}

/// Fresh cryptographically secure random bytes.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// Compare two byte slices in constant time.
///
/// A length mismatch returns false immediately. Equal-length inputs are
/// folded without early exit, so timing does not depend on where the first
/// difference sits.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Serde adapter for byte fields carried as base64url text.
///
/// Usage: `#[serde(with = "denkit_core::codec::b64")]` on a `Vec<u8>` field.
pub mod b64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        super::to_base64url(bytes).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(de)?;
        super::from_base64url(&text).map_err(serde::de::Error::custom)
    }
}
