//! Device key derivation.
//!
//! The device key protects a den's private document at rest. It is
//! derived from caller-supplied passphrase material with PBKDF2-SHA256
//! and handed back as a non-extractable [`SymmetricKey`], so only the
//! salt ever needs to be persisted.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::crypto::{SymmetricKey, SYMMETRIC_KEY_LEN};
use crate::error::{CapsError, Result};

/// PBKDF2 iteration count for device key derivation.
pub const PBKDF2_ITERATIONS: u32 = 310_000;

/// Minimum acceptable salt length in bytes.
pub const MIN_SALT_LEN: usize = 16;

/// Derive the device key from passphrase material and a stored salt.
///
/// Deterministic: the same `(passphrase, salt)` pair always yields a key
/// that decrypts what an earlier derivation encrypted, across process
/// restarts. The returned handle is non-extractable.
pub fn derive_device_key(passphrase: &str, salt: &[u8]) -> Result<SymmetricKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CapsError::InvalidInput(format!(
            "salt must be at least {MIN_SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }

    let mut material = [0u8; SYMMETRIC_KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut material);
    let key = SymmetricKey::from_material(material, false);
    material.zeroize();
    Ok(key)
}

/// Generate a fresh 16-byte salt.
pub fn random_salt() -> [u8; MIN_SALT_LEN] {
    let mut salt = [0u8; MIN_SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Generate a fresh extractable symmetric key.
///
/// Used where the raw bytes must later be serialized, namespace keys in
/// particular. Keys that never need serializing should be imported
/// non-extractable instead.
pub fn generate_aes_key() -> SymmetricKey {
    SymmetricKey::generate()
}

/// Read the raw 32 bytes out of an extractable key handle.
pub fn export_aes_key(key: &SymmetricKey) -> Result<[u8; SYMMETRIC_KEY_LEN]> {
    key.export()
}

/// Import raw 32-byte key material as a key handle.
///
/// Rejects any other length. Pass `extractable = false` unless the key
/// must later be serialized back out.
pub fn import_aes_key(raw: &[u8], extractable: bool) -> Result<SymmetricKey> {
    SymmetricKey::import_with(raw, extractable)
}
