//! Key material primitives for the capability module.
//!
//! Provides symmetric key handles and X25519 keypairs. Symmetric keys are
//! opaque: whether the raw bytes may leave the handle is fixed when the
//! handle is created, and a non-extractable handle only ever encrypts and
//! decrypts.

use std::fmt;

use rand::RngCore;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::{CapsError, Result};

/// Length of a symmetric key in bytes (256-bit).
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Length of an X25519 public or secret key in bytes.
pub const X25519_KEY_LEN: usize = 32;

/// Domain separation context for bundle wrap-key derivation.
const BUNDLE_KDF_CONTEXT: &str = "denkit-caps-v1-bundle-wrap";

/// An opaque 256-bit symmetric key handle.
///
/// Extractability is decided at construction and never changes. A derived
/// device key is non-extractable, so code that holds the handle can use
/// the key but never copy its bytes out.
#[derive(Clone)]
pub struct SymmetricKey {
    material: [u8; SYMMETRIC_KEY_LEN],
    extractable: bool,
}

impl SymmetricKey {
    /// Generate a fresh random key, extractable.
    pub fn generate() -> Self {
        let mut material = [0u8; SYMMETRIC_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut material);
        Self {
            material,
            extractable: true,
        }
    }

    /// Import raw key bytes as a non-extractable handle.
    pub fn import(raw: &[u8]) -> Result<Self> {
        Self::import_with(raw, false)
    }

    /// Import raw key bytes, choosing extractability explicitly.
    pub fn import_with(raw: &[u8], extractable: bool) -> Result<Self> {
        if raw.len() != SYMMETRIC_KEY_LEN {
            return Err(CapsError::InvalidInput(format!(
                "key must be {SYMMETRIC_KEY_LEN} bytes, got {}",
                raw.len()
            )));
        }
        let mut material = [0u8; SYMMETRIC_KEY_LEN];
        material.copy_from_slice(raw);
        Ok(Self {
            material,
            extractable,
        })
    }

    /// Read the raw key bytes back out.
    ///
    /// Fails for non-extractable handles; that refusal is the whole point
    /// of the handle model.
    pub fn export(&self) -> Result<[u8; SYMMETRIC_KEY_LEN]> {
        if !self.extractable {
            return Err(CapsError::KeyNotExtractable);
        }
        Ok(self.material)
    }

    /// Whether `export` will succeed.
    pub fn is_extractable(&self) -> bool {
        self.extractable
    }

    pub(crate) fn from_material(material: [u8; SYMMETRIC_KEY_LEN], extractable: bool) -> Self {
        Self {
            material,
            extractable,
        }
    }

    pub(crate) fn material(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.material
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("extractable", &self.extractable)
            .finish_non_exhaustive()
    }
}

/// A long-lived X25519 identity keypair.
///
/// The public half may be handed to an untrusted server; the secret half
/// stays on the owning device.
pub struct KeyPair {
    public: [u8; X25519_KEY_LEN],
    secret: StaticSecret,
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut bytes = [0u8; X25519_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret = StaticSecret::from(bytes);
        bytes.zeroize();
        let public = *PublicKey::from(&secret).as_bytes();
        Self { public, secret }
    }

    /// Rebuild a keypair from stored secret bytes.
    pub fn from_secret_bytes(bytes: [u8; X25519_KEY_LEN]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = *PublicKey::from(&secret).as_bytes();
        Self { public, secret }
    }

    /// The 32-byte public key.
    pub fn public_bytes(&self) -> [u8; X25519_KEY_LEN] {
        self.public
    }

    /// The 32-byte secret key, for sealed-bundle opening and durable storage.
    pub fn secret_bytes(&self) -> [u8; X25519_KEY_LEN] {
        self.secret.to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Ephemeral keypair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: [u8; X25519_KEY_LEN],
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral keypair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = *PublicKey::from(&secret).as_bytes();
        Self { secret, public }
    }

    /// The 32-byte public half.
    pub fn public_bytes(&self) -> [u8; X25519_KEY_LEN] {
        self.public
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Consumes the ephemeral secret; it can only be used once.
    pub fn diffie_hellman(self, peer_public: &[u8; X25519_KEY_LEN]) -> [u8; 32] {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_public));
        *shared.as_bytes()
    }
}

/// Derive a bundle wrap key from an X25519 shared secret.
pub(crate) fn derive_wrap_key(shared: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(BUNDLE_KDF_CONTEXT);
    hasher.update(shared);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_is_extractable() {
        let key = SymmetricKey::generate();
        assert!(key.is_extractable());
        assert_eq!(key.export().unwrap().len(), SYMMETRIC_KEY_LEN);
    }

    #[test]
    fn test_import_defaults_to_non_extractable() {
        let key = SymmetricKey::import(&[7u8; 32]).unwrap();
        assert!(!key.is_extractable());
        assert!(matches!(key.export(), Err(CapsError::KeyNotExtractable)));
    }

    #[test]
    fn test_import_with_extractable_roundtrips() {
        let raw = [9u8; 32];
        let key = SymmetricKey::import_with(&raw, true).unwrap();
        assert_eq!(key.export().unwrap(), raw);
    }

    #[test]
    fn test_import_rejects_wrong_length() {
        assert!(matches!(
            SymmetricKey::import(&[0u8; 31]),
            Err(CapsError::InvalidInput(_))
        ));
        assert!(matches!(
            SymmetricKey::import(&[0u8; 33]),
            Err(CapsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_debug_redacts_material() {
        let key = SymmetricKey::import(&[0xAB; 32]).unwrap();
        let rendered = format!("{key:?}");
        // raw bytes would render as decimal 171 in a derived Debug
        assert!(!rendered.contains("171"));
        assert!(rendered.contains("SymmetricKey"));
    }

    #[test]
    fn test_static_key_agreement() {
        // Host and visitor each hold a long-lived keypair
        let host = KeyPair::generate();
        let visitor = KeyPair::generate();

        let host_secret = StaticSecret::from(host.secret_bytes());
        let visitor_secret = StaticSecret::from(visitor.secret_bytes());

        let host_shared = host_secret.diffie_hellman(&PublicKey::from(visitor.public_bytes()));
        let visitor_shared = visitor_secret.diffie_hellman(&PublicKey::from(host.public_bytes()));

        assert_eq!(host_shared.as_bytes(), visitor_shared.as_bytes());
    }

    #[test]
    fn test_ephemeral_key_agreement() {
        let recipient = KeyPair::generate();

        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_bytes();

        let sealer_shared = ephemeral.diffie_hellman(&recipient.public_bytes());

        let recipient_secret = StaticSecret::from(recipient.secret_bytes());
        let recipient_shared =
            recipient_secret.diffie_hellman(&PublicKey::from(ephemeral_public));

        assert_eq!(&sealer_shared, recipient_shared.as_bytes());
    }

    #[test]
    fn test_keypair_rebuild_from_secret() {
        let original = KeyPair::generate();
        let rebuilt = KeyPair::from_secret_bytes(original.secret_bytes());
        assert_eq!(original.public_bytes(), rebuilt.public_bytes());
    }

    #[test]
    fn test_wrap_key_derivation_deterministic() {
        let shared = [0x42; 32];
        assert_eq!(derive_wrap_key(&shared), derive_wrap_key(&shared));
        assert_ne!(derive_wrap_key(&shared), derive_wrap_key(&[0x43; 32]));
    }
}
