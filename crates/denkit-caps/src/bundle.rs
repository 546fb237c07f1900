//! Capability bundle sealer.
//!
//! An [`EncryptedBundle`] carries a JSON payload sealed to a recipient's
//! X25519 public key: a one-time keypair is generated per seal, the
//! shared secret wraps an XChaCha20-Poly1305 key, and the ephemeral
//! secret is discarded the moment the ciphertext exists. An untrusted
//! server can hold the bundle; only the recipient's secret key opens it.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use denkit_core::codec;

use crate::crypto::{derive_wrap_key, EphemeralKeyPair, X25519_KEY_LEN};
use crate::error::{CapsError, Result};

/// Algorithm identifier carried by every bundle.
pub const BUNDLE_ALG: &str = "x25519-xchacha20poly1305";

/// Nonce length for the bundle cipher (192-bit).
pub const BUNDLE_NONCE_LEN: usize = 24;

/// Self-describing sealed capability container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBundle {
    /// Algorithm tag; opening rejects anything but [`BUNDLE_ALG`].
    pub alg: String,

    /// Public half of the one-time keypair generated for this seal.
    #[serde(with = "codec::b64")]
    pub ephemeral_public_key: Vec<u8>,

    /// Fresh random nonce, independent per seal.
    #[serde(with = "codec::b64")]
    pub nonce: Vec<u8>,

    /// Sealed JSON payload including the authentication tag.
    #[serde(with = "codec::b64")]
    pub ciphertext: Vec<u8>,
}

fn key_array(bytes: &[u8], what: &str) -> Result<[u8; X25519_KEY_LEN]> {
    if bytes.len() != X25519_KEY_LEN {
        return Err(CapsError::InvalidInput(format!(
            "{what} must be {X25519_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; X25519_KEY_LEN];
    arr.copy_from_slice(bytes);
    Ok(arr)
}

/// Seal a payload to a recipient's public key.
///
/// Each call draws a fresh ephemeral keypair and nonce, so two seals of
/// the same payload to the same recipient share no field but `alg`.
pub fn encrypt_bundle<T: Serialize>(payload: &T, recipient_public: &[u8]) -> Result<EncryptedBundle> {
    let recipient = key_array(recipient_public, "recipient public key")?;
    let plaintext =
        serde_json::to_vec(payload).map_err(|e| CapsError::Serialization(e.to_string()))?;

    let ephemeral = EphemeralKeyPair::generate();
    let ephemeral_public_key = ephemeral.public_bytes().to_vec();

    // the ephemeral secret is consumed here; nothing retains it past this call
    let mut shared = ephemeral.diffie_hellman(&recipient);
    let mut wrap = derive_wrap_key(&shared);

    let nonce = codec::random_bytes(BUNDLE_NONCE_LEN);
    let cipher = XChaCha20Poly1305::new_from_slice(&wrap)
        .map_err(|e| CapsError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|e| CapsError::Encryption(e.to_string()))?;

    shared.zeroize();
    wrap.zeroize();

    Ok(EncryptedBundle {
        alg: BUNDLE_ALG.to_string(),
        ephemeral_public_key,
        nonce,
        ciphertext,
    })
}

/// Open a sealed bundle with the recipient's secret key.
///
/// Fails with an algorithm mismatch for an unrecognized `alg` tag, an
/// invalid-input error for malformed key or nonce lengths, and a
/// decryption failure for a wrong key or any altered field.
pub fn decrypt_bundle<T: DeserializeOwned>(
    bundle: &EncryptedBundle,
    recipient_secret: &[u8],
) -> Result<T> {
    if bundle.alg != BUNDLE_ALG {
        return Err(CapsError::AlgorithmMismatch {
            expected: BUNDLE_ALG,
            got: bundle.alg.clone(),
        });
    }
    let mut secret_bytes = key_array(recipient_secret, "recipient secret key")?;
    let ephemeral = key_array(&bundle.ephemeral_public_key, "ephemeral public key")?;
    if bundle.nonce.len() != BUNDLE_NONCE_LEN {
        return Err(CapsError::InvalidInput(format!(
            "nonce must be {BUNDLE_NONCE_LEN} bytes, got {}",
            bundle.nonce.len()
        )));
    }

    let secret = StaticSecret::from(secret_bytes);
    secret_bytes.zeroize();
    let mut shared = *secret
        .diffie_hellman(&PublicKey::from(ephemeral))
        .as_bytes();
    let mut wrap = derive_wrap_key(&shared);

    let cipher = XChaCha20Poly1305::new_from_slice(&wrap)
        .map_err(|e| CapsError::Encryption(e.to_string()))?;
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&bundle.nonce), bundle.ciphertext.as_slice())
        .map_err(|_| CapsError::DecryptionFailed);

    shared.zeroize();
    wrap.zeroize();

    serde_json::from_slice(&plaintext?).map_err(|e| CapsError::Serialization(e.to_string()))
}
