//! # Denkit Capabilities
//!
//! Key derivation, namespace key scoping, and sealed capability grants.
//!
//! ## Overview
//!
//! Access to a den is carried by keys, not accounts. The device key
//! (derived from passphrase material) protects the private document at
//! rest; each shared-document namespace has its own symmetric key; and a
//! [`DenKey`] hands a chosen subset of those keys to a participant,
//! sealed to their public key so an untrusted server can relay it
//! without reading it.
//!
//! ## Key Concepts
//!
//! - **SymmetricKey**: An opaque key handle; extractability is fixed at creation
//! - **EncryptedBlob**: Self-describing symmetric ciphertext container
//! - **EncryptedBundle**: A payload sealed to a recipient's X25519 public key
//! - **NamespaceKeySet**: Partial map from namespaces to 32-byte keys
//! - **DenKey**: The capability payload a grant seals and transfers
//!
//! ## Encryption Model
//!
//! Two layers, one per trust boundary:
//!
//! 1. **Blobs**: ChaCha20-Poly1305 under a symmetric key, fresh 12-byte
//!    nonce per call. Used for at-rest data and namespace segments.
//! 2. **Bundles**: X25519 agreement against a one-time keypair, wrap key
//!    derived with BLAKE3, XChaCha20-Poly1305 under a fresh 24-byte
//!    nonce. Used to move a [`DenKey`] through an untrusted relay; the
//!    ephemeral secret is discarded per seal.
//!
//! Every container carries an `alg` tag and unknown tags are rejected,
//! never guessed at.

pub mod blob;
pub mod bundle;
pub mod crypto;
pub mod denkey;
pub mod device;
pub mod error;
pub mod namespace;

pub use blob::{
    decrypt_blob, decrypt_json, decrypt_string, encrypt_blob, encrypt_json, encrypt_string,
    EncryptedBlob, BLOB_ALG, BLOB_NONCE_LEN,
};
pub use bundle::{decrypt_bundle, encrypt_bundle, EncryptedBundle, BUNDLE_ALG, BUNDLE_NONCE_LEN};
pub use crypto::{EphemeralKeyPair, KeyPair, SymmetricKey, SYMMETRIC_KEY_LEN, X25519_KEY_LEN};
pub use denkey::{DenKey, DenKeyBuilder, DenKeyScope};
pub use device::{
    derive_device_key, export_aes_key, generate_aes_key, import_aes_key, random_salt,
    MIN_SALT_LEN, PBKDF2_ITERATIONS,
};
pub use error::{CapsError, Result};
pub use namespace::{generate_namespace_key, import_namespace_key, NamespaceKeySet};
