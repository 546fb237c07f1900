//! Wire-shape vectors for cross-implementation verification.
//!
//! Sealed payloads are randomized per call (fresh nonce, fresh ephemeral
//! key), so byte-for-byte golden ciphertexts are impossible. These vectors
//! pin the stable parts of the wire format instead: field names, algorithm
//! tags, and base64url armoring. An implementation that produces these
//! shapes can exchange blobs, bundles, and grants with this one.

use serde_json::Value;

use denkit_caps::blob::{encrypt_blob, BLOB_ALG};
use denkit_caps::bundle::{encrypt_bundle, BUNDLE_ALG};
use denkit_caps::crypto::SymmetricKey;
use denkit_caps::denkey::DenKey;
use denkit_caps::namespace::NamespaceKeySet;
use denkit_core::{DenId, Namespace};

use crate::fixtures::seeded_keypair;

/// One wire shape: the exact JSON fields an object must expose.
#[derive(Debug, Clone)]
pub struct WireShape {
    /// Human-readable name for the shape.
    pub name: &'static str,
    /// Every top-level field, no more and no fewer.
    pub fields: &'static [&'static str],
    /// Expected `alg` tag, for shapes that carry one.
    pub alg: Option<&'static str>,
}

/// All stable wire shapes.
pub fn all_shapes() -> Vec<WireShape> {
    vec![
        WireShape {
            name: "encryptedBlob",
            fields: &["alg", "iv", "ciphertext"],
            alg: Some(BLOB_ALG),
        },
        WireShape {
            name: "encryptedBundle",
            fields: &["alg", "ephemeralPublicKey", "nonce", "ciphertext"],
            alg: Some(BUNDLE_ALG),
        },
        WireShape {
            name: "denKey",
            fields: &["denId", "keyType", "scope", "expiresAt", "namespaceKeys"],
            alg: None,
        },
        WireShape {
            name: "denKeyScope",
            fields: &["namespaces", "read", "write", "offline"],
            alg: None,
        },
    ]
}

/// Produce a sample JSON value for a named shape.
///
/// Inputs are fixed; only the randomized seal output varies between calls.
pub fn sample_value(name: &str) -> Value {
    match name {
        "encryptedBlob" => {
            let key =
                SymmetricKey::import_with(&[0x07; 32], true).expect("32-byte import cannot fail");
            let blob = encrypt_blob(b"wire shape vector", &key).expect("sealing cannot fail");
            serde_json::to_value(blob).expect("blob serializes")
        }
        "encryptedBundle" => {
            let recipient = seeded_keypair(0x01);
            let bundle = encrypt_bundle(&vec![1u8, 2, 3], &recipient.public_bytes())
                .expect("sealing cannot fail");
            serde_json::to_value(bundle).expect("bundle serializes")
        }
        "denKey" => {
            let mut keys = NamespaceKeySet::new();
            keys.insert(Namespace::SharedNotes, [0x11; 32]);
            keys.insert(Namespace::Dropbox, [0x22; 32]);
            let den_key = DenKey::builder(DenId::new("vector-den").expect("valid den id"))
                .key_type("guest")
                .keys(keys)
                .build();
            serde_json::to_value(den_key).expect("den key serializes")
        }
        "denKeyScope" => sample_value("denKey")
            .get("scope")
            .cloned()
            .expect("den key carries a scope"),
        other => panic!("unknown wire shape: {other}"),
    }
}

/// Check every shape: exact field set plus the `alg` tag where present.
///
/// Returns `(name, ok)` per shape so callers can report all mismatches.
pub fn verify_all_shapes() -> Vec<(&'static str, bool)> {
    all_shapes()
        .iter()
        .map(|shape| {
            let value = sample_value(shape.name);
            let ok = has_exact_fields(&value, shape.fields)
                && shape
                    .alg
                    .map_or(true, |alg| value.get("alg").and_then(Value::as_str) == Some(alg));
            (shape.name, ok)
        })
        .collect()
}

/// Whether a JSON object exposes exactly the given fields.
pub fn has_exact_fields(value: &Value, fields: &[&str]) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    object.len() == fields.len() && fields.iter().all(|f| object.contains_key(*f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use denkit_core::from_base64url;

    fn decoded_field(value: &Value, field: &str) -> Vec<u8> {
        let text = value.get(field).and_then(Value::as_str).unwrap();
        assert!(!text.contains('='), "{field} must be unpadded");
        from_base64url(text).unwrap()
    }

    #[test]
    fn test_all_shapes_verify() {
        for (name, ok) in verify_all_shapes() {
            assert!(ok, "wire shape drifted: {name}");
        }
    }

    #[test]
    fn test_blob_armoring() {
        let blob = sample_value("encryptedBlob");
        assert_eq!(decoded_field(&blob, "iv").len(), 12);
        // ciphertext = payload plus the 16-byte tag
        assert_eq!(decoded_field(&blob, "ciphertext").len(), 17 + 16);
    }

    #[test]
    fn test_bundle_armoring() {
        let bundle = sample_value("encryptedBundle");
        assert_eq!(decoded_field(&bundle, "ephemeralPublicKey").len(), 32);
        assert_eq!(decoded_field(&bundle, "nonce").len(), 24);
        assert!(!decoded_field(&bundle, "ciphertext").is_empty());
    }

    #[test]
    fn test_den_key_namespace_keys_are_armored() {
        let den_key = sample_value("denKey");
        let keys = den_key.get("namespaceKeys").unwrap().as_object().unwrap();
        assert_eq!(keys.len(), 2);
        for (name, armored) in keys {
            assert!(Namespace::from_name(name).is_some());
            let raw = from_base64url(armored.as_str().unwrap()).unwrap();
            assert_eq!(raw.len(), 32);
        }
        assert!(den_key.get("expiresAt").unwrap().is_null());
    }

    #[test]
    fn test_seals_are_fresh_per_call() {
        let a = sample_value("encryptedBundle");
        let b = sample_value("encryptedBundle");
        for field in ["nonce", "ciphertext", "ephemeralPublicKey"] {
            assert_ne!(a.get(field), b.get(field), "{field} must be fresh");
        }
    }
}
