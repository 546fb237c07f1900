//! Namespace key scoping.
//!
//! Each namespace of a den's shared document is encrypted under its own
//! 32-byte key. A [`NamespaceKeySet`] maps a subset of the fixed
//! namespaces to keys; which entries are present is how capability tiers
//! are expressed. Keys should be imported lazily at the point of use, not
//! held open for a den's lifetime.

use std::collections::BTreeMap;
use std::fmt;

use rand::RngCore;

use denkit_core::{codec, Namespace};

use crate::crypto::{SymmetricKey, SYMMETRIC_KEY_LEN};
use crate::error::{CapsError, Result};

/// Generate one fresh 32-byte namespace key.
pub fn generate_namespace_key() -> [u8; SYMMETRIC_KEY_LEN] {
    let mut key = [0u8; SYMMETRIC_KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Import a raw namespace key for immediate use, non-extractable.
pub fn import_namespace_key(raw: &[u8]) -> Result<SymmetricKey> {
    SymmetricKey::import(raw)
}

/// Partial mapping from namespaces to 32-byte symmetric keys.
///
/// Absence of an entry means no access to that namespace.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NamespaceKeySet {
    keys: BTreeMap<Namespace, [u8; SYMMETRIC_KEY_LEN]>,
}

impl NamespaceKeySet {
    /// Empty keyset, granting nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate fresh keys for the requested namespaces.
    pub fn generate(namespaces: &[Namespace]) -> Self {
        let mut set = Self::new();
        for ns in namespaces {
            set.keys.insert(*ns, generate_namespace_key());
        }
        set
    }

    /// Generate fresh keys for all four namespaces.
    pub fn generate_full() -> Self {
        Self::generate(&Namespace::ALL)
    }

    /// The raw key for a namespace, if granted.
    pub fn get(&self, namespace: Namespace) -> Option<&[u8; SYMMETRIC_KEY_LEN]> {
        self.keys.get(&namespace)
    }

    /// Insert or replace the key for a namespace.
    pub fn insert(&mut self, namespace: Namespace, key: [u8; SYMMETRIC_KEY_LEN]) {
        self.keys.insert(namespace, key);
    }

    /// The namespaces this set grants, in declaration order.
    pub fn namespaces(&self) -> Vec<Namespace> {
        Namespace::ALL
            .into_iter()
            .filter(|ns| self.keys.contains_key(ns))
            .collect()
    }

    /// Number of granted namespaces.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set grants nothing.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A new set holding only the requested namespaces.
    ///
    /// Namespaces absent from this set stay absent; subsetting never
    /// invents keys.
    pub fn subset(&self, namespaces: &[Namespace]) -> Self {
        let mut set = Self::new();
        for ns in namespaces {
            if let Some(key) = self.keys.get(ns) {
                set.keys.insert(*ns, *key);
            }
        }
        set
    }

    /// Serialize to a name-to-base64url map for embedding in a capability
    /// payload.
    pub fn serialize(&self) -> BTreeMap<String, String> {
        self.keys
            .iter()
            .map(|(ns, key)| (ns.as_str().to_string(), codec::to_base64url(key)))
            .collect()
    }

    /// Rebuild a keyset from a serialized map.
    ///
    /// Unrecognized namespace names are skipped so newer grants still open
    /// on older builds. A key of the wrong length is an error, not a skip.
    pub fn deserialize(map: &BTreeMap<String, String>) -> Result<Self> {
        let mut set = Self::new();
        for (name, armored) in map {
            let Some(ns) = Namespace::from_name(name) else {
                continue;
            };
            let raw = codec::from_base64url(armored)?;
            if raw.len() != SYMMETRIC_KEY_LEN {
                return Err(CapsError::InvalidInput(format!(
                    "key for {name} must be {SYMMETRIC_KEY_LEN} bytes, got {}",
                    raw.len()
                )));
            }
            let mut key = [0u8; SYMMETRIC_KEY_LEN];
            key.copy_from_slice(&raw);
            set.keys.insert(ns, key);
        }
        Ok(set)
    }
}

impl fmt::Debug for NamespaceKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceKeySet")
            .field("namespaces", &self.namespaces())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{decrypt_blob, encrypt_blob};

    #[test]
    fn test_generate_covers_requested_namespaces() {
        let set = NamespaceKeySet::generate(&[Namespace::Dropbox, Namespace::Presence]);
        assert_eq!(set.len(), 2);
        assert!(set.get(Namespace::Dropbox).is_some());
        assert!(set.get(Namespace::Presence).is_some());
        assert!(set.get(Namespace::SharedNotes).is_none());
    }

    #[test]
    fn test_generate_full_covers_all() {
        let set = NamespaceKeySet::generate_full();
        assert_eq!(set.len(), 4);
        assert_eq!(set.namespaces(), Namespace::ALL.to_vec());
    }

    #[test]
    fn test_serialize_roundtrip_partial() {
        let set = NamespaceKeySet::generate(&[Namespace::SharedNotes, Namespace::VoiceThread]);
        let wire = set.serialize();
        let back = NamespaceKeySet::deserialize(&wire).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_serialize_roundtrip_empty_and_full() {
        let empty = NamespaceKeySet::new();
        assert_eq!(
            NamespaceKeySet::deserialize(&empty.serialize()).unwrap(),
            empty
        );

        let full = NamespaceKeySet::generate_full();
        assert_eq!(
            NamespaceKeySet::deserialize(&full.serialize()).unwrap(),
            full
        );
    }

    #[test]
    fn test_deserialize_skips_unknown_names() {
        let set = NamespaceKeySet::generate(&[Namespace::Dropbox]);
        let mut wire = set.serialize();
        wire.insert(
            "futureNamespace".to_string(),
            codec::to_base64url(&[0u8; 32]),
        );

        let back = NamespaceKeySet::deserialize(&wire).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_deserialize_rejects_short_key() {
        let mut wire = BTreeMap::new();
        wire.insert(
            "dropbox".to_string(),
            codec::to_base64url(&[0u8; 16]),
        );

        assert!(matches!(
            NamespaceKeySet::deserialize(&wire),
            Err(CapsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_subset_never_invents_keys() {
        let set = NamespaceKeySet::generate(&[Namespace::SharedNotes]);
        let sub = set.subset(&[Namespace::SharedNotes, Namespace::Dropbox]);
        assert_eq!(sub.namespaces(), vec![Namespace::SharedNotes]);
        assert_eq!(
            sub.get(Namespace::SharedNotes),
            set.get(Namespace::SharedNotes)
        );
    }

    #[test]
    fn test_cross_namespace_isolation() {
        let set = NamespaceKeySet::generate_full();

        let notes_key = import_namespace_key(set.get(Namespace::SharedNotes).unwrap()).unwrap();
        let dropbox_key = import_namespace_key(set.get(Namespace::Dropbox).unwrap()).unwrap();

        let blob = encrypt_blob(b"note body", &notes_key).unwrap();
        assert!(decrypt_blob(&blob, &dropbox_key).is_err());
        assert_eq!(decrypt_blob(&blob, &notes_key).unwrap(), b"note body");
    }

    #[test]
    fn test_debug_lists_namespaces_only() {
        let set = NamespaceKeySet::generate(&[Namespace::Presence]);
        let rendered = format!("{set:?}");
        assert!(rendered.contains("Presence"));
        assert!(!rendered.contains("keys:"));
    }
}
