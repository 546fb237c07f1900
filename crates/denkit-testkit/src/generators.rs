//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use denkit_caps::crypto::{KeyPair, SymmetricKey};
use denkit_caps::namespace::NamespaceKeySet;
use denkit_core::{DenId, Namespace};
use denkit_crdt::{Document, ReplicaId};

/// Generate a valid den identifier.
pub fn den_id() -> impl Strategy<Value = DenId> {
    "[a-z][a-z0-9._-]{0,31}".prop_map(|s| DenId::new(s).expect("generated den id is valid"))
}

/// Generate one namespace.
pub fn namespace() -> impl Strategy<Value = Namespace> {
    prop_oneof![
        Just(Namespace::SharedNotes),
        Just(Namespace::VoiceThread),
        Just(Namespace::Dropbox),
        Just(Namespace::Presence),
    ]
}

/// Generate a namespace subset, possibly empty, without duplicates.
pub fn namespace_subset() -> impl Strategy<Value = Vec<Namespace>> {
    proptest::sample::subsequence(Namespace::ALL.to_vec(), 0..=Namespace::ALL.len())
}

/// Generate a keyset over a namespace subset with deterministic material.
pub fn keyset() -> impl Strategy<Value = NamespaceKeySet> {
    (namespace_subset(), any::<[u8; 32]>()).prop_map(|(namespaces, base)| {
        let mut set = NamespaceKeySet::new();
        for (i, ns) in namespaces.into_iter().enumerate() {
            let mut key = base;
            key[0] = key[0].wrapping_add(i as u8);
            set.insert(ns, key);
        }
        set
    })
}

/// Generate an extractable symmetric key.
pub fn symmetric_key() -> impl Strategy<Value = SymmetricKey> {
    any::<[u8; 32]>().prop_map(|raw| {
        SymmetricKey::import_with(&raw, true).expect("32-byte import cannot fail")
    })
}

/// Generate a deterministic keypair.
pub fn keypair() -> impl Strategy<Value = KeyPair> {
    any::<[u8; 32]>().prop_map(KeyPair::from_secret_bytes)
}

/// Generate payload bytes up to a maximum length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Generate a participant name.
pub fn participant() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate a document pre-populated with random map and sequence writes.
pub fn document() -> impl Strategy<Value = Document> {
    (
        "[a-z]{1,8}",
        prop::collection::vec(("[a-z]{1,6}", "[a-z]{1,6}", payload(32)), 0..8),
        prop::collection::vec(payload(32), 0..8),
    )
        .prop_map(|(replica, sets, appends)| {
            let mut doc = Document::new(ReplicaId::new(replica));
            for (collection, key, value) in sets {
                doc.set(&collection, &key, Bytes::from(value));
            }
            for value in appends {
                doc.append("timeline", Bytes::from(value));
            }
            doc
        })
}
