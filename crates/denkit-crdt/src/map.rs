//! Last-writer-wins map.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::Stamp;

/// One map slot: the winning stamp and its value.
///
/// A `None` value is a tombstone. Tombstones stay resident so a delete
/// survives merging with an older concurrent write to the same key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub stamp: Stamp,
    pub value: Option<Bytes>,
}

/// A replicated map with last-writer-wins resolution per key.
///
/// Higher stamp wins; ties cannot happen across replicas because a stamp
/// embeds its writer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LwwMap {
    entries: BTreeMap<String, Register>,
}

impl LwwMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value under a key. The stamp must come fresh from the
    /// writing document's clock.
    pub fn set(&mut self, key: impl Into<String>, stamp: Stamp, value: Bytes) {
        self.apply(
            key.into(),
            Register {
                stamp,
                value: Some(value),
            },
        );
    }

    /// Tombstone a key. Returns true when a live value was present.
    pub fn remove(&mut self, key: &str, stamp: Stamp) -> bool {
        let was_live = self.get(key).is_some();
        self.apply(key.to_string(), Register { stamp, value: None });
        was_live
    }

    /// Read the live value under a key.
    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.entries.get(key).and_then(|r| r.value.as_ref())
    }

    /// Iterate live entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.entries
            .iter()
            .filter_map(|(k, r)| r.value.as_ref().map(|v| (k.as_str(), v)))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|r| r.value.is_some()).count()
    }

    /// Whether no live entries exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge another map into this one.
    ///
    /// Commutative, associative, idempotent: per key, the register with the
    /// greater stamp survives.
    pub fn merge(&mut self, other: &LwwMap) {
        for (key, register) in &other.entries {
            self.apply(key.clone(), register.clone());
        }
    }

    fn apply(&mut self, key: String, incoming: Register) {
        match self.entries.get(&key) {
            Some(existing) if existing.stamp >= incoming.stamp => {}
            _ => {
                self.entries.insert(key, incoming);
            }
        }
    }
}
