//! The replicated document: named maps and sequences plus a version vector.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::{ElemId, ReplicaId, Stamp, VersionVector};
use crate::error::{CrdtError, Result};
use crate::map::LwwMap;
use crate::seq::OrderedSeq;

/// Version tag carried by encoded document state.
pub const STATE_VERSION: u16 = 1;

/// Portable snapshot of a document's replicated state.
///
/// This is what export produces and merge-import consumes. Tombstones ride
/// along, so importing an old snapshot never resurrects deleted entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocState {
    pub version: u16,
    pub maps: BTreeMap<String, LwwMap>,
    pub seqs: BTreeMap<String, OrderedSeq>,
    pub vv: VersionVector,
}

impl DocState {
    /// Encode to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Decode from CBOR bytes, rejecting unknown state versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let state: DocState =
            ciborium::from_reader(bytes).map_err(|e| CrdtError::Decode(e.to_string()))?;
        if state.version != STATE_VERSION {
            return Err(CrdtError::UnsupportedVersion(state.version));
        }
        Ok(state)
    }
}

/// A mergeable document owned by one replica.
///
/// All mutation goes through this type so every write picks up a fresh
/// Lamport stamp and bumps the version vector. Collections are created
/// lazily on first write; reading an unknown collection yields emptiness,
/// not an error.
#[derive(Clone, Debug)]
pub struct Document {
    replica: ReplicaId,
    clock: u64,
    counter: u64,
    maps: BTreeMap<String, LwwMap>,
    seqs: BTreeMap<String, OrderedSeq>,
    vv: VersionVector,
}

impl Document {
    /// Create an empty document for the given replica.
    pub fn new(replica: ReplicaId) -> Self {
        Self {
            replica,
            clock: 0,
            counter: 0,
            maps: BTreeMap::new(),
            seqs: BTreeMap::new(),
            vv: VersionVector::new(),
        }
    }

    /// Rehydrate a document from previously exported state.
    ///
    /// The clock resumes past everything the state observed, and the
    /// element counter resumes past any ids this replica minted before, so
    /// fresh writes always win against their own history.
    pub fn from_state(replica: ReplicaId, state: DocState) -> Self {
        let mut counter = 0;
        for seq in state.seqs.values() {
            for id in seq.element_ids() {
                if id.replica == replica && id.counter > counter {
                    counter = id.counter;
                }
            }
        }
        Self {
            clock: state.vv.max_time(),
            counter,
            replica,
            maps: state.maps,
            seqs: state.seqs,
            vv: state.vv,
        }
    }

    /// Decode state bytes and rehydrate.
    pub fn decode(replica: ReplicaId, bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_state(replica, DocState::from_bytes(bytes)?))
    }

    /// The replica that owns this instance.
    pub fn replica(&self) -> &ReplicaId {
        &self.replica
    }

    /// The version vector of everything observed so far.
    pub fn version(&self) -> &VersionVector {
        &self.vv
    }

    fn next_stamp(&mut self) -> Stamp {
        self.clock += 1;
        let stamp = Stamp::new(self.clock, self.replica.clone());
        self.vv.observe(&stamp);
        stamp
    }

    fn next_elem_id(&mut self) -> ElemId {
        self.counter += 1;
        ElemId {
            replica: self.replica.clone(),
            counter: self.counter,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Map operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Write a value under a key in the named map.
    pub fn set(&mut self, collection: &str, key: &str, value: Bytes) {
        let stamp = self.next_stamp();
        self.maps
            .entry(collection.to_string())
            .or_default()
            .set(key, stamp, value);
    }

    /// Read the live value under a key.
    pub fn get(&self, collection: &str, key: &str) -> Option<&Bytes> {
        self.maps.get(collection).and_then(|m| m.get(key))
    }

    /// Tombstone a map key. Returns true when a live value was removed.
    pub fn remove(&mut self, collection: &str, key: &str) -> bool {
        let stamp = self.next_stamp();
        self.maps
            .entry(collection.to_string())
            .or_default()
            .remove(key, stamp)
    }

    /// Live entries of the named map, in key order.
    pub fn entries(&self, collection: &str) -> Vec<(String, Bytes)> {
        self.maps
            .get(collection)
            .map(|m| m.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Number of live entries in the named map.
    pub fn map_len(&self, collection: &str) -> usize {
        self.maps.get(collection).map(|m| m.len()).unwrap_or(0)
    }

    /// Tombstone every live key of the named map. Returns how many fell.
    pub fn clear(&mut self, collection: &str) -> usize {
        let keys: Vec<String> = self
            .maps
            .get(collection)
            .map(|m| m.iter().map(|(k, _)| k.to_string()).collect())
            .unwrap_or_default();
        for key in &keys {
            let stamp = self.next_stamp();
            if let Some(map) = self.maps.get_mut(collection) {
                map.remove(key, stamp);
            }
        }
        keys.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sequence operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append to the named sequence, returning the element's stable id.
    pub fn append(&mut self, collection: &str, value: Bytes) -> ElemId {
        let id = self.next_elem_id();
        let stamp = self.next_stamp();
        self.seqs
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), stamp, value);
        id
    }

    /// Tombstone a sequence element. Returns false for an unknown id.
    pub fn tombstone(&mut self, collection: &str, id: &ElemId) -> bool {
        self.seqs
            .get_mut(collection)
            .map(|s| s.tombstone(id))
            .unwrap_or(false)
    }

    /// Live elements of the named sequence, in append order.
    pub fn items(&self, collection: &str) -> Vec<(ElemId, Bytes)> {
        self.seqs
            .get(collection)
            .map(|s| s.iter().map(|(id, v)| (id.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Number of live elements in the named sequence.
    pub fn seq_len(&self, collection: &str) -> usize {
        self.seqs.get(collection).map(|s| s.len()).unwrap_or(0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot the full replicated state.
    pub fn to_state(&self) -> DocState {
        DocState {
            version: STATE_VERSION,
            maps: self.maps.clone(),
            seqs: self.seqs.clone(),
            vv: self.vv.clone(),
        }
    }

    /// Snapshot only the named collections.
    ///
    /// Used for per-namespace export: the subset is a valid state on its
    /// own and merges like any other.
    pub fn state_subset(&self, collections: &[&str]) -> DocState {
        DocState {
            version: STATE_VERSION,
            maps: self
                .maps
                .iter()
                .filter(|(name, _)| collections.contains(&name.as_str()))
                .map(|(name, map)| (name.clone(), map.clone()))
                .collect(),
            seqs: self
                .seqs
                .iter()
                .filter(|(name, _)| collections.contains(&name.as_str()))
                .map(|(name, seq)| (name.clone(), seq.clone()))
                .collect(),
            vv: self.vv.clone(),
        }
    }

    /// Encode the full state to bytes.
    pub fn encode(&self) -> Vec<u8> {
        self.to_state().to_bytes()
    }

    /// Merge exported state into this document.
    ///
    /// Additive only: local edits survive, and replaying the same state is
    /// a no-op.
    pub fn merge(&mut self, state: &DocState) {
        for (name, map) in &state.maps {
            self.maps.entry(name.clone()).or_default().merge(map);
        }
        for (name, seq) in &state.seqs {
            self.seqs.entry(name.clone()).or_default().merge(seq);
        }
        self.vv.merge(&state.vv);
        if state.vv.max_time() > self.clock {
            self.clock = state.vv.max_time();
        }
    }
}
