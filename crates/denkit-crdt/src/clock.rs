//! Logical clocks and replica identity.
//!
//! Every write is stamped with a Lamport time plus the writing replica's
//! identifier. The pair totally orders concurrent writes, so every replica
//! picks the same winner during merge without coordination.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one replica (one device or process) of a document.
///
/// Replica ids only need to be unique among the devices editing the same
/// den; 16 random bytes hex-encoded is plenty.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Wrap a replica identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplicaId({})", self.0)
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Lamport stamp: logical time plus the replica that wrote it.
///
/// Derived ordering compares time first, then replica id. Two stamps
/// compare equal only when the same replica produced them at the same
/// logical instant, so last-writer-wins resolution is deterministic.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stamp {
    pub time: u64,
    pub replica: ReplicaId,
}

impl Stamp {
    /// Build a stamp.
    pub fn new(time: u64, replica: ReplicaId) -> Self {
        Self { time, replica }
    }
}

/// Stable identity of one sequence element.
///
/// A replica never reuses a counter, so an element id names the same
/// element on every replica forever.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElemId {
    pub replica: ReplicaId,
    pub counter: u64,
}

/// Per-replica high-water marks of observed logical time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionVector(BTreeMap<ReplicaId, u64>);

impl VersionVector {
    /// An empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed stamp.
    pub fn observe(&mut self, stamp: &Stamp) {
        let entry = self.0.entry(stamp.replica.clone()).or_insert(0);
        if stamp.time > *entry {
            *entry = stamp.time;
        }
    }

    /// The highest time observed from a replica, 0 if never seen.
    pub fn get(&self, replica: &ReplicaId) -> u64 {
        self.0.get(replica).copied().unwrap_or(0)
    }

    /// Merge pairwise maxima from another vector.
    pub fn merge(&mut self, other: &VersionVector) {
        for (replica, time) in &other.0 {
            let entry = self.0.entry(replica.clone()).or_insert(0);
            if *time > *entry {
                *entry = *time;
            }
        }
    }

    /// The highest time observed from any replica.
    pub fn max_time(&self) -> u64 {
        self.0.values().copied().max().unwrap_or(0)
    }

    /// Iterate (replica, time) pairs in replica order.
    pub fn iter(&self) -> impl Iterator<Item = (&ReplicaId, u64)> {
        self.0.iter().map(|(r, t)| (r, *t))
    }

    /// Number of replicas seen.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no replica has been seen.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
