//! # Denkit CRDT
//!
//! Conflict-free replicated document state for den collections. A
//! [`Document`] bundles named last-write-wins maps and append-only
//! sequences behind one clock, and its exported [`DocState`] merges into
//! any other replica without coordination.
//!
//! ## Key Types
//!
//! - [`Document`] - a replica's mutable view: maps, sequences, clock
//! - [`DocState`] - portable CBOR-encodable snapshot for export and merge
//! - [`LwwMap`] - last-write-wins keyed register map with tombstones
//! - [`OrderedSeq`] - append-ordered sequence with tombstoned deletion
//! - [`Stamp`] / [`VersionVector`] - Lamport time and per-replica high-water marks
//!
//! ## Merge Guarantees
//!
//! Merge is commutative, associative, and idempotent: replicas that have
//! seen the same set of states render the same entries, regardless of
//! delivery order or duplication. Deletion is represented by tombstones,
//! so merging an older snapshot never resurrects removed data.

pub mod clock;
pub mod document;
pub mod error;
pub mod map;
pub mod seq;

pub use clock::{ElemId, ReplicaId, Stamp, VersionVector};
pub use document::{DocState, Document, STATE_VERSION};
pub use error::{CrdtError, Result};
pub use map::LwwMap;
pub use seq::OrderedSeq;
