//! Append-ordered sequence with tombstoned deletes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::{ElemId, Stamp};

/// One sequence element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqEntry {
    pub stamp: Stamp,
    pub value: Bytes,
    pub deleted: bool,
}

/// A replicated sequence supporting append and tombstoned delete.
///
/// Elements keep their stable [`ElemId`] forever and enumerate in
/// (stamp, id) order, so concurrent appends interleave identically on
/// every replica. A deleted element disappears from enumeration but its
/// tombstone remains mergeable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedSeq {
    entries: BTreeMap<ElemId, SeqEntry>,
}

impl OrderedSeq {
    /// An empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an element under its stable id.
    ///
    /// Inserting an id this sequence already knows is a no-op: element
    /// content never changes after creation.
    pub fn insert(&mut self, id: ElemId, stamp: Stamp, value: Bytes) {
        self.entries.entry(id).or_insert(SeqEntry {
            stamp,
            value,
            deleted: false,
        });
    }

    /// Tombstone an element. Returns false when the id was never seen.
    pub fn tombstone(&mut self, id: &ElemId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.deleted = true;
                true
            }
            None => false,
        }
    }

    /// Whether the element exists and is live.
    pub fn contains(&self, id: &ElemId) -> bool {
        self.entries.get(id).map(|e| !e.deleted).unwrap_or(false)
    }

    /// Live elements in append order.
    pub fn iter(&self) -> impl Iterator<Item = (&ElemId, &Bytes)> {
        let mut live: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.deleted)
            .collect();
        live.sort_by(|(a_id, a), (b_id, b)| (&a.stamp, *a_id).cmp(&(&b.stamp, *b_id)));
        live.into_iter().map(|(id, entry)| (id, &entry.value))
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| !e.deleted).count()
    }

    /// Whether no live elements exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge another sequence into this one.
    ///
    /// Unknown elements are adopted; for shared elements, deletion wins.
    pub fn merge(&mut self, other: &OrderedSeq) {
        for (id, entry) in &other.entries {
            match self.entries.get_mut(id) {
                Some(existing) => {
                    if entry.deleted {
                        existing.deleted = true;
                    }
                }
                None => {
                    self.entries.insert(id.clone(), entry.clone());
                }
            }
        }
    }

    /// Every element id this sequence has ever seen, tombstones included.
    pub(crate) fn element_ids(&self) -> impl Iterator<Item = &ElemId> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ReplicaId;

    fn elem(replica: &str, counter: u64) -> ElemId {
        ElemId {
            replica: ReplicaId::new(replica),
            counter,
        }
    }

    fn stamp(time: u64, replica: &str) -> Stamp {
        Stamp::new(time, ReplicaId::new(replica))
    }

    #[test]
    fn test_append_order_single_replica() {
        let mut seq = OrderedSeq::new();
        seq.insert(elem("aa", 1), stamp(1, "aa"), Bytes::from_static(b"first"));
        seq.insert(elem("aa", 2), stamp(2, "aa"), Bytes::from_static(b"second"));
        let values: Vec<_> = seq.iter().map(|(_, v)| v.as_ref().to_vec()).collect();
        assert_eq!(values, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn test_concurrent_appends_converge() {
        let mut a = OrderedSeq::new();
        a.insert(elem("aa", 1), stamp(1, "aa"), Bytes::from_static(b"a1"));

        let mut b = OrderedSeq::new();
        b.insert(elem("bb", 1), stamp(1, "bb"), Bytes::from_static(b"b1"));

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        let left: Vec<_> = ab.iter().map(|(_, v)| v.clone()).collect();
        let right: Vec<_> = ba.iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(left, right);
        assert_eq!(ab.len(), 2);
    }

    #[test]
    fn test_tombstone_removes_from_enumeration() {
        let mut seq = OrderedSeq::new();
        let id = elem("aa", 1);
        seq.insert(id.clone(), stamp(1, "aa"), Bytes::from_static(b"gone"));
        assert!(seq.tombstone(&id));
        assert_eq!(seq.len(), 0);
        assert!(!seq.contains(&id));
        // unknown ids report false
        assert!(!seq.tombstone(&elem("aa", 99)));
    }

    #[test]
    fn test_delete_wins_over_concurrent_presence() {
        let id = elem("aa", 1);

        let mut deleted = OrderedSeq::new();
        deleted.insert(id.clone(), stamp(1, "aa"), Bytes::from_static(b"v"));
        deleted.tombstone(&id);

        let mut alive = OrderedSeq::new();
        alive.insert(id.clone(), stamp(1, "aa"), Bytes::from_static(b"v"));

        alive.merge(&deleted);
        assert!(!alive.contains(&id));

        // and the other direction stays deleted too
        let mut deleted2 = deleted.clone();
        let mut alive2 = OrderedSeq::new();
        alive2.insert(id.clone(), stamp(1, "aa"), Bytes::from_static(b"v"));
        deleted2.merge(&alive2);
        assert!(!deleted2.contains(&id));
    }

    #[test]
    fn test_merge_idempotent() {
        let mut seq = OrderedSeq::new();
        seq.insert(elem("aa", 1), stamp(1, "aa"), Bytes::from_static(b"v"));
        let snapshot = seq.clone();
        seq.merge(&snapshot);
        assert_eq!(seq, snapshot);
    }
}
