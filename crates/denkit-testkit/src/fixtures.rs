//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use denkit::{Den, DenId, DenStore, MemoryStorage};
use denkit_caps::crypto::KeyPair;

/// A test fixture with an in-memory den store and one den id.
pub struct TestDen {
    pub store: DenStore<MemoryStorage>,
    pub id: DenId,
}

impl TestDen {
    /// Create a fixture around a den named `test-den`.
    pub fn new() -> Self {
        Self::with_id("test-den")
    }

    /// Create a fixture around a specific den id.
    pub fn with_id(name: &str) -> Self {
        Self {
            store: DenStore::new(MemoryStorage::new()),
            id: DenId::new(name).expect("fixture den id must be valid"),
        }
    }

    /// Open the fixture's den.
    pub async fn den(&self) -> Arc<Den<MemoryStorage>> {
        self.store
            .open_den(&self.id)
            .await
            .expect("memory-backed den open cannot fail")
    }
}

impl Default for TestDen {
    fn default() -> Self {
        Self::new()
    }
}

/// A deterministic keypair from a one-byte seed.
pub fn seeded_keypair(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes([seed; 32])
}

/// Distinct deterministic keypairs for multi-party tests.
pub fn multi_party_keypairs(count: usize) -> Vec<KeyPair> {
    (0..count).map(|i| seeded_keypair(i as u8)).collect()
}

/// Deterministic pseudo-random bytes for payload fixtures.
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}
