//! # Denkit Testkit
//!
//! Testing utilities for denkit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Wire-shape vectors**: The stable field names and algorithm tags every
//!   implementation must emit, verified without relying on randomized seals
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helpers for setting up test dens and deterministic keys
//!
//! ## Wire Shapes
//!
//! ```rust
//! use denkit_testkit::vectors::verify_all_shapes;
//!
//! for (name, ok) in verify_all_shapes() {
//!     assert!(ok, "wire shape drifted: {name}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use denkit_testkit::generators::{keyset, payload};
//!
//! proptest! {
//!     #[test]
//!     fn keysets_roundtrip(set in keyset()) {
//!         let wire = set.serialize();
//!         prop_assert_eq!(NamespaceKeySet::deserialize(&wire).unwrap(), set);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use denkit_testkit::fixtures::TestDen;
//!
//! async fn example() {
//!     let fixture = TestDen::new();
//!     let den = fixture.den().await;
//!     den.create_note("hello", false).await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_keypairs, seeded_bytes, seeded_keypair, TestDen};
pub use generators::{den_id, document, keypair, keyset, namespace, namespace_subset, payload};
pub use vectors::{all_shapes, has_exact_fields, sample_value, verify_all_shapes, WireShape};
