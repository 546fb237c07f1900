//! # Denkit
//!
//! The unified API for denkit - local-first, end-to-end-encrypted dens
//! built from replicated documents and capability keys.
//!
//! ## Overview
//!
//! Denkit provides a portable, offline-first library for:
//!
//! - **Dens**: Per-den pairs of replicated documents (private and shared)
//!   holding notes, voice memos, mood entries, a drop channel, presence,
//!   and settings
//! - **Device keys**: Passphrase-derived, non-extractable keys sealing all
//!   local document state at rest
//! - **Namespace keys**: Per-segment symmetric keys scoping what each
//!   participant of a shared document can read
//! - **Capability grants**: DenKey payloads sealed to a recipient's public
//!   key, so an untrusted relay can carry a grant it cannot read
//!
//! ## Key Concepts
//!
//! - **Den**: Owns exactly two documents. The private one never leaves the
//!   device; the shared one is partitioned into namespaces.
//! - **Merge**: Concurrent edits across devices converge through the
//!   documents' own merge rules. Import never destroys local edits.
//! - **Wipe**: Destroying a den's local data is explicit and targets
//!   exactly that den's documents.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use denkit::{DenStore, MemoryStorage};
//! use denkit::core::DenId;
//!
//! async fn example() {
//!     let store = DenStore::new(MemoryStorage::new())
//!         .unlock("device passphrase")
//!         .await
//!         .unwrap();
//!
//!     let id = DenId::new("fox-family").unwrap();
//!     let den = store.open_den(&id).await.unwrap();
//!
//!     let note = den.create_note("welcome to the den", true).await.unwrap();
//!     den.record_presence("ember", "curled up").await.unwrap();
//!
//!     let exported = den.export().await.unwrap();
//!     println!("note {} exported {} bytes", note.id, exported.private_state.len());
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `denkit::core` - Shared primitives (DenId, Namespace, codecs)
//! - `denkit::crdt` - The replicated document engine
//! - `denkit::caps` - Keys, blob cipher, and capability bundles
//! - `denkit::storage` - Storage abstraction, SQLite and in-memory backends

pub mod den;
pub mod denstore;
pub mod entities;
pub mod error;

// Re-export component crates
pub use denkit_caps as caps;
pub use denkit_core as core;
pub use denkit_crdt as crdt;
pub use denkit_store as storage;

// Re-export main types for convenience
pub use den::{Den, DenExport, PRESENCE_WINDOW_MS};
pub use denstore::{DenStore, DenStoreConfig};
pub use entities::{
    DropboxItem, MoodEntry, Note, NoteUpdate, PresenceEntry, VoiceAnalysis, VoiceMemo,
};
pub use error::{DenError, Result};

// Re-export commonly used component types
pub use denkit_caps::blob::EncryptedBlob;
pub use denkit_caps::bundle::EncryptedBundle;
pub use denkit_caps::crypto::{KeyPair, SymmetricKey};
pub use denkit_caps::denkey::{DenKey, DenKeyScope};
pub use denkit_caps::namespace::NamespaceKeySet;
pub use denkit_core::{DenId, DocRole, Namespace};
pub use denkit_store::{MemoryStorage, SqliteStorage, Storage};
