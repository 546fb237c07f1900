//! # Denkit Store
//!
//! Storage abstraction for Denkit. Provides a trait-based interface for
//! den document persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts document persistence behind the [`Storage`]
//! trait, allowing the document store to be storage-agnostic. The primary
//! implementation is [`SqliteStorage`], with [`MemoryStorage`] for tests.
//! Values are opaque bytes; encoding and encryption happen above this
//! layer.
//!
//! ## Naming
//!
//! Each den persists two documents under deterministic names built by
//! [`document_name`]: `den:<denId>:private` and `den:<denId>:shared`.
//! [`den_prefix`] covers both, so a wipe can target exactly one den.
//!
//! ## Key Types
//!
//! - [`Storage`] - The async trait for all storage operations
//! - [`SqliteStorage`] - SQLite-based persistent storage
//! - [`MemoryStorage`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use denkit_store::{SqliteStorage, Storage};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStorage::open("den.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStorage::open_memory().unwrap();
//!
//!     store.put_document("den:a:private", b"encoded state").await.unwrap();
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StorageError};
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{den_prefix, document_name, Storage};
