//! Storage trait: the abstract interface for den persistence.
//!
//! This trait keeps the document store storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests). The interface is a
//! named byte store: callers hand it already-encoded document state and
//! small metadata values; it never interprets the bytes.

use async_trait::async_trait;

use denkit_core::{DenId, DocRole};

use crate::error::Result;

/// Storage name for one of a den's two documents.
///
/// Den identifiers cannot contain `:`, so names from different dens never
/// collide and [`den_prefix`] matches exactly one den.
pub fn document_name(den_id: &DenId, role: DocRole) -> String {
    format!("den:{}:{}", den_id.as_str(), role.as_str())
}

/// Prefix covering everything a den has persisted.
pub fn den_prefix(den_id: &DenId) -> String {
    format!("den:{}:", den_id.as_str())
}

/// The Storage trait: async interface for den persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the
/// runtime.
///
/// # Design Notes
///
/// - **Opaque bytes**: document state arrives encoded (and possibly
///   encrypted); the store never looks inside.
/// - **Prefix addressing**: a den's documents share a name prefix, so one
///   wipe call can target exactly that den.
/// - **Atomic writes**: each put replaces the whole value or nothing.
#[async_trait]
pub trait Storage: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Document Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Write (or replace) a document's encoded bytes.
    async fn put_document(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Read a document's encoded bytes, if present.
    async fn get_document(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Delete one document. Deleting a missing name is not an error.
    async fn delete_document(&self, name: &str) -> Result<()>;

    /// List document names under a prefix, sorted.
    async fn list_documents(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete every document under a prefix. Returns how many were removed.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize>;

    /// Whether any document exists under a prefix.
    async fn has_prefix(&self, prefix: &str) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Metadata Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Write (or replace) a small metadata value, e.g. the device salt.
    async fn put_meta(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Read a metadata value, if present.
    async fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>>;
}
