//! In-memory implementation of the Storage trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::Storage;

/// In-memory storage implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStorage {
    inner: RwLock<MemoryStorageInner>,
}

struct MemoryStorageInner {
    /// Document bytes indexed by name.
    documents: HashMap<String, Vec<u8>>,

    /// Metadata values indexed by key.
    meta: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStorageInner {
                documents: HashMap::new(),
                meta: HashMap::new(),
            }),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put_document(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.documents.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get_document(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.documents.get(name).cloned())
    }

    async fn delete_document(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.documents.remove(name);
        Ok(())
    }

    async fn list_documents(&self, prefix: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().unwrap();
        let mut names: Vec<String> = inner
            .documents
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        let mut inner = self.inner.write().unwrap();
        let names: Vec<String> = inner
            .documents
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        for name in &names {
            inner.documents.remove(name);
        }
        Ok(names.len())
    }

    async fn has_prefix(&self, prefix: &str) -> Result<bool> {
        let inner = self.inner.read().unwrap();
        Ok(inner.documents.keys().any(|name| name.starts_with(prefix)))
    }

    async fn put_meta(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.meta.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.meta.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_basic() {
        let store = MemoryStorage::new();

        store.put_document("den:a:private", b"bytes").await.unwrap();
        assert_eq!(
            store.get_document("den:a:private").await.unwrap().unwrap(),
            b"bytes"
        );

        store.delete_document("den:a:private").await.unwrap();
        assert!(store.get_document("den:a:private").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_prefix_operations() {
        let store = MemoryStorage::new();

        store.put_document("den:a:private", b"1").await.unwrap();
        store.put_document("den:a:shared", b"2").await.unwrap();
        store.put_document("den:b:private", b"3").await.unwrap();

        assert_eq!(
            store.list_documents("den:a:").await.unwrap(),
            vec!["den:a:private", "den:a:shared"]
        );

        assert_eq!(store.delete_by_prefix("den:a:").await.unwrap(), 2);
        assert!(!store.has_prefix("den:a:").await.unwrap());
        assert!(store.has_prefix("den:b:").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_meta() {
        let store = MemoryStorage::new();

        assert!(store.get_meta("device:salt").await.unwrap().is_none());
        store.put_meta("device:salt", &[1u8; 16]).await.unwrap();
        assert_eq!(
            store.get_meta("device:salt").await.unwrap().unwrap(),
            vec![1u8; 16]
        );
    }
}
