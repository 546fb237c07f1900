//! SQLite implementation of the Storage trait.
//!
//! This is the primary storage backend for Denkit. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StorageError};
use crate::migration;
use crate::traits::Storage;

/// SQLite-based storage implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStorage {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path.as_ref())?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.as_ref().display(), "opened sqlite storage");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn put_document(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let name = name.to_string();
        let bytes = bytes.to_vec();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StorageError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;

            conn.execute(
                "INSERT INTO documents (name, bytes, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET
                    bytes = excluded.bytes,
                    updated_at = excluded.updated_at",
                params![name, bytes, now_millis()],
            )?;

            Ok(())
        })
        .await
        .map_err(|e| StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        )))?
    }

    async fn get_document(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let name = name.to_string();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StorageError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;

            conn.query_row(
                "SELECT bytes FROM documents WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)
        })
        .await
        .map_err(|e| StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        )))?
    }

    async fn delete_document(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StorageError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;

            conn.execute("DELETE FROM documents WHERE name = ?1", params![name])?;

            Ok(())
        })
        .await
        .map_err(|e| StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        )))?
    }

    async fn list_documents(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StorageError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;

            // `_` is a LIKE wildcard and den ids may contain it, so match in Rust
            let mut stmt = conn.prepare("SELECT name FROM documents ORDER BY name")?;
            let names: Vec<String> = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(names
                .into_iter()
                .filter(|n| n.starts_with(&prefix))
                .collect())
        })
        .await
        .map_err(|e| StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        )))?
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        let prefix = prefix.to_string();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StorageError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;

            let tx = conn.transaction()?;

            let names: Vec<String> = {
                let mut stmt = tx.prepare("SELECT name FROM documents ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                names
            };

            let mut removed = 0;
            for name in names.iter().filter(|n| n.starts_with(&prefix)) {
                removed += tx.execute("DELETE FROM documents WHERE name = ?1", params![name])?;
            }

            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(|e| StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        )))?
    }

    async fn has_prefix(&self, prefix: &str) -> Result<bool> {
        let prefix = prefix.to_string();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StorageError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;

            let mut stmt = conn.prepare("SELECT name FROM documents")?;
            let names: Vec<String> = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(names.iter().any(|n| n.starts_with(&prefix)))
        })
        .await
        .map_err(|e| StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        )))?
    }

    async fn put_meta(&self, key: &str, value: &[u8]) -> Result<()> {
        let key = key.to_string();
        let value = value.to_vec();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StorageError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;

            conn.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;

            Ok(())
        })
        .await
        .map_err(|e| StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        )))?
    }

    async fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StorageError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;

            conn.query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)
        })
        .await
        .map_err(|e| StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        )))?
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = SqliteStorage::open_memory().unwrap();

        store.put_document("den:a:private", b"state-1").await.unwrap();
        let bytes = store.get_document("den:a:private").await.unwrap().unwrap();
        assert_eq!(bytes, b"state-1");

        // put replaces
        store.put_document("den:a:private", b"state-2").await.unwrap();
        let bytes = store.get_document("den:a:private").await.unwrap().unwrap();
        assert_eq!(bytes, b"state-2");
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = SqliteStorage::open_memory().unwrap();
        assert!(store.get_document("den:a:private").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_document() {
        let store = SqliteStorage::open_memory().unwrap();

        store.put_document("den:a:shared", b"bytes").await.unwrap();
        store.delete_document("den:a:shared").await.unwrap();
        assert!(store.get_document("den:a:shared").await.unwrap().is_none());

        // deleting a missing name is fine
        store.delete_document("den:a:shared").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_documents_by_prefix() {
        let store = SqliteStorage::open_memory().unwrap();

        store.put_document("den:a:private", b"1").await.unwrap();
        store.put_document("den:a:shared", b"2").await.unwrap();
        store.put_document("den:b:private", b"3").await.unwrap();

        let names = store.list_documents("den:a:").await.unwrap();
        assert_eq!(names, vec!["den:a:private", "den:a:shared"]);
    }

    #[tokio::test]
    async fn test_underscore_in_den_id_is_literal() {
        let store = SqliteStorage::open_memory().unwrap();

        store.put_document("den:my_den:private", b"1").await.unwrap();
        store.put_document("den:myxden:private", b"2").await.unwrap();

        // a LIKE-based match would treat `_` as a wildcard and return both
        let names = store.list_documents("den:my_den:").await.unwrap();
        assert_eq!(names, vec!["den:my_den:private"]);
    }

    #[tokio::test]
    async fn test_delete_by_prefix_targets_one_den() {
        let store = SqliteStorage::open_memory().unwrap();

        store.put_document("den:a:private", b"1").await.unwrap();
        store.put_document("den:a:shared", b"2").await.unwrap();
        store.put_document("den:b:private", b"3").await.unwrap();

        assert!(store.has_prefix("den:a:").await.unwrap());
        let removed = store.delete_by_prefix("den:a:").await.unwrap();
        assert_eq!(removed, 2);

        assert!(!store.has_prefix("den:a:").await.unwrap());
        assert!(store.has_prefix("den:b:").await.unwrap());
    }

    #[tokio::test]
    async fn test_meta_roundtrip() {
        let store = SqliteStorage::open_memory().unwrap();

        assert!(store.get_meta("device:salt").await.unwrap().is_none());

        store.put_meta("device:salt", &[7u8; 16]).await.unwrap();
        assert_eq!(
            store.get_meta("device:salt").await.unwrap().unwrap(),
            vec![7u8; 16]
        );

        store.put_meta("device:salt", &[9u8; 16]).await.unwrap();
        assert_eq!(
            store.get_meta("device:salt").await.unwrap().unwrap(),
            vec![9u8; 16]
        );
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("den.db");

        {
            let store = SqliteStorage::open(&path).unwrap();
            store.put_document("den:a:private", b"durable").await.unwrap();
        }

        let store = SqliteStorage::open(&path).unwrap();
        let bytes = store.get_document("den:a:private").await.unwrap().unwrap();
        assert_eq!(bytes, b"durable");
    }
}
