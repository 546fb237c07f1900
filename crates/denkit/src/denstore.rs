//! The den store: process-wide cache of open dens plus device-key unlock.
//!
//! One [`DenStore`] owns the storage backend and hands out [`Den`] handles.
//! The cache is the only shared mutable state in the crate; open and close
//! synchronize on it so a den is never loaded twice in one process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use denkit_caps::crypto::SymmetricKey;
use denkit_caps::device::{derive_device_key, random_salt};
use denkit_core::DenId;
use denkit_store::{den_prefix, Storage};

use crate::den::{Den, DenExport, PRESENCE_WINDOW_MS};
use crate::error::Result;

/// Meta key under which the device-key salt is persisted.
const DEVICE_SALT_META_KEY: &str = "device:salt";

/// Configuration for a [`DenStore`].
#[derive(Debug, Clone)]
pub struct DenStoreConfig {
    /// Staleness window handed to each opened den's presence queries.
    pub presence_window_ms: i64,
}

impl Default for DenStoreConfig {
    fn default() -> Self {
        Self {
            presence_window_ms: PRESENCE_WINDOW_MS,
        }
    }
}

/// Owns the storage backend and every open den.
///
/// Created locked-less: documents persist as plain state bytes. Call
/// [`unlock`](DenStore::unlock) with the device passphrase before opening
/// any den to persist them sealed under the derived device key instead. A
/// store must not mix the two modes; documents written without the key are
/// not readable through an unlocked store.
pub struct DenStore<S: Storage> {
    storage: Arc<S>,
    dens: RwLock<HashMap<DenId, Arc<Den<S>>>>,
    device_key: Option<Arc<SymmetricKey>>,
    config: DenStoreConfig,
}

impl<S: Storage> DenStore<S> {
    /// Create a den store over a storage backend.
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, DenStoreConfig::default())
    }

    /// Create a den store with explicit configuration.
    pub fn with_config(storage: S, config: DenStoreConfig) -> Self {
        Self {
            storage: Arc::new(storage),
            dens: RwLock::new(HashMap::new()),
            device_key: None,
            config,
        }
    }

    /// Get the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Whether a device key has been derived for this store.
    pub fn is_unlocked(&self) -> bool {
        self.device_key.is_some()
    }

    /// Derive the device key from a passphrase and the persisted salt.
    ///
    /// The salt is created and persisted on first unlock, so the same
    /// passphrase yields the same key across restarts. The derived key
    /// never leaves this store.
    pub async fn unlock(mut self, passphrase: &str) -> Result<Self> {
        let salt = self.load_or_create_salt().await?;
        let key = derive_device_key(passphrase, &salt)?;
        self.device_key = Some(Arc::new(key));
        tracing::debug!("derived device key");
        Ok(self)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Den Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a den, loading its documents from storage on first open.
    ///
    /// Returns the cached handle when the den is already open.
    pub async fn open_den(&self, id: &DenId) -> Result<Arc<Den<S>>> {
        if let Some(den) = self.dens.read().await.get(id) {
            return Ok(den.clone());
        }

        let mut dens = self.dens.write().await;
        // Another task may have opened it while we waited for the lock.
        if let Some(den) = dens.get(id) {
            return Ok(den.clone());
        }

        let den = Arc::new(
            Den::open(
                id.clone(),
                self.storage.clone(),
                self.device_key.clone(),
                self.config.presence_window_ms,
            )
            .await?,
        );
        dens.insert(id.clone(), den.clone());
        Ok(den)
    }

    /// Flush and evict a den. Its persisted data stays on disk.
    ///
    /// Closing a den that is not open is a no-op.
    pub async fn close_den(&self, id: &DenId) -> Result<()> {
        let den = self.dens.write().await.remove(id);
        if let Some(den) = den {
            den.flush_all().await?;
            tracing::debug!(den = %id, "closed den");
        }
        Ok(())
    }

    /// Whether a den is currently in the open cache.
    pub async fn is_den_open(&self, id: &DenId) -> bool {
        self.dens.read().await.contains_key(id)
    }

    /// Ids of every open den, sorted.
    pub async fn open_dens(&self) -> Vec<DenId> {
        let mut ids: Vec<_> = self.dens.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State Transfer & Wipe
    // ─────────────────────────────────────────────────────────────────────────

    /// Export a den's documents, opening the den if needed.
    pub async fn export_den(&self, id: &DenId) -> Result<DenExport> {
        let den = self.open_den(id).await?;
        den.export().await
    }

    /// Merge an exported snapshot into a den, opening it if needed.
    pub async fn import_den_state(&self, id: &DenId, export: &DenExport) -> Result<()> {
        let den = self.open_den(id).await?;
        den.import_state(export).await
    }

    /// Close a den and irreversibly delete its persisted bytes.
    ///
    /// There is no recovery path; callers that may need the data back must
    /// export first.
    pub async fn clear_den_local_data(&self, id: &DenId) -> Result<()> {
        self.dens.write().await.remove(id);
        let removed = self.storage.delete_by_prefix(&den_prefix(id)).await?;
        tracing::info!(den = %id, removed, "cleared den local data");
        Ok(())
    }

    /// Whether any persisted bytes exist for a den.
    ///
    /// Distinguishes a never-opened den from one with durable state.
    pub async fn den_has_local_data(&self, id: &DenId) -> Result<bool> {
        Ok(self.storage.has_prefix(&den_prefix(id)).await?)
    }

    async fn load_or_create_salt(&self) -> Result<Vec<u8>> {
        if let Some(salt) = self.storage.get_meta(DEVICE_SALT_META_KEY).await? {
            return Ok(salt);
        }
        let salt = random_salt();
        self.storage.put_meta(DEVICE_SALT_META_KEY, &salt).await?;
        Ok(salt.to_vec())
    }
}
