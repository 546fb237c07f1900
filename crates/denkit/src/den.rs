//! An open den: two replicated documents plus their persistence.
//!
//! A [`Den`] owns the private and shared documents for one den identifier.
//! Mutations take the document write lock, apply the change, and flush the
//! touched documents before releasing it, so concurrent readers observe
//! every multi-field update as one unit.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use denkit_caps::blob::{decrypt_blob, encrypt_blob, EncryptedBlob};
use denkit_caps::crypto::SymmetricKey;
use denkit_caps::namespace::import_namespace_key;
use denkit_core::{DenId, DocRole, Namespace};
use denkit_crdt::{DocState, Document, ReplicaId};
use denkit_store::{document_name, Storage};

use crate::entities::{
    decode_record, encode_record, new_entity_id, DropboxItem, MoodEntry, Note, NoteUpdate,
    PresenceEntry, VoiceAnalysis, VoiceMemo, DROPBOX, MOOD_ENTRIES, NOTES, PRESENCE, SETTINGS,
    SHARED_NOTES, VOICE_MEMOS, VOICE_THREAD,
};
use crate::error::{DenError, Result};

/// How long a presence beacon counts as "active", in milliseconds.
pub const PRESENCE_WINDOW_MS: i64 = 60_000;

/// Both documents of a den, guarded together so cross-document mutations
/// (shared-note mirroring) stay atomic for readers.
struct DocPair {
    private: Document,
    shared: Document,
}

/// Portable snapshot of both documents, suitable for merge-import into
/// another replica of the same den.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenExport {
    #[serde(with = "denkit_core::codec::b64")]
    pub private_state: Vec<u8>,
    #[serde(with = "denkit_core::codec::b64")]
    pub shared_state: Vec<u8>,
}

/// An open den.
///
/// Obtained from [`DenStore::open_den`](crate::denstore::DenStore::open_den);
/// cheap to clone via the surrounding `Arc`. All entity operations go through
/// here.
pub struct Den<S: Storage> {
    id: DenId,
    storage: Arc<S>,
    docs: RwLock<DocPair>,
    device_key: Option<Arc<SymmetricKey>>,
    presence_window_ms: i64,
}

impl<S: Storage> std::fmt::Debug for Den<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Den").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<S: Storage> Den<S> {
    /// Load or create both documents for a den.
    pub(crate) async fn open(
        id: DenId,
        storage: Arc<S>,
        device_key: Option<Arc<SymmetricKey>>,
        presence_window_ms: i64,
    ) -> Result<Self> {
        // A fresh replica id per open keeps stamps from colliding when the
        // same den is opened on another device or after a restart.
        let replica = ReplicaId::new(new_entity_id());
        let private = Self::load_doc(
            &storage,
            device_key.as_deref(),
            &id,
            DocRole::Private,
            replica.clone(),
        )
        .await?;
        let shared =
            Self::load_doc(&storage, device_key.as_deref(), &id, DocRole::Shared, replica).await?;

        tracing::debug!(den = %id, "opened den");
        Ok(Self {
            id,
            storage,
            docs: RwLock::new(DocPair { private, shared }),
            device_key,
            presence_window_ms,
        })
    }

    /// The den this instance serves.
    pub fn id(&self) -> &DenId {
        &self.id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notes
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a note. Shared notes are mirrored into the shared document.
    pub async fn create_note(&self, content: &str, is_shared: bool) -> Result<Note> {
        let now = now_millis();
        let note = Note {
            id: new_entity_id(),
            content: content.to_string(),
            is_shared,
            created_at: now,
            updated_at: now,
        };

        let mut docs = self.docs.write().await;
        let bytes = encode_record(&note);
        docs.private.set(NOTES, &note.id, bytes.clone());
        if is_shared {
            docs.shared.set(SHARED_NOTES, &note.id, bytes);
            self.flush_pair(&docs).await?;
        } else {
            self.flush(&docs, DocRole::Private).await?;
        }
        Ok(note)
    }

    /// Apply a partial update to a note.
    ///
    /// Toggling `is_shared` adds or removes the shared-document mirror;
    /// the private copy is never touched by sharing state.
    pub async fn update_note(&self, id: &str, update: NoteUpdate) -> Result<Note> {
        let mut docs = self.docs.write().await;
        let mut note: Note = match docs.private.get(NOTES, id) {
            Some(bytes) => decode_record(bytes)?,
            None => {
                return Err(DenError::NotFound {
                    kind: "note",
                    id: id.to_string(),
                })
            }
        };

        let was_shared = note.is_shared;
        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(is_shared) = update.is_shared {
            note.is_shared = is_shared;
        }
        note.updated_at = now_millis();

        let bytes = encode_record(&note);
        docs.private.set(NOTES, &note.id, bytes.clone());
        if note.is_shared {
            docs.shared.set(SHARED_NOTES, &note.id, bytes);
            self.flush_pair(&docs).await?;
        } else if was_shared {
            docs.shared.remove(SHARED_NOTES, &note.id);
            self.flush_pair(&docs).await?;
        } else {
            self.flush(&docs, DocRole::Private).await?;
        }
        Ok(note)
    }

    /// Delete a note and its shared mirror, if any.
    pub async fn delete_note(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().await;
        let note: Note = match docs.private.get(NOTES, id) {
            Some(bytes) => decode_record(bytes)?,
            None => {
                return Err(DenError::NotFound {
                    kind: "note",
                    id: id.to_string(),
                })
            }
        };

        docs.private.remove(NOTES, id);
        if note.is_shared {
            docs.shared.remove(SHARED_NOTES, id);
            self.flush_pair(&docs).await?;
        } else {
            self.flush(&docs, DocRole::Private).await?;
        }
        Ok(())
    }

    /// Read a single note.
    pub async fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let docs = self.docs.read().await;
        match docs.private.get(NOTES, id) {
            Some(bytes) => Ok(Some(decode_record(bytes)?)),
            None => Ok(None),
        }
    }

    /// All notes, newest first.
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let docs = self.docs.read().await;
        let mut notes = Vec::new();
        for (_, bytes) in docs.private.entries(NOTES) {
            notes.push(decode_record::<Note>(&bytes)?);
        }
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    /// Notes currently visible in the shared document, newest first.
    pub async fn list_shared_notes(&self) -> Result<Vec<Note>> {
        let docs = self.docs.read().await;
        let mut notes = Vec::new();
        for (_, bytes) in docs.shared.entries(SHARED_NOTES) {
            notes.push(decode_record::<Note>(&bytes)?);
        }
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Voice Memos
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a new voice memo reference.
    pub async fn create_voice_memo(
        &self,
        title: &str,
        duration_ms: u64,
        audio_ref: &str,
    ) -> Result<VoiceMemo> {
        let memo = VoiceMemo {
            id: new_entity_id(),
            title: title.to_string(),
            duration_ms,
            recorded_at: now_millis(),
            audio_ref: audio_ref.to_string(),
            analysis: None,
        };

        let mut docs = self.docs.write().await;
        docs.private.set(VOICE_MEMOS, &memo.id, encode_record(&memo));
        self.flush(&docs, DocRole::Private).await?;
        Ok(memo)
    }

    /// Attach a transcript and summary to an existing memo.
    pub async fn attach_voice_analysis(
        &self,
        id: &str,
        transcript: &str,
        summary: &str,
    ) -> Result<VoiceMemo> {
        let mut docs = self.docs.write().await;
        let mut memo: VoiceMemo = match docs.private.get(VOICE_MEMOS, id) {
            Some(bytes) => decode_record(bytes)?,
            None => {
                return Err(DenError::NotFound {
                    kind: "voice memo",
                    id: id.to_string(),
                })
            }
        };

        memo.analysis = Some(VoiceAnalysis {
            transcript: transcript.to_string(),
            summary: summary.to_string(),
            analyzed_at: now_millis(),
        });

        let bytes = encode_record(&memo);
        docs.private.set(VOICE_MEMOS, &memo.id, bytes.clone());
        // Keep the shared copy current when the memo was already published.
        if docs.shared.get(VOICE_THREAD, id).is_some() {
            docs.shared.set(VOICE_THREAD, &memo.id, bytes);
            self.flush_pair(&docs).await?;
        } else {
            self.flush(&docs, DocRole::Private).await?;
        }
        Ok(memo)
    }

    /// Publish a memo into the shared voice thread.
    pub async fn share_voice_memo(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().await;
        let bytes = match docs.private.get(VOICE_MEMOS, id) {
            Some(bytes) => bytes.clone(),
            None => {
                return Err(DenError::NotFound {
                    kind: "voice memo",
                    id: id.to_string(),
                })
            }
        };
        docs.shared.set(VOICE_THREAD, id, bytes);
        self.flush(&docs, DocRole::Shared).await?;
        Ok(())
    }

    /// All voice memos, newest first.
    pub async fn list_voice_memos(&self) -> Result<Vec<VoiceMemo>> {
        let docs = self.docs.read().await;
        let mut memos = Vec::new();
        for (_, bytes) in docs.private.entries(VOICE_MEMOS) {
            memos.push(decode_record::<VoiceMemo>(&bytes)?);
        }
        memos.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(memos)
    }

    /// Delete a memo and withdraw it from the shared thread, if published.
    pub async fn delete_voice_memo(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().await;
        if docs.private.get(VOICE_MEMOS, id).is_none() {
            return Err(DenError::NotFound {
                kind: "voice memo",
                id: id.to_string(),
            });
        }

        docs.private.remove(VOICE_MEMOS, id);
        if docs.shared.get(VOICE_THREAD, id).is_some() {
            docs.shared.remove(VOICE_THREAD, id);
            self.flush_pair(&docs).await?;
        } else {
            self.flush(&docs, DocRole::Private).await?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mood Journal
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a mood-journal entry.
    pub async fn add_mood_entry(&self, mood: &str, note: &str) -> Result<MoodEntry> {
        let entry = MoodEntry {
            id: new_entity_id(),
            mood: mood.to_string(),
            note: note.to_string(),
            recorded_at: now_millis(),
        };

        let mut docs = self.docs.write().await;
        docs.private
            .set(MOOD_ENTRIES, &entry.id, encode_record(&entry));
        self.flush(&docs, DocRole::Private).await?;
        Ok(entry)
    }

    /// All mood entries, newest first.
    pub async fn list_mood_entries(&self) -> Result<Vec<MoodEntry>> {
        let docs = self.docs.read().await;
        let mut entries = Vec::new();
        for (_, bytes) in docs.private.entries(MOOD_ENTRIES) {
            entries.push(decode_record::<MoodEntry>(&bytes)?);
        }
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(entries)
    }

    /// Delete a mood entry.
    pub async fn delete_mood_entry(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().await;
        if docs.private.get(MOOD_ENTRIES, id).is_none() {
            return Err(DenError::NotFound {
                kind: "mood entry",
                id: id.to_string(),
            });
        }
        docs.private.remove(MOOD_ENTRIES, id);
        self.flush(&docs, DocRole::Private).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Drop Channel
    // ─────────────────────────────────────────────────────────────────────────

    /// Leave an item in the den's drop channel.
    pub async fn drop_item(&self, from: &str, payload: Bytes) -> Result<DropboxItem> {
        let item = DropboxItem {
            id: new_entity_id(),
            from: from.to_string(),
            payload,
            dropped_at: now_millis(),
        };

        let mut docs = self.docs.write().await;
        docs.shared.append(DROPBOX, encode_record(&item));
        self.flush(&docs, DocRole::Shared).await?;
        Ok(item)
    }

    /// All dropped items, oldest first.
    pub async fn dropbox_items(&self) -> Result<Vec<DropboxItem>> {
        let docs = self.docs.read().await;
        let mut items = Vec::new();
        for (_, bytes) in docs.shared.items(DROPBOX) {
            items.push(decode_record::<DropboxItem>(&bytes)?);
        }
        Ok(items)
    }

    /// Remove one dropped item by record id.
    pub async fn remove_dropbox_item(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().await;
        let mut elem = None;
        for (elem_id, bytes) in docs.shared.items(DROPBOX) {
            let item: DropboxItem = decode_record(&bytes)?;
            if item.id == id {
                elem = Some(elem_id);
                break;
            }
        }
        let Some(elem_id) = elem else {
            return Err(DenError::NotFound {
                kind: "dropbox item",
                id: id.to_string(),
            });
        };
        docs.shared.tombstone(DROPBOX, &elem_id);
        self.flush(&docs, DocRole::Shared).await?;
        Ok(())
    }

    /// Remove every dropped item. Returns how many were removed.
    pub async fn clear_dropbox(&self) -> Result<usize> {
        let mut docs = self.docs.write().await;
        let ids: Vec<_> = docs
            .shared
            .items(DROPBOX)
            .into_iter()
            .map(|(elem_id, _)| elem_id)
            .collect();
        for elem_id in &ids {
            docs.shared.tombstone(DROPBOX, elem_id);
        }
        if !ids.is_empty() {
            self.flush(&docs, DocRole::Shared).await?;
        }
        Ok(ids.len())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a setting value under a key.
    pub async fn set_setting<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut docs = self.docs.write().await;
        docs.private.set(SETTINGS, key, encode_record(value));
        self.flush(&docs, DocRole::Private).await?;
        Ok(())
    }

    /// Read a setting value.
    pub async fn get_setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let docs = self.docs.read().await;
        match docs.private.get(SETTINGS, key) {
            Some(bytes) => Ok(Some(decode_record(bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete a setting.
    pub async fn delete_setting(&self, key: &str) -> Result<()> {
        let mut docs = self.docs.write().await;
        if docs.private.get(SETTINGS, key).is_none() {
            return Err(DenError::NotFound {
                kind: "setting",
                id: key.to_string(),
            });
        }
        docs.private.remove(SETTINGS, key);
        self.flush(&docs, DocRole::Private).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Presence
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a presence beacon for a participant.
    pub async fn record_presence(&self, participant: &str, status: &str) -> Result<PresenceEntry> {
        let entry = PresenceEntry {
            participant: participant.to_string(),
            status: status.to_string(),
            last_seen_at: now_millis(),
        };

        let mut docs = self.docs.write().await;
        docs.shared
            .set(PRESENCE, participant, encode_record(&entry));
        self.flush(&docs, DocRole::Shared).await?;
        Ok(entry)
    }

    /// Participants whose last beacon falls inside the presence window.
    pub async fn active_participants(&self) -> Result<Vec<PresenceEntry>> {
        let cutoff = now_millis() - self.presence_window_ms;
        let docs = self.docs.read().await;
        let mut active = Vec::new();
        for (_, bytes) in docs.shared.entries(PRESENCE) {
            let entry: PresenceEntry = decode_record(&bytes)?;
            if entry.last_seen_at >= cutoff {
                active.push(entry);
            }
        }
        active.sort_by(|a, b| a.participant.cmp(&b.participant));
        Ok(active)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State Transfer
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot both documents for merge-import elsewhere.
    pub async fn export(&self) -> Result<DenExport> {
        let docs = self.docs.read().await;
        Ok(DenExport {
            private_state: docs.private.encode(),
            shared_state: docs.shared.encode(),
        })
    }

    /// Merge an exported snapshot into this den.
    ///
    /// Import never discards local edits; conflicting writes resolve by the
    /// documents' own merge rules.
    pub async fn import_state(&self, export: &DenExport) -> Result<()> {
        let private_state = DocState::from_bytes(&export.private_state)?;
        let shared_state = DocState::from_bytes(&export.shared_state)?;

        let mut docs = self.docs.write().await;
        docs.private.merge(&private_state);
        docs.shared.merge(&shared_state);
        self.flush_pair(&docs).await?;
        Ok(())
    }

    /// Snapshot one shared-document segment as plain state bytes.
    pub async fn export_namespace(&self, namespace: Namespace) -> Result<Vec<u8>> {
        let docs = self.docs.read().await;
        Ok(docs.shared.state_subset(&[namespace.as_str()]).to_bytes())
    }

    /// Snapshot one shared-document segment, sealed under its namespace key.
    pub async fn export_namespace_encrypted(
        &self,
        namespace: Namespace,
        key_bytes: &[u8],
    ) -> Result<EncryptedBlob> {
        let state = self.export_namespace(namespace).await?;
        let key = import_namespace_key(key_bytes)?;
        Ok(encrypt_blob(&state, &key)?)
    }

    /// Merge a sealed segment produced by [`export_namespace_encrypted`].
    ///
    /// Only the named segment is applied; anything else riding in the
    /// snapshot is dropped, since the key only proves access to one
    /// namespace.
    pub async fn import_namespace_encrypted(
        &self,
        namespace: Namespace,
        blob: &EncryptedBlob,
        key_bytes: &[u8],
    ) -> Result<()> {
        let key = import_namespace_key(key_bytes)?;
        let plaintext = decrypt_blob(blob, &key)?;
        let mut state = DocState::from_bytes(&plaintext)?;
        let name = namespace.as_str();
        state.maps.retain(|collection, _| collection == name);
        state.seqs.retain(|collection, _| collection == name);

        let mut docs = self.docs.write().await;
        docs.shared.merge(&state);
        self.flush(&docs, DocRole::Shared).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Write one document's current state to storage.
    async fn flush(&self, docs: &DocPair, role: DocRole) -> Result<()> {
        let doc = match role {
            DocRole::Private => &docs.private,
            DocRole::Shared => &docs.shared,
        };
        let stored = Self::seal_state(self.device_key.as_deref(), doc.encode())?;
        let name = document_name(&self.id, role);
        self.storage.put_document(&name, &stored).await?;
        Ok(())
    }

    /// Write both documents. Used by mutations that touch both.
    async fn flush_pair(&self, docs: &DocPair) -> Result<()> {
        self.flush(docs, DocRole::Private).await?;
        self.flush(docs, DocRole::Shared).await?;
        Ok(())
    }

    /// Flush everything. Called on close.
    pub(crate) async fn flush_all(&self) -> Result<()> {
        let docs = self.docs.read().await;
        self.flush_pair(&docs).await
    }

    async fn load_doc(
        storage: &S,
        device_key: Option<&SymmetricKey>,
        id: &DenId,
        role: DocRole,
        replica: ReplicaId,
    ) -> Result<Document> {
        let name = document_name(id, role);
        match storage.get_document(&name).await? {
            Some(stored) => {
                let state = Self::open_state(device_key, &stored)?;
                Ok(Document::from_state(replica, state))
            }
            None => Ok(Document::new(replica)),
        }
    }

    /// Wrap state bytes for storage: sealed under the device key when the
    /// store is unlocked, raw otherwise.
    fn seal_state(device_key: Option<&SymmetricKey>, state: Vec<u8>) -> Result<Vec<u8>> {
        match device_key {
            Some(key) => {
                let blob = encrypt_blob(&state, key)?;
                let mut buf = Vec::new();
                ciborium::into_writer(&blob, &mut buf).expect("CBOR serialization failed");
                Ok(buf)
            }
            None => Ok(state),
        }
    }

    /// Inverse of [`seal_state`].
    fn open_state(device_key: Option<&SymmetricKey>, stored: &[u8]) -> Result<DocState> {
        match device_key {
            Some(key) => {
                let blob: EncryptedBlob = ciborium::from_reader(stored)
                    .map_err(|e| DenError::InvalidRecord(e.to_string()))?;
                let state = decrypt_blob(&blob, key)?;
                Ok(DocState::from_bytes(&state)?)
            }
            None => Ok(DocState::from_bytes(stored)?),
        }
    }
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
