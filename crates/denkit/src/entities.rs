//! Record types stored inside a den's documents.
//!
//! Every record is encoded as CBOR before it enters a document, so the
//! document layer only ever sees opaque bytes. Field names are camelCase on
//! the wire to match the capability payloads in `denkit-caps`.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DenError, Result};

/// Private-document collection holding [`Note`] records.
pub const NOTES: &str = "notes";
/// Private-document collection holding [`VoiceMemo`] records.
pub const VOICE_MEMOS: &str = "voiceMemos";
/// Private-document collection holding [`MoodEntry`] records.
pub const MOOD_ENTRIES: &str = "moodEntries";
/// Private-document collection holding per-den settings.
pub const SETTINGS: &str = "settings";
/// Shared-document collection mirroring notes marked as shared.
pub const SHARED_NOTES: &str = "sharedNotes";
/// Shared-document collection for voice memos published to participants.
pub const VOICE_THREAD: &str = "voiceThread";
/// Shared-document sequence for the write-only drop channel.
pub const DROPBOX: &str = "dropbox";
/// Shared-document collection for ephemeral participant presence.
pub const PRESENCE: &str = "presence";

/// Generate a fresh record identifier.
///
/// Identifiers are 16 random bytes, hex-encoded. They never contain `:` so
/// they are safe inside storage document names.
pub fn new_entity_id() -> String {
    hex::encode(denkit_core::random_bytes(16))
}

/// A text note. Lives in the private document; mirrored into the shared
/// document while `is_shared` is true.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    pub is_shared: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Partial update for a note. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    pub content: Option<String>,
    pub is_shared: Option<bool>,
}

/// Transcription and summary attached to a voice memo after the fact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAnalysis {
    pub transcript: String,
    pub summary: String,
    pub analyzed_at: i64,
}

/// A reference to a recorded voice memo.
///
/// The audio itself is not stored in the document; `audio_ref` points at it
/// in whatever blob store the caller uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMemo {
    pub id: String,
    pub title: String,
    pub duration_ms: u64,
    pub recorded_at: i64,
    pub audio_ref: String,
    pub analysis: Option<VoiceAnalysis>,
}

/// A mood-journal entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: String,
    pub mood: String,
    pub note: String,
    pub recorded_at: i64,
}

/// An item left in the den's drop channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropboxItem {
    pub id: String,
    pub from: String,
    pub payload: Bytes,
    pub dropped_at: i64,
}

/// One participant's presence beacon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub participant: String,
    pub status: String,
    pub last_seen_at: i64,
}

/// Encode a record as CBOR for document storage.
pub(crate) fn encode_record<T: Serialize>(record: &T) -> Bytes {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf).expect("CBOR serialization failed");
    Bytes::from(buf)
}

/// Decode a record previously written by [`encode_record`].
pub(crate) fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| DenError::InvalidRecord(e.to_string()))
}
