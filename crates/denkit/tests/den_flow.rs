//! End-to-end flows through the den store facade.
//!
//! These exercise the full stack: entity operations on both documents,
//! at-rest sealing under the device key, merge-import across replicas, and
//! capability grants carrying namespace keys to another participant.

use anyhow::Result;
use bytes::Bytes;

use denkit::caps::bundle::{decrypt_bundle, encrypt_bundle};
use denkit::caps::namespace::generate_namespace_key;
use denkit::crdt::DocState;
use denkit::storage::document_name;
use denkit::{
    DenError, DenId, DenKey, DenStore, DenStoreConfig, DocRole, KeyPair, MemoryStorage, Namespace,
    NamespaceKeySet, NoteUpdate, SqliteStorage, Storage,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn den_id(name: &str) -> DenId {
    DenId::new(name).unwrap()
}

#[tokio::test]
async fn test_note_lifecycle() -> Result<()> {
    let store = DenStore::new(MemoryStorage::new());
    let den = store.open_den(&den_id("burrow")).await?;

    let first = den.create_note("dig deeper", false).await?;
    // distinct created_at so the newest-first assertion below is stable
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = den.create_note("line with moss", false).await?;

    let fetched = den.get_note(&first.id).await?.unwrap();
    assert_eq!(fetched.content, "dig deeper");
    assert!(!fetched.is_shared);

    let updated = den
        .update_note(
            &first.id,
            NoteUpdate {
                content: Some("dig much deeper".into()),
                is_shared: None,
            },
        )
        .await?;
    assert_eq!(updated.content, "dig much deeper");
    assert!(updated.updated_at >= updated.created_at);

    let notes = den.list_notes().await?;
    assert_eq!(notes.len(), 2);
    // newest first
    assert_eq!(notes[0].id, second.id);

    den.delete_note(&second.id).await?;
    assert!(den.get_note(&second.id).await?.is_none());
    assert_eq!(den.list_notes().await?.len(), 1);

    let err = den.delete_note("no-such-note").await.unwrap_err();
    assert!(matches!(err, DenError::NotFound { kind: "note", .. }));
    Ok(())
}

#[tokio::test]
async fn test_shared_note_mirroring() -> Result<()> {
    let store = DenStore::new(MemoryStorage::new());
    let den = store.open_den(&den_id("burrow")).await?;

    let note = den.create_note("field report", true).await?;

    let private = den.list_notes().await?;
    let shared = den.list_shared_notes().await?;
    assert_eq!(private.len(), 1);
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].content, "field report");

    // Unsharing withdraws the mirror but keeps the private copy.
    den.update_note(
        &note.id,
        NoteUpdate {
            content: None,
            is_shared: Some(false),
        },
    )
    .await?;

    assert_eq!(den.list_notes().await?.len(), 1);
    assert!(den.list_shared_notes().await?.is_empty());

    // Re-sharing brings the current content back.
    den.update_note(
        &note.id,
        NoteUpdate {
            content: Some("field report v2".into()),
            is_shared: Some(true),
        },
    )
    .await?;
    let shared = den.list_shared_notes().await?;
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].content, "field report v2");

    den.delete_note(&note.id).await?;
    assert!(den.list_shared_notes().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_voice_memo_flow() -> Result<()> {
    let store = DenStore::new(MemoryStorage::new());
    let den = store.open_den(&den_id("burrow")).await?;

    let memo = den
        .create_voice_memo("morning howl", 4_200, "blob://howl-1")
        .await?;
    assert!(memo.analysis.is_none());

    den.share_voice_memo(&memo.id).await?;

    let analyzed = den
        .attach_voice_analysis(&memo.id, "awoo", "a short howl")
        .await?;
    let analysis = analyzed.analysis.unwrap();
    assert_eq!(analysis.transcript, "awoo");

    // Analysis lands on the published copy too.
    let memos = den.list_voice_memos().await?;
    assert_eq!(memos.len(), 1);
    assert!(memos[0].analysis.is_some());

    den.delete_voice_memo(&memo.id).await?;
    assert!(den.list_voice_memos().await?.is_empty());

    let err = den
        .attach_voice_analysis(&memo.id, "x", "y")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DenError::NotFound {
            kind: "voice memo",
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_mood_journal() -> Result<()> {
    let store = DenStore::new(MemoryStorage::new());
    let den = store.open_den(&den_id("burrow")).await?;

    den.add_mood_entry("calm", "rain on the roof").await?;
    let spike = den.add_mood_entry("alert", "branch snapped").await?;

    let entries = den.list_mood_entries().await?;
    assert_eq!(entries.len(), 2);

    den.delete_mood_entry(&spike.id).await?;
    assert_eq!(den.list_mood_entries().await?.len(), 1);

    let err = den.delete_mood_entry(&spike.id).await.unwrap_err();
    assert!(matches!(
        err,
        DenError::NotFound {
            kind: "mood entry",
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_dropbox_flow() -> Result<()> {
    let store = DenStore::new(MemoryStorage::new());
    let den = store.open_den(&den_id("burrow")).await?;

    let a = den.drop_item("ember", Bytes::from_static(b"acorn")).await?;
    let b = den.drop_item("sage", Bytes::from_static(b"feather")).await?;
    den.drop_item("ember", Bytes::from_static(b"pebble")).await?;

    let items = den.dropbox_items().await?;
    assert_eq!(items.len(), 3);
    // oldest first
    assert_eq!(items[0].id, a.id);
    assert_eq!(items[1].from, "sage");

    den.remove_dropbox_item(&b.id).await?;
    let items = den.dropbox_items().await?;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.id != b.id));

    let err = den.remove_dropbox_item(&b.id).await.unwrap_err();
    assert!(matches!(
        err,
        DenError::NotFound {
            kind: "dropbox item",
            ..
        }
    ));

    assert_eq!(den.clear_dropbox().await?, 2);
    assert!(den.dropbox_items().await?.is_empty());
    assert_eq!(den.clear_dropbox().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_settings() -> Result<()> {
    let store = DenStore::new(MemoryStorage::new());
    let den = store.open_den(&den_id("burrow")).await?;

    den.set_setting("theme", &"dusk".to_string()).await?;
    den.set_setting("retention_days", &30u32).await?;

    let theme: Option<String> = den.get_setting("theme").await?;
    assert_eq!(theme.as_deref(), Some("dusk"));
    let days: Option<u32> = den.get_setting("retention_days").await?;
    assert_eq!(days, Some(30));
    let missing: Option<String> = den.get_setting("absent").await?;
    assert!(missing.is_none());

    den.set_setting("theme", &"dawn".to_string()).await?;
    let theme: Option<String> = den.get_setting("theme").await?;
    assert_eq!(theme.as_deref(), Some("dawn"));

    den.delete_setting("theme").await?;
    let err = den.delete_setting("theme").await.unwrap_err();
    assert!(matches!(err, DenError::NotFound { kind: "setting", .. }));
    Ok(())
}

#[tokio::test]
async fn test_presence_window() -> Result<()> {
    let config = DenStoreConfig {
        presence_window_ms: 50,
    };
    let store = DenStore::with_config(MemoryStorage::new(), config);
    let den = store.open_den(&den_id("burrow")).await?;

    den.record_presence("ember", "curled up").await?;
    den.record_presence("sage", "foraging").await?;

    let active = den.active_participants().await?;
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].participant, "ember");

    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    assert!(den.active_participants().await?.is_empty());

    // A fresh beacon reactivates just that participant.
    den.record_presence("sage", "back home").await?;
    let active = den.active_participants().await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].status, "back home");
    Ok(())
}

#[tokio::test]
async fn test_export_import_reproduces_entities() -> Result<()> {
    init_tracing();
    let id = den_id("burrow");
    let host = DenStore::new(MemoryStorage::new());
    let den = host.open_den(&id).await?;

    den.create_note("private note", false).await?;
    den.create_note("shared note", true).await?;
    den.create_voice_memo("howl", 1_000, "blob://h").await?;
    den.drop_item("ember", Bytes::from_static(b"acorn")).await?;

    let exported = host.export_den(&id).await?;

    let guest = DenStore::new(MemoryStorage::new());
    guest.import_den_state(&id, &exported).await?;
    let copy = guest.open_den(&id).await?;

    assert_eq!(copy.list_notes().await?.len(), 2);
    assert_eq!(copy.list_shared_notes().await?.len(), 1);
    assert_eq!(copy.list_voice_memos().await?.len(), 1);
    let items = copy.dropbox_items().await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].payload, Bytes::from_static(b"acorn"));
    Ok(())
}

#[tokio::test]
async fn test_import_preserves_concurrent_local_edits() -> Result<()> {
    let id = den_id("burrow");

    let theirs = DenStore::new(MemoryStorage::new());
    let their_den = theirs.open_den(&id).await?;
    their_den.create_note("from their device", false).await?;
    let exported = their_den.export().await?;

    let ours = DenStore::new(MemoryStorage::new());
    let our_den = ours.open_den(&id).await?;
    let local = our_den.create_note("from our device", false).await?;

    our_den.import_state(&exported).await?;

    let notes = our_den.list_notes().await?;
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().any(|n| n.id == local.id));
    Ok(())
}

#[tokio::test]
async fn test_clear_den_local_data() -> Result<()> {
    let id = den_id("burrow");
    let other = den_id("other.den");
    let store = DenStore::new(MemoryStorage::new());

    let den = store.open_den(&id).await?;
    den.create_note("soon gone", false).await?;
    store
        .open_den(&other)
        .await?
        .create_note("stays", false)
        .await?;

    assert!(store.den_has_local_data(&id).await?);
    store.clear_den_local_data(&id).await?;

    assert!(!store.is_den_open(&id).await);
    assert!(!store.den_has_local_data(&id).await?);
    // The wipe targets one den only.
    assert!(store.den_has_local_data(&other).await?);

    let reopened = store.open_den(&id).await?;
    assert!(reopened.list_notes().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_open_den_caching() {
    let id = den_id("burrow");
    let store = DenStore::new(MemoryStorage::new());

    // Never opened, nothing persisted.
    assert!(!store.den_has_local_data(&id).await.unwrap());
    assert!(!store.is_den_open(&id).await);

    let first = store.open_den(&id).await.unwrap();
    let second = store.open_den(&id).await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(store.is_den_open(&id).await);

    store.open_den(&den_id("annex")).await.unwrap();
    let open = store.open_dens().await;
    assert_eq!(open.len(), 2);
    assert_eq!(open[0].as_str(), "annex");

    store.close_den(&id).await.unwrap();
    assert!(!store.is_den_open(&id).await);
    // Closing again is fine.
    store.close_den(&id).await.unwrap();
}

#[tokio::test]
async fn test_sqlite_persistence_with_device_key() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dens.db");
    let id = den_id("burrow");

    {
        let store = DenStore::new(SqliteStorage::open(&path)?)
            .unlock("emberwood passphrase")
            .await?;
        assert!(store.is_unlocked());
        let den = store.open_den(&id).await?;
        den.create_note("survives restart", false).await?;

        // At rest the document is sealed; raw state decoding must fail.
        let name = document_name(&id, DocRole::Private);
        let stored = store.storage().get_document(&name).await?.unwrap();
        assert!(DocState::from_bytes(&stored).is_err());

        store.close_den(&id).await?;
    }

    let store = DenStore::new(SqliteStorage::open(&path)?)
        .unlock("emberwood passphrase")
        .await?;
    let den = store.open_den(&id).await?;
    let notes = den.list_notes().await?;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "survives restart");
    Ok(())
}

#[tokio::test]
async fn test_wrong_passphrase_cannot_open() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dens.db");
    let id = den_id("burrow");

    {
        let store = DenStore::new(SqliteStorage::open(&path)?)
            .unlock("right passphrase")
            .await?;
        store
            .open_den(&id)
            .await?
            .create_note("sealed", false)
            .await?;
        store.close_den(&id).await?;
    }

    let store = DenStore::new(SqliteStorage::open(&path)?)
        .unlock("wrong passphrase")
        .await?;
    let err = store.open_den(&id).await.unwrap_err();
    assert!(matches!(err, DenError::Caps(_)));
    Ok(())
}

#[tokio::test]
async fn test_namespace_segment_seal() -> Result<()> {
    let id = den_id("burrow");
    let host = DenStore::new(MemoryStorage::new());
    let den = host.open_den(&id).await?;
    den.create_note("posted to the den wall", true).await?;

    let notes_key = generate_namespace_key();
    let sealed = den
        .export_namespace_encrypted(Namespace::SharedNotes, &notes_key)
        .await?;

    let guest = DenStore::new(MemoryStorage::new());
    let guest_den = guest.open_den(&id).await?;
    guest_den
        .import_namespace_encrypted(Namespace::SharedNotes, &sealed, &notes_key)
        .await?;

    let shared = guest_den.list_shared_notes().await?;
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].content, "posted to the den wall");
    // The segment travels alone; nothing private came across.
    assert!(guest_den.list_notes().await?.is_empty());

    // A key for another namespace opens nothing.
    let dropbox_key = generate_namespace_key();
    let err = guest_den
        .import_namespace_encrypted(Namespace::SharedNotes, &sealed, &dropbox_key)
        .await
        .unwrap_err();
    assert!(matches!(err, DenError::Caps(_)));
    Ok(())
}

#[tokio::test]
async fn test_capability_grant_end_to_end() -> Result<()> {
    let id = den_id("burrow");
    let host = DenStore::new(MemoryStorage::new());
    let den = host.open_den(&id).await?;
    den.create_note("welcome, visitor", true).await?;

    // Host assembles a guest grant covering three of the four namespaces.
    let full = NamespaceKeySet::generate_full();
    let granted = full.subset(&[
        Namespace::SharedNotes,
        Namespace::VoiceThread,
        Namespace::Presence,
    ]);
    let den_key = DenKey::builder(id.clone())
        .key_type("guest")
        .keys(granted)
        .build();

    let visitor = KeyPair::generate();
    let bundle = encrypt_bundle(&den_key, &visitor.public_bytes())?;

    // The visitor opens the bundle and recovers exactly the granted keys.
    let received: DenKey = decrypt_bundle(&bundle, &visitor.secret_bytes())?;
    assert_eq!(received.den_id, id);
    let keys = received.keys()?;
    assert_eq!(keys.len(), 3);
    assert!(keys.get(Namespace::SharedNotes).is_some());
    assert!(keys.get(Namespace::Dropbox).is_none());

    // The recovered key opens the segment the host sealed with its own copy.
    let host_key = full.get(Namespace::SharedNotes).unwrap();
    let sealed = den
        .export_namespace_encrypted(Namespace::SharedNotes, host_key)
        .await?;

    let visitor_store = DenStore::new(MemoryStorage::new());
    let visitor_den = visitor_store.open_den(&id).await?;
    let visitor_key = keys.get(Namespace::SharedNotes).unwrap();
    visitor_den
        .import_namespace_encrypted(Namespace::SharedNotes, &sealed, visitor_key)
        .await?;

    let shared = visitor_den.list_shared_notes().await?;
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].content, "welcome, visitor");
    Ok(())
}
