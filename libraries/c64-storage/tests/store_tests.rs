//! Integration tests for the storage backends
//!
//! The SQLite tests use REAL database files in a temp dir so reopening
//! exercises the migrations against an existing schema.

use c64_core::{C64Error, KeyValueStore, PlayRequest, PlaylistItem, SourceKind, SourceReader};
use c64_playback::{AutostartStrategy, PlaylistState, PlaylistStore};
use c64_storage::{FsSourceReader, MemoryStore, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Test database wrapper that cleans up on drop
struct TestDb {
    url: String,
    _temp_dir: TempDir,
}

impl TestDb {
    fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        Self {
            url: format!("sqlite://{}", db_path.display()),
            _temp_dir: temp_dir,
        }
    }

    async fn open(&self) -> SqliteStore {
        SqliteStore::open(&self.url).await.expect("Failed to open store")
    }
}

fn sample_state() -> PlaylistState {
    let items = ["/Usb0/Music/Commando.sid", "/Usb0/Games/Elite.d64"]
        .into_iter()
        .map(|path| PlaylistItem::new(PlayRequest::remote(path)).unwrap())
        .collect();
    PlaylistState {
        items,
        current_index: Some(1),
        shuffle_enabled: false,
        repeat_enabled: true,
    }
}

// =============================================================================
// SQLite
// =============================================================================

#[tokio::test]
async fn test_values_survive_reopen() {
    let db = TestDb::new();
    {
        let store = db.open().await;
        store.set("playlist/u64", b"first".to_vec()).await.unwrap();
        store.set("playlist/u64", b"second".to_vec()).await.unwrap();
        store.pool().close().await;
    }

    let store = db.open().await;
    assert_eq!(
        store.get("playlist/u64").await.unwrap(),
        Some(b"second".to_vec())
    );
    assert_eq!(store.get("playlist/other").await.unwrap(), None);
}

#[tokio::test]
async fn test_keys_with_prefix() {
    let db = TestDb::new();
    let store = db.open().await;
    for key in ["playlist/b", "playlist/a", "settings/autostart-strategy", "playlist_x"] {
        store.set_value(key, b"{}").await.unwrap();
    }

    let keys = store.keys_with_prefix("playlist/").await.unwrap();
    assert_eq!(keys, vec!["playlist/a".to_string(), "playlist/b".to_string()]);
}

#[tokio::test]
async fn test_playlist_round_trips_through_sqlite() {
    let db = TestDb::new();
    let state = sample_state();
    {
        let store = PlaylistStore::new(Arc::new(db.open().await), "u64-livingroom");
        store.save(&state).await.unwrap();
        store.save_strategy(AutostartStrategy::Dma).await.unwrap();
    }

    let store = PlaylistStore::new(Arc::new(db.open().await), "u64-livingroom");
    let loaded = store.load().await.unwrap().expect("playlist should be stored");
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].id, state.items[0].id);
    assert_eq!(loaded.current_index, Some(1));
    assert!(loaded.repeat_enabled);
    assert_eq!(store.load_strategy().await, AutostartStrategy::Dma);

    // Playlists are scoped per device
    let other = PlaylistStore::new(Arc::new(db.open().await), "c64u-office");
    assert!(other.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_store_backs_playlist_store() {
    let store = PlaylistStore::new(Arc::new(MemoryStore::new()), "u64");
    assert!(store.load().await.unwrap().is_none());
    assert_eq!(store.load_strategy().await, AutostartStrategy::KeyboardBuffer);

    store.save(&sample_state()).await.unwrap();
    assert_eq!(store.load().await.unwrap().unwrap().items.len(), 2);
}

// =============================================================================
// Filesystem reader
// =============================================================================

#[tokio::test]
async fn test_reads_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Commando.sid");
    std::fs::write(&path, b"PSID").unwrap();

    let data = FsSourceReader::new()
        .read(SourceKind::Local, path.to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(&data[..], b"PSID");
}

#[tokio::test]
async fn test_reads_remote_file_from_mirror() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Usb0/Music")).unwrap();
    std::fs::write(dir.path().join("Usb0/Music/Songlengths.md5"), b"[Database]\n").unwrap();

    let reader = FsSourceReader::new().with_remote_root(dir.path());
    let data = reader
        .read(SourceKind::Remote, "/Usb0/Music/Songlengths.md5")
        .await
        .unwrap();
    assert_eq!(&data[..], b"[Database]\n");
}

#[tokio::test]
async fn test_missing_sources_are_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.prg");

    let err = FsSourceReader::new()
        .read(SourceKind::Local, missing.to_str().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, C64Error::SourceUnavailable(_)));

    let err = FsSourceReader::new()
        .read(SourceKind::Remote, "/Usb0/a.sid")
        .await
        .unwrap_err();
    assert!(matches!(err, C64Error::SourceUnavailable(_)));
}
