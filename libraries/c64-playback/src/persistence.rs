//! Playlist persistence
//!
//! The playlist is stored as one JSON record per device under
//! `playlist/{device_id}`. Records carry a schema version; older versions
//! are migrated on load and unknown future versions are ignored.
//!
//! Inline content of local items is never stored, so those items come back
//! without bytes and report `is_source_available() == false` until re-added.

use crate::error::{PlaybackError, Result};
use crate::types::{AutostartStrategy, PlaylistState};
use c64_core::{KeyValueStore, MediaCategory, PlayRequest, PlaylistItem, PlaylistItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Current playlist record version
pub const PLAYLIST_SCHEMA_VERSION: u32 = 2;

/// Key of the persisted autostart strategy
pub const AUTOSTART_STRATEGY_KEY: &str = "settings/autostart-strategy";

/// Store key of a device's playlist
pub fn playlist_key(device_id: &str) -> String {
    format!("playlist/{device_id}")
}

/// Persisted playlist (current schema)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistRecord {
    /// Schema version
    pub version: u32,
    /// Device the playlist belongs to
    pub device_id: String,
    /// Items in play order
    pub items: Vec<PlaylistItem>,
    /// Current index, -1 if none
    pub current_index: i64,
    /// Shuffle mode
    pub shuffle_enabled: bool,
    /// Repeat mode
    pub repeat_enabled: bool,
    /// When the record was written
    pub saved_at: DateTime<Utc>,
}

/// Version 1 item: durations in whole seconds, no overrides
#[derive(Debug, Deserialize)]
struct ItemV1 {
    id: PlaylistItemId,
    request: PlayRequest,
    category: MediaCategory,
    label: String,
    duration_secs: Option<u64>,
    subsong_count: Option<u16>,
    source_id: Option<String>,
    size_bytes: Option<u64>,
    modified_at: Option<DateTime<Utc>>,
    added_at: DateTime<Utc>,
}

/// Version 1 record: no shuffle or repeat flags
#[derive(Debug, Deserialize)]
struct RecordV1 {
    items: Vec<ItemV1>,
    current_index: i64,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

impl From<ItemV1> for PlaylistItem {
    fn from(v1: ItemV1) -> Self {
        Self {
            id: v1.id,
            request: v1.request,
            category: v1.category,
            label: v1.label,
            duration_ms: v1.duration_secs.map(|secs| secs * 1000),
            subsong_count: v1.subsong_count,
            duration_override_ms: None,
            source_id: v1.source_id,
            size_bytes: v1.size_bytes,
            modified_at: v1.modified_at,
            added_at: v1.added_at,
        }
    }
}

fn index_from_i64(index: i64) -> Option<usize> {
    usize::try_from(index).ok()
}

/// Serialize a playlist for a device
pub fn encode(state: &PlaylistState, device_id: &str) -> Result<Vec<u8>> {
    let record = PlaylistRecord {
        version: PLAYLIST_SCHEMA_VERSION,
        device_id: device_id.to_string(),
        items: state.items.clone(),
        current_index: state.current_index_i64(),
        shuffle_enabled: state.shuffle_enabled,
        repeat_enabled: state.repeat_enabled,
        saved_at: Utc::now(),
    };
    serde_json::to_vec(&record).map_err(|e| PlaybackError::Persistence(e.to_string()))
}

/// Deserialize a playlist record, migrating old versions.
///
/// Returns `Ok(None)` for records written by a newer schema.
pub fn decode(bytes: &[u8]) -> Result<Option<PlaylistState>> {
    let header: VersionHeader =
        serde_json::from_slice(bytes).map_err(|e| PlaybackError::Persistence(e.to_string()))?;

    let mut state = match header.version {
        1 => {
            let v1: RecordV1 = serde_json::from_slice(bytes)
                .map_err(|e| PlaybackError::Persistence(e.to_string()))?;
            debug!(items = v1.items.len(), "Migrating version 1 playlist record");
            PlaylistState {
                items: v1.items.into_iter().map(PlaylistItem::from).collect(),
                current_index: index_from_i64(v1.current_index),
                shuffle_enabled: false,
                repeat_enabled: false,
            }
        }
        PLAYLIST_SCHEMA_VERSION => {
            let record: PlaylistRecord = serde_json::from_slice(bytes)
                .map_err(|e| PlaybackError::Persistence(e.to_string()))?;
            PlaylistState {
                items: record.items,
                current_index: index_from_i64(record.current_index),
                shuffle_enabled: record.shuffle_enabled,
                repeat_enabled: record.repeat_enabled,
            }
        }
        other => {
            warn!(version = other, "Ignoring playlist record from a newer version");
            return Ok(None);
        }
    };

    state.clamp_current();
    Ok(Some(state))
}

/// Playlist and settings persistence for one device
#[derive(Clone)]
pub struct PlaylistStore {
    store: Arc<dyn KeyValueStore>,
    device_id: String,
}

impl PlaylistStore {
    /// Create a store scoped to a device
    pub fn new(store: Arc<dyn KeyValueStore>, device_id: impl Into<String>) -> Self {
        Self {
            store,
            device_id: device_id.into(),
        }
    }

    /// Load the device's playlist.
    ///
    /// Unreadable and future-version records are logged and treated as
    /// absent.
    pub async fn load(&self) -> Result<Option<PlaylistState>> {
        let key = playlist_key(&self.device_id);
        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(None);
        };

        match decode(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable playlist record");
                Ok(None)
            }
        }
    }

    /// Save the device's playlist
    pub async fn save(&self, state: &PlaylistState) -> Result<()> {
        let bytes = encode(state, &self.device_id)?;
        self.store
            .set(&playlist_key(&self.device_id), bytes)
            .await?;
        Ok(())
    }

    /// Persisted autostart strategy, default if unset or unreadable
    pub async fn load_strategy(&self) -> AutostartStrategy {
        match self.store.get(AUTOSTART_STRATEGY_KEY).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "Unreadable autostart strategy; using default");
                AutostartStrategy::default()
            }),
            Ok(None) => AutostartStrategy::default(),
            Err(e) => {
                warn!(error = %e, "Could not load autostart strategy; using default");
                AutostartStrategy::default()
            }
        }
    }

    /// Persist the autostart strategy
    pub async fn save_strategy(&self, strategy: AutostartStrategy) -> Result<()> {
        let bytes =
            serde_json::to_vec(&strategy).map_err(|e| PlaybackError::Persistence(e.to_string()))?;
        self.store.set(AUTOSTART_STRATEGY_KEY, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MapStore(Mutex<HashMap<String, Vec<u8>>>);

    #[async_trait]
    impl KeyValueStore for MapStore {
        async fn get(&self, key: &str) -> c64_core::Result<Option<Vec<u8>>> {
            Ok(self.0.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: Vec<u8>) -> c64_core::Result<()> {
            self.0.lock().await.insert(key.to_string(), value);
            Ok(())
        }
    }

    fn sample_state() -> PlaylistState {
        let mut local = PlaylistItem::new(PlayRequest::local("/home/me/a.sid", vec![1u8, 2])).unwrap();
        local.duration_override_ms = Some(90_000);
        let remote = PlaylistItem::new(PlayRequest::remote("/Usb0/b.d64")).unwrap();
        PlaylistState {
            items: vec![local, remote],
            current_index: Some(1),
            shuffle_enabled: true,
            repeat_enabled: true,
        }
    }

    #[tokio::test]
    async fn save_and_load_drops_inline_content_only() {
        let store = PlaylistStore::new(Arc::new(MapStore::default()), "u64-kitchen");
        let state = sample_state();
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.current_index, Some(1));
        assert!(loaded.shuffle_enabled && loaded.repeat_enabled);
        assert_eq!(loaded.items[0].id, state.items[0].id);
        assert_eq!(loaded.items[0].duration_override_ms, Some(90_000));
        assert!(!loaded.items[0].is_source_available());
        assert!(loaded.items[1].is_source_available());
    }

    #[tokio::test]
    async fn playlists_are_scoped_per_device() {
        let backend = Arc::new(MapStore::default());
        PlaylistStore::new(backend.clone(), "one")
            .save(&sample_state())
            .await
            .unwrap();

        let other = PlaylistStore::new(backend.clone(), "two");
        assert!(other.load().await.unwrap().is_none());
        assert!(backend.0.lock().await.contains_key("playlist/one"));
    }

    #[test]
    fn version_one_records_are_migrated() {
        let v1 = serde_json::json!({
            "version": 1,
            "device_id": "old",
            "current_index": 0,
            "items": [{
                "id": "abc",
                "request": { "source_kind": "remote", "path": "/Usb0/a.sid" },
                "category": "sid",
                "label": "a.sid",
                "duration_secs": 125,
                "subsong_count": 3,
                "source_id": null,
                "size_bytes": 4096,
                "modified_at": null,
                "added_at": "2024-01-01T00:00:00Z"
            }]
        });

        let state = decode(&serde_json::to_vec(&v1).unwrap()).unwrap().unwrap();
        assert_eq!(state.items[0].duration_ms, Some(125_000));
        assert_eq!(state.items[0].subsong_count, Some(3));
        assert_eq!(state.current_index, Some(0));
        assert!(!state.shuffle_enabled);
    }

    #[test]
    fn future_versions_are_ignored() {
        let record = br#"{"version": 9, "items": "whatever"}"#;
        assert!(decode(record).unwrap().is_none());
    }

    #[test]
    fn stale_current_index_is_cleared() {
        let mut state = sample_state();
        state.current_index = Some(1);
        let mut bytes: serde_json::Value =
            serde_json::from_slice(&encode(&state, "d").unwrap()).unwrap();
        bytes["current_index"] = serde_json::json!(5);

        let loaded = decode(&serde_json::to_vec(&bytes).unwrap()).unwrap().unwrap();
        assert_eq!(loaded.current_index, None);
    }

    #[tokio::test]
    async fn corrupt_records_load_as_empty() {
        let backend = Arc::new(MapStore::default());
        backend
            .set("playlist/d", b"{not json".to_vec())
            .await
            .unwrap();
        let store = PlaylistStore::new(backend, "d");
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn autostart_strategy_round_trips_through_settings_key() {
        let backend = Arc::new(MapStore::default());
        let store = PlaylistStore::new(backend.clone(), "d");
        assert_eq!(store.load_strategy().await, AutostartStrategy::KeyboardBuffer);

        store.save_strategy(AutostartStrategy::Dma).await.unwrap();
        assert_eq!(store.load_strategy().await, AutostartStrategy::Dma);
        assert_eq!(
            backend.0.lock().await.get(AUTOSTART_STRATEGY_KEY).cloned(),
            Some(b"\"dma\"".to_vec())
        );
    }
}
