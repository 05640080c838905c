//! Duration resolution
//!
//! Works out how long an item plays and how many subsongs it has. The
//! precedence is: user override, content-digest lookup in the song-length
//! oracle, the song-length index file of the item's folder, then a fixed
//! default. Lookups are best-effort; resolution itself never fails.

use crate::error::PlaybackError;
use crate::sid::{self, SidHeader};
use crate::songlengths::{song_length_ms, SongLengthDatabase};
use bytes::Bytes;
use c64_core::{
    parent_folder, DurationOracle, MediaCategory, PlaylistItem, SourceKind, SourceReader,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Index files looked for next to an item, in order
pub const INDEX_FILE_NAMES: [&str; 2] = ["Songlengths.md5", "Songlengths.txt"];

/// Where a resolved duration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    /// User-supplied override on the item
    Override,
    /// Content-digest lookup in the oracle
    Oracle,
    /// Song-length index file in the item's folder
    FolderIndex,
    /// Nothing known; fixed default
    Default,
}

/// Outcome of resolving an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDuration {
    /// Effective duration in milliseconds
    pub duration_ms: u64,
    /// Number of subsongs (1 for anything but multi-song SIDs)
    pub subsong_count: u16,
    /// Which precedence level produced the duration
    pub source: DurationSource,
}

type FolderKey = (SourceKind, String);

/// Resolves effective durations for playlist items
pub struct DurationResolver {
    oracle: Option<Arc<dyn DurationOracle>>,
    reader: Option<Arc<dyn SourceReader>>,
    default_duration_ms: u64,
    folder_indexes: Mutex<HashMap<FolderKey, Option<Arc<SongLengthDatabase>>>>,
}

impl DurationResolver {
    /// Create a resolver with no lookup sources; everything resolves to
    /// overrides or the default
    pub fn new(default_duration_ms: u64) -> Self {
        Self {
            oracle: None,
            reader: None,
            default_duration_ms,
            folder_indexes: Mutex::new(HashMap::new()),
        }
    }

    /// Use a song-length oracle for digest lookups
    pub fn with_oracle(mut self, oracle: Arc<dyn DurationOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Use a source reader for item content and folder index files
    pub fn with_reader(mut self, reader: Arc<dyn SourceReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Resolve duration and subsong count for an item
    pub async fn resolve(&self, item: &PlaylistItem) -> ResolvedDuration {
        let content = if item.category == MediaCategory::Sid {
            self.content(item).await
        } else {
            None
        };

        let header = content
            .as_deref()
            .and_then(sid::parse_header)
            .unwrap_or_default();
        let subsong_count = if item.category == MediaCategory::Sid {
            header.songs
        } else {
            1
        };

        let (duration_ms, source) = self.duration(item, content.as_ref(), header).await;

        debug!(
            item_id = %item.id,
            duration_ms,
            subsong_count,
            ?source,
            "Resolved duration"
        );

        ResolvedDuration {
            duration_ms,
            subsong_count,
            source,
        }
    }

    async fn duration(
        &self,
        item: &PlaylistItem,
        content: Option<&Bytes>,
        header: SidHeader,
    ) -> (u64, DurationSource) {
        if let Some(override_ms) = item.duration_override_ms {
            return (override_ms, DurationSource::Override);
        }

        if item.category != MediaCategory::Sid {
            return (self.default_duration_ms, DurationSource::Default);
        }

        let song = item.request.song_number.unwrap_or(header.start_song);
        let digest = content.map(|bytes| format!("{:x}", md5::compute(bytes)));

        if let (Some(oracle), Some(digest)) = (&self.oracle, &digest) {
            match oracle.lookup_subsong(digest, song).await {
                Ok(Some(secs)) if secs > 0 => {
                    return (u64::from(secs) * 1000, DurationSource::Oracle);
                }
                Ok(_) => {}
                Err(e) => {
                    let err = PlaybackError::DurationLookupFailed(e.to_string());
                    warn!(item_id = %item.id, error = %err, "Song-length lookup failed");
                }
            }
        }

        if let Some(index) = self.folder_index(item).await {
            let lengths = digest
                .as_deref()
                .and_then(|d| index.lengths_by_digest(d))
                .or_else(|| index.lengths_by_name(item.request.file_name()));
            if let Some(ms) = lengths.and_then(|l| song_length_ms(l, Some(song))) {
                if ms > 0 {
                    return (u64::from(ms), DurationSource::FolderIndex);
                }
            }
        }

        (self.default_duration_ms, DurationSource::Default)
    }

    async fn content(&self, item: &PlaylistItem) -> Option<Bytes> {
        if let Some(bytes) = &item.request.inline_content {
            return Some(bytes.clone());
        }

        let reader = self.reader.as_ref()?;
        match reader.read(item.request.source_kind, &item.request.path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(item_id = %item.id, error = %e, "Item content not readable");
                None
            }
        }
    }

    /// Song-length index of the item's folder, loaded once per folder
    async fn folder_index(&self, item: &PlaylistItem) -> Option<Arc<SongLengthDatabase>> {
        let reader = self.reader.as_ref()?;
        let folder = parent_folder(&item.request.path).to_string();
        let key = (item.request.source_kind, folder);

        let mut cache = self.folder_indexes.lock().await;
        if let Some(cached) = cache.get(&key) {
            return cached.clone();
        }

        let mut loaded = None;
        for name in INDEX_FILE_NAMES {
            let path = join(&key.1, name);
            match reader.read(key.0, &path).await {
                Ok(bytes) => {
                    let db = SongLengthDatabase::parse(&String::from_utf8_lossy(&bytes));
                    debug!(path = %path, entries = db.len(), "Loaded song-length index");
                    loaded = Some(Arc::new(db));
                    break;
                }
                Err(e) => debug!(path = %path, error = %e, "No song-length index"),
            }
        }

        cache.insert(key, loaded.clone());
        loaded
    }
}

fn join(folder: &str, name: &str) -> String {
    match folder {
        "" => name.to_string(),
        "/" => format!("/{name}"),
        _ => format!("{}/{name}", folder.trim_end_matches('/')),
    }
}
