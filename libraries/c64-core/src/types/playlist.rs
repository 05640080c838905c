//! Playlist items

use super::media::MediaCategory;
use super::request::PlayRequest;
use crate::error::{C64Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable playlist item identifier
///
/// Derived from source kind, source id and path, so adding the same file
/// twice yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistItemId(String);

impl PlaylistItemId {
    /// Wrap an existing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the id for a request
    pub fn derive(request: &PlayRequest, source_id: Option<&str>) -> Self {
        let key = format!(
            "{}|{}|{}",
            request.source_kind.as_str(),
            source_id.unwrap_or_default(),
            request.path
        );
        Self(format!("{:x}", md5::compute(key.as_bytes())))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Stable id
    pub id: PlaylistItemId,

    /// What to play
    pub request: PlayRequest,

    /// Category derived from the request path
    pub category: MediaCategory,

    /// Display label
    pub label: String,

    /// Cached effective duration, refreshed when the item is played
    pub duration_ms: Option<u64>,

    /// Cached subsong count, refreshed when the item is played
    pub subsong_count: Option<u16>,

    /// User-supplied duration that wins over every lookup
    pub duration_override_ms: Option<u64>,

    /// Browser source the item came from (e.g. a local folder root)
    pub source_id: Option<String>,

    /// File size in bytes, if known
    pub size_bytes: Option<u64>,

    /// Last modification time, if known
    pub modified_at: Option<DateTime<Utc>>,

    /// When the item was added to the playlist
    pub added_at: DateTime<Utc>,
}

impl PlaylistItem {
    /// Create an item for a request.
    ///
    /// # Errors
    /// Returns `UnsupportedMedia` if the path has no recognized category.
    pub fn new(request: PlayRequest) -> Result<Self> {
        Self::with_source(request, None)
    }

    /// Create an item that remembers the browser source it came from
    pub fn with_source(request: PlayRequest, source_id: Option<String>) -> Result<Self> {
        let category = request.category().ok_or_else(|| {
            C64Error::unsupported_media(format!("unrecognized file type: {}", request.path))
        })?;
        let id = PlaylistItemId::derive(&request, source_id.as_deref());
        let label = request.file_name().to_string();
        let size_bytes = request.inline_content.as_ref().map(|c| c.len() as u64);

        Ok(Self {
            id,
            request,
            category,
            label,
            duration_ms: None,
            subsong_count: None,
            duration_override_ms: None,
            source_id,
            size_bytes,
            modified_at: None,
            added_at: Utc::now(),
        })
    }

    /// Replace the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Record file metadata
    pub fn with_file_info(mut self, size_bytes: u64, modified_at: Option<DateTime<Utc>>) -> Self {
        self.size_bytes = Some(size_bytes);
        self.modified_at = modified_at;
        self
    }

    /// Whether the item can be played right now (false for local items whose
    /// bytes were not restored)
    pub fn is_source_available(&self) -> bool {
        self.request.has_content()
    }
}
