//! Play requests: what the user asked to play

use super::media::{file_name, MediaCategory, MediaSource};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Where a request's content lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Selected on this machine; content travels with the request
    Local,
    /// Already on the device's storage
    Remote,
}

impl SourceKind {
    /// Lowercase name used in ids and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Immutable description of one thing to play
///
/// `inline_content` is only present for local files and is never
/// serialized: it does not survive a process restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRequest {
    /// Local or remote
    pub source_kind: SourceKind,

    /// Path on the local machine or on the device
    pub path: String,

    /// File bytes for local files
    #[serde(skip)]
    pub inline_content: Option<Bytes>,

    /// Subsong to start (1-based), SID/MOD only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_number: Option<u16>,
}

impl PlayRequest {
    /// Request for a file already on the device
    pub fn remote(path: impl Into<String>) -> Self {
        Self {
            source_kind: SourceKind::Remote,
            path: path.into(),
            inline_content: None,
            song_number: None,
        }
    }

    /// Request for a local file with its content
    pub fn local(path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            source_kind: SourceKind::Local,
            path: path.into(),
            inline_content: Some(content.into()),
            song_number: None,
        }
    }

    /// Set the subsong to start
    pub fn with_song(mut self, song_number: u16) -> Self {
        self.song_number = Some(song_number);
        self
    }

    /// Category derived from the path's extension
    pub fn category(&self) -> Option<MediaCategory> {
        MediaCategory::from_path(&self.path)
    }

    /// Last segment of the path
    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }

    /// Whether the device can be pointed at this content.
    ///
    /// False for local requests whose bytes were lost (e.g. rehydrated
    /// after a restart).
    pub fn has_content(&self) -> bool {
        match self.source_kind {
            SourceKind::Remote => true,
            SourceKind::Local => self.inline_content.is_some(),
        }
    }

    /// Device-side source for this request, or `None` when local bytes
    /// are missing
    pub fn media_source(&self) -> Option<MediaSource> {
        match self.source_kind {
            SourceKind::Remote => Some(MediaSource::Path(self.path.clone())),
            SourceKind::Local => self.inline_content.as_ref().map(|data| MediaSource::Upload {
                file_name: self.file_name().to_string(),
                data: data.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_requests_reference_paths() {
        let request = PlayRequest::remote("/Usb0/tune.sid").with_song(3);
        assert!(request.has_content());
        assert_eq!(request.song_number, Some(3));
        assert_eq!(
            request.media_source(),
            Some(MediaSource::Path("/Usb0/tune.sid".to_string()))
        );
    }

    #[test]
    fn local_requests_upload_content() {
        let request = PlayRequest::local("/home/me/game.prg", vec![1u8, 8, 0]);
        match request.media_source() {
            Some(MediaSource::Upload { file_name, data }) => {
                assert_eq!(file_name, "game.prg");
                assert_eq!(&data[..], &[1, 8, 0]);
            }
            other => panic!("expected upload, got {other:?}"),
        }
    }

    #[test]
    fn inline_content_is_not_serialized() {
        let request = PlayRequest::local("/home/me/game.prg", vec![1u8, 2, 3]);
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("inline_content"));

        let restored: PlayRequest = serde_json::from_str(&json).unwrap();
        assert!(restored.inline_content.is_none());
        assert!(!restored.has_content());
        assert!(restored.media_source().is_none());
    }
}
