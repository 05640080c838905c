//! Error types for playback orchestration

use c64_core::C64Error;
use thiserror::Error;

/// Playback errors
///
/// `MountFailed`, `DeviceUnreachable`, `UploadFailed` and the other
/// fatal kinds abort the current transition. `AutostartTimingDegraded`,
/// `DurationLookupFailed` and `DuckingWriteFailed` are only ever logged;
/// the transition carries on with best-effort defaults.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Device could not be reached
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(String),

    /// Unrecognized or unplayable category
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// Uploading content to the device failed
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Mounting a disk image failed
    #[error("Mount failed: {0}")]
    MountFailed(String),

    /// Keyboard buffer never drained within the poll budget
    #[error("Autostart timing degraded: keyboard buffer still busy after {waited_ms} ms")]
    AutostartTimingDegraded {
        /// How long the sequencer polled before giving up
        waited_ms: u64,
    },

    /// Song-length lookup failed; default duration applied
    #[error("Duration lookup failed: {0}")]
    DurationLookupFailed(String),

    /// Writing mute/restore values failed
    #[error("Ducking write failed: {0}")]
    DuckingWriteFailed(String),

    /// Any other device command failure
    #[error("Device command failed: {0}")]
    Device(C64Error),

    /// Local item whose content was not restored after a restart
    #[error("Source content missing for '{0}'; re-add it from its source")]
    MissingSource(String),

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// No playlist item with this id
    #[error("Playlist item not found: {0}")]
    ItemNotFound(String),

    /// Playlist is empty
    #[error("Playlist is empty")]
    QueueEmpty,

    /// Playlist could not be saved or loaded
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The transition worker has shut down
    #[error("Transition queue closed")]
    QueueClosed,

    /// A transition task panicked or was aborted
    #[error("Transition aborted: {0}")]
    TransitionAborted(String),
}

impl PlaybackError {
    /// Whether the error aborts a transition (as opposed to being logged
    /// and worked around)
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::AutostartTimingDegraded { .. }
                | Self::DurationLookupFailed(_)
                | Self::DuckingWriteFailed(_)
        )
    }

    /// Classify a failed mount
    pub fn mount(err: C64Error) -> Self {
        match err {
            C64Error::DeviceUnreachable(msg) => Self::DeviceUnreachable(msg),
            other => Self::MountFailed(other.to_string()),
        }
    }
}

impl From<C64Error> for PlaybackError {
    fn from(err: C64Error) -> Self {
        match err {
            C64Error::DeviceUnreachable(msg) => Self::DeviceUnreachable(msg),
            C64Error::UploadFailed(msg) => Self::UploadFailed(msg),
            C64Error::UnsupportedMedia(msg) => Self::UnsupportedMedia(msg),
            C64Error::Storage(msg) => Self::Persistence(msg),
            other => Self::Device(other),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
