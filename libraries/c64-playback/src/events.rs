//! Playback Events
//!
//! Event-based communication for UI and telemetry. Events are emitted at
//! key points:
//! - Transition start and end
//! - Autostart phase changes
//! - Duration resolution
//! - Ducking snapshot and restore
//! - Playlist and transport state changes

use crate::autostart::AutostartPhase;
use crate::duration::DurationSource;
use crate::types::PlaybackState;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// A queued transition started executing
    TransitionStarted {
        /// Transition kind (`play`, `next`, `auto_advance`, ...)
        kind: String,
        /// Track instance the transition runs under
        track_instance_id: u64,
    },

    /// A queued transition settled
    TransitionFinished {
        /// Transition kind
        kind: String,
        /// Track instance the transition ran under
        track_instance_id: u64,
        /// Error message if the transition failed
        error: Option<String>,
    },

    /// The disk autostart protocol moved to a new phase
    AutostartPhaseChanged {
        /// New phase
        phase: AutostartPhase,
        /// Track instance being started
        track_instance_id: u64,
    },

    /// Duration and subsong count were resolved for an item
    DurationResolved {
        /// Item id
        item_id: String,
        /// Effective duration
        duration_ms: u64,
        /// Subsong count
        subsong_count: u16,
        /// Which lookup produced the duration
        source: DurationSource,
    },

    /// Channel levels were captured and muted
    DuckingSnapshotTaken {
        /// Number of channels captured
        channels: usize,
    },

    /// Captured channel levels were written back
    DuckingRestored {
        /// Number of channels restored
        channels: usize,
    },

    /// Transport state changed
    StateChanged {
        /// The new state
        state: PlaybackState,
    },

    /// The current item changed
    CurrentItemChanged {
        /// New current index (-1 if none)
        index: i64,
        /// Item id, if any
        item_id: Option<String>,
    },

    /// Items were added, removed or reordered
    PlaylistChanged {
        /// New playlist length
        length: usize,
    },

    /// Error surfaced to the user
    Error {
        /// Error message
        message: String,
    },
}

/// Broadcast channel for playback events
///
/// Cloning shares the channel. Sending never fails: events emitted while
/// nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlaybackEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event
    pub fn emit(&self, event: PlaybackEvent) {
        let _ = self.sender.send(event);
    }

    /// Receive events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
