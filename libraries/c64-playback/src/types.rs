//! Core types for playback orchestration

use c64_core::{ChannelId, Drive, PlaylistItem, PlaylistItemId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport state as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing playing
    Stopped,

    /// A transition is starting an item
    Loading,

    /// Item running on the device
    Playing,

    /// Machine frozen mid-item
    Paused,
}

/// What to do with a program once it is on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Load and start
    #[default]
    Run,

    /// Load only; the user starts it
    LoadOnly,
}

/// Options recognized by the plan builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayOptions {
    /// Run or load-only for programs and disk autostart
    #[serde(default)]
    pub load_mode: LoadMode,

    /// Drive disk images are mounted on
    #[serde(default)]
    pub drive: Drive,

    /// Reboot the machine as part of mounting a disk image
    #[serde(default = "default_true")]
    pub reset_before_mount: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            load_mode: LoadMode::Run,
            drive: Drive::A,
            reset_before_mount: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// How a freshly mounted disk gets booted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutostartStrategy {
    /// Wait for the keyboard buffer, then type the boot command into it
    #[default]
    KeyboardBuffer,

    /// Write a boot stub straight into RAM and start it
    Dma,
}

/// Timing for the keyboard-buffer autostart
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutostartConfig {
    /// Delay between readiness polls
    pub poll_interval_ms: u64,

    /// Total time to wait for the keyboard buffer before injecting anyway
    pub ready_budget_ms: u64,

    /// Time to wait for each injected chunk to drain
    pub drain_budget_ms: u64,
}

impl AutostartConfig {
    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Ready budget as a `Duration`
    pub fn ready_budget(&self) -> Duration {
        Duration::from_millis(self.ready_budget_ms)
    }

    /// Drain budget as a `Duration`
    pub fn drain_budget(&self) -> Duration {
        Duration::from_millis(self.drain_budget_ms)
    }
}

impl Default for AutostartConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            ready_budget_ms: 5_000,
            drain_budget_ms: 2_000,
        }
    }
}

/// Channels muted while paused
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckingConfig {
    /// Enabled audio channels
    pub channels: Vec<ChannelId>,

    /// Value written to mute a channel
    pub mute_value: String,
}

impl Default for DuckingConfig {
    fn default() -> Self {
        let mixer = |item: &str| ChannelId::new("Audio Mixer", item);
        Self {
            channels: vec![
                mixer("Vol UltiSid 1"),
                mixer("Vol UltiSid 2"),
                mixer("Vol Socket 1"),
                mixer("Vol Socket 2"),
            ],
            mute_value: "OFF".to_string(),
        }
    }
}

/// Playlist contents and position
///
/// `current_index` is `None` or a valid index into `items`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistState {
    /// Items in play order
    pub items: Vec<PlaylistItem>,

    /// Index of the current item
    pub current_index: Option<usize>,

    /// Shuffle mode
    pub shuffle_enabled: bool,

    /// Wrap from the last item to the first
    pub repeat_enabled: bool,
}

impl PlaylistState {
    /// The current item, if any
    pub fn current(&self) -> Option<&PlaylistItem> {
        self.current_index.and_then(|i| self.items.get(i))
    }

    /// Position of an item by id
    pub fn position(&self, id: &PlaylistItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    /// Current index in the -1-for-none convention used by events and
    /// persisted records
    pub fn current_index_i64(&self) -> i64 {
        self.current_index.map_or(-1, |i| i as i64)
    }

    /// Drop a current index that no longer points into `items`
    pub fn clamp_current(&mut self) {
        if self.current_index.is_some_and(|i| i >= self.items.len()) {
            self.current_index = None;
        }
    }
}

/// Configuration for the playlist controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Identity of the device; scopes the persisted playlist
    pub device_id: String,

    /// Duration used when nothing better is known (default: 3 minutes)
    pub default_duration_ms: u64,

    /// Plan options used when a play call does not pass its own
    pub play_options: PlayOptions,

    /// Keyboard autostart timing
    pub autostart: AutostartConfig,

    /// Pause ducking
    pub ducking: DuckingConfig,

    /// Pending transitions the queue accepts before callers wait
    pub queue_capacity: usize,

    /// Event channel capacity
    pub event_capacity: usize,
}

impl PlaybackConfig {
    /// Config for a given device, everything else default
    pub fn for_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }

    /// Default duration as a `Duration`
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device_id: "default".to_string(),
            default_duration_ms: 180_000,
            play_options: PlayOptions::default(),
            autostart: AutostartConfig::default(),
            ducking: DuckingConfig::default(),
            queue_capacity: 32,
            event_capacity: 256,
        }
    }
}
