//! Volume ducking around pauses
//!
//! The first pause of a playback session captures the level of every
//! configured mixer channel and mutes them. Resume writes the captured
//! levels back but keeps the snapshot as the session baseline, so repeated
//! pause/resume cycles never capture already-muted values. The snapshot is
//! only dropped when the session ends (stop, track change, teardown).
//!
//! Write failures are logged and never block the pause or resume itself.

use crate::error::PlaybackError;
use crate::events::{EventBus, PlaybackEvent};
use crate::types::DuckingConfig;
use c64_core::{config_batch, ChannelId, DeviceApi};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Channel levels captured at the first pause of a session
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSnapshot {
    /// Captured value per channel
    pub per_channel: BTreeMap<ChannelId, String>,

    /// When the levels were read
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct DuckingState {
    snapshot: Option<VolumeSnapshot>,
    muted: bool,
}

/// Snapshot/mute/restore of the device's audio channels
pub struct DuckingManager {
    device: Arc<dyn DeviceApi>,
    config: DuckingConfig,
    events: EventBus,
    state: Mutex<DuckingState>,
}

impl DuckingManager {
    /// Create a manager for the configured channels
    pub fn new(device: Arc<dyn DeviceApi>, config: DuckingConfig, events: EventBus) -> Self {
        Self {
            device,
            config,
            events,
            state: Mutex::new(DuckingState::default()),
        }
    }

    /// Mute for a pause. Idempotent: does nothing while already muted.
    pub async fn on_pause(&self) {
        let mut state = self.state.lock().await;
        if state.muted {
            debug!("Already ducked; ignoring pause");
            return;
        }

        if state.snapshot.is_none() {
            let snapshot = self.capture().await;
            self.events.emit(PlaybackEvent::DuckingSnapshotTaken {
                channels: snapshot.per_channel.len(),
            });
            info!(channels = snapshot.per_channel.len(), "Captured channel levels");
            state.snapshot = Some(snapshot);
        }

        if let Some(snapshot) = &state.snapshot {
            let mute = self.config.mute_value.as_str();
            let batch = config_batch(snapshot.per_channel.keys().map(|c| (c, mute)));
            self.write("mute", &batch).await;
        }
        state.muted = true;
    }

    /// Restore captured levels for a resume. Keeps the snapshot.
    pub async fn on_resume(&self) {
        let mut state = self.state.lock().await;
        if !state.muted {
            debug!("Not ducked; ignoring resume");
            return;
        }

        self.restore(&state).await;
        state.muted = false;
    }

    /// End the session: restore if muted, then drop the snapshot
    pub async fn end_session(&self) {
        let mut state = self.state.lock().await;
        if state.muted {
            self.restore(&state).await;
        }
        if state.snapshot.is_some() {
            debug!("Ducking session ended");
        }
        *state = DuckingState::default();
    }

    /// Whether channels are currently muted
    pub async fn is_muted(&self) -> bool {
        self.state.lock().await.muted
    }

    /// The session's snapshot, if one was taken
    pub async fn snapshot(&self) -> Option<VolumeSnapshot> {
        self.state.lock().await.snapshot.clone()
    }

    /// Guard that ends the session when dropped
    pub fn session(self: &Arc<Self>) -> DuckingSession {
        DuckingSession {
            manager: Some(Arc::clone(self)),
        }
    }

    async fn capture(&self) -> VolumeSnapshot {
        let mut per_channel = BTreeMap::new();
        for channel in &self.config.channels {
            match self
                .device
                .get_config_value(&channel.category, &channel.item)
                .await
            {
                Ok(value) => {
                    per_channel.insert(channel.clone(), value);
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Could not read channel level; leaving it alone");
                }
            }
        }

        VolumeSnapshot {
            per_channel,
            captured_at: Utc::now(),
        }
    }

    async fn restore(&self, state: &DuckingState) {
        let Some(snapshot) = &state.snapshot else {
            return;
        };

        let batch = config_batch(
            snapshot
                .per_channel
                .iter()
                .map(|(channel, value)| (channel, value.as_str())),
        );
        self.write("restore", &batch).await;
        self.events.emit(PlaybackEvent::DuckingRestored {
            channels: snapshot.per_channel.len(),
        });
    }

    async fn write(&self, action: &str, batch: &c64_core::ConfigBatch) {
        if batch.is_empty() {
            return;
        }
        if let Err(e) = self.device.batch_set_config_values(batch).await {
            let err = PlaybackError::DuckingWriteFailed(e.to_string());
            warn!(action, error = %err, "Ducking write failed");
        }
    }
}

/// Scoped ducking session
///
/// Dropping the guard ends the session on the current tokio runtime, so a
/// teardown while paused still restores the channels. Call
/// [`DuckingSession::close`] to end it deterministically.
pub struct DuckingSession {
    manager: Option<Arc<DuckingManager>>,
}

impl DuckingSession {
    /// End the session and wait for the restore to finish
    pub async fn close(mut self) {
        if let Some(manager) = self.manager.take() {
            manager.end_session().await;
        }
    }
}

impl Drop for DuckingSession {
    fn drop(&mut self) {
        let Some(manager) = self.manager.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { manager.end_session().await });
            }
            Err(_) => warn!("Ducking session dropped outside a runtime; levels not restored"),
        }
    }
}
