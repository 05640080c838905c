//! Playlist controller - core orchestration
//!
//! Owns the playlist, current index and transport state, and composes the
//! plan builder, autostart sequencer, duration resolver and ducking manager.
//! Every operation that touches the device runs on the transition queue.

use crate::autostart::{AutostartPhase, AutostartSequencer};
use crate::ducking::{DuckingManager, DuckingSession};
use crate::duration::DurationResolver;
use crate::error::{PlaybackError, Result};
use crate::events::{EventBus, PlaybackEvent};
use crate::persistence::PlaylistStore;
use crate::plan::build_plan;
use crate::shuffle::reshuffle_tail;
use crate::transition::{AutoAdvanceTimer, CancellationToken, TransitionGuard, TransitionQueue};
use crate::types::{AutostartStrategy, PlayOptions, PlaybackConfig, PlaybackState, PlaylistState};
use c64_core::{DeviceApi, DurationOracle, KeyValueStore, PlaylistItem, PlaylistItemId, SourceReader};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// Kind of queued transition, used in events and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionKind {
    Play,
    Next,
    Previous,
    Stop,
    PauseResume,
    Remove,
    Reshuffle,
    ToggleShuffle,
    AutoAdvance,
}

impl TransitionKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Stop => "stop",
            Self::PauseResume => "pause_resume",
            Self::Remove => "remove",
            Self::Reshuffle => "reshuffle",
            Self::ToggleShuffle => "toggle_shuffle",
            Self::AutoAdvance => "auto_advance",
        }
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone)]
pub struct PlaylistSnapshot {
    /// Items in play order
    pub items: Vec<PlaylistItem>,
    /// Current index
    pub current_index: Option<usize>,
    /// Transport state
    pub state: PlaybackState,
    /// Shuffle mode
    pub shuffle_enabled: bool,
    /// Repeat mode
    pub repeat_enabled: bool,
    /// Time until auto-advance (frozen while paused)
    pub remaining: Option<Duration>,
}

struct ControllerState {
    playlist: PlaylistState,
    playback: PlaybackState,
    strategy: AutostartStrategy,
    timer: AutoAdvanceTimer,
    session: Option<DuckingSession>,
}

struct Inner {
    config: PlaybackConfig,
    device: Arc<dyn DeviceApi>,
    sequencer: AutostartSequencer,
    resolver: DurationResolver,
    ducking: Arc<DuckingManager>,
    store: PlaylistStore,
    events: EventBus,
    queue: TransitionQueue,
    guard: TransitionGuard,
    state: Mutex<ControllerState>,
}

/// Builder for [`PlaylistController`]
pub struct PlaylistControllerBuilder {
    device: Arc<dyn DeviceApi>,
    store: Arc<dyn KeyValueStore>,
    config: PlaybackConfig,
    oracle: Option<Arc<dyn DurationOracle>>,
    reader: Option<Arc<dyn SourceReader>>,
}

impl PlaylistControllerBuilder {
    /// Use a non-default configuration
    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Song-length oracle for duration lookups
    pub fn oracle(mut self, oracle: Arc<dyn DurationOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Source reader for item content and folder index files
    pub fn reader(mut self, reader: Arc<dyn SourceReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Rehydrate the persisted playlist and start the transition worker.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn open(self) -> PlaylistController {
        let config = self.config;
        let events = EventBus::new(config.event_capacity);
        let store = PlaylistStore::new(self.store, config.device_id.clone());

        let playlist = match store.load().await {
            Ok(Some(playlist)) => playlist,
            Ok(None) => PlaylistState::default(),
            Err(e) => {
                warn!(error = %e, "Could not load playlist; starting empty");
                PlaylistState::default()
            }
        };
        let strategy = store.load_strategy().await;

        let mut resolver = DurationResolver::new(config.default_duration_ms);
        if let Some(oracle) = self.oracle {
            resolver = resolver.with_oracle(oracle);
        }
        if let Some(reader) = self.reader {
            resolver = resolver.with_reader(reader);
        }

        info!(
            device_id = %config.device_id,
            items = playlist.items.len(),
            current_index = playlist.current_index_i64(),
            ?strategy,
            "Playlist controller ready"
        );

        let inner = Inner {
            sequencer: AutostartSequencer::new(
                self.device.clone(),
                config.autostart.clone(),
                events.clone(),
            ),
            ducking: Arc::new(DuckingManager::new(
                self.device.clone(),
                config.ducking.clone(),
                events.clone(),
            )),
            queue: TransitionQueue::new(config.queue_capacity),
            guard: TransitionGuard::new(),
            state: Mutex::new(ControllerState {
                playlist,
                playback: PlaybackState::Stopped,
                strategy,
                timer: AutoAdvanceTimer::default(),
                session: None,
            }),
            device: self.device,
            resolver,
            store,
            events,
            config,
        };

        PlaylistController {
            inner: Arc::new(inner),
        }
    }
}

/// Playlist and transport controller
///
/// Cheap to clone; clones share the same playlist and queue.
#[derive(Clone)]
pub struct PlaylistController {
    inner: Arc<Inner>,
}

impl PlaylistController {
    /// Start building a controller for a device and a store
    pub fn builder(
        device: Arc<dyn DeviceApi>,
        store: Arc<dyn KeyValueStore>,
    ) -> PlaylistControllerBuilder {
        PlaylistControllerBuilder {
            device,
            store,
            config: PlaybackConfig::default(),
            oracle: None,
            reader: None,
        }
    }

    // ===== Observation =====

    /// Subscribe to playback events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events.subscribe()
    }

    /// Current view of playlist and transport
    pub async fn snapshot(&self) -> PlaylistSnapshot {
        let st = self.inner.state.lock().await;
        PlaylistSnapshot {
            items: st.playlist.items.clone(),
            current_index: st.playlist.current_index,
            state: st.playback,
            shuffle_enabled: st.playlist.shuffle_enabled,
            repeat_enabled: st.playlist.repeat_enabled,
            remaining: st.timer.remaining(),
        }
    }

    /// Transport state
    pub async fn state(&self) -> PlaybackState {
        self.inner.state.lock().await.playback
    }

    /// Whether an item is playing (not paused, stopped or loading)
    pub async fn is_playing(&self) -> bool {
        self.state().await == PlaybackState::Playing
    }

    /// Current index
    pub async fn current_index(&self) -> Option<usize> {
        self.inner.state.lock().await.playlist.current_index
    }

    /// Items in play order
    pub async fn items(&self) -> Vec<PlaylistItem> {
        self.inner.state.lock().await.playlist.items.clone()
    }

    /// Track instance of the most recent transition
    pub fn track_instance_id(&self) -> u64 {
        self.inner.guard.current().track_instance_id()
    }

    /// Phase of the most recent disk autostart
    pub fn autostart_phase(&self) -> AutostartPhase {
        self.inner.sequencer.state().phase
    }

    /// Autostart strategy in use
    pub async fn autostart_strategy(&self) -> AutostartStrategy {
        self.inner.state.lock().await.strategy
    }

    // ===== Playlist editing =====

    /// Append items. Items already present (same id) get their content and
    /// file info refreshed instead. Returns how many were new.
    pub async fn add_items(&self, items: impl IntoIterator<Item = PlaylistItem>) -> usize {
        let (added, length) = {
            let mut st = self.inner.state.lock().await;
            let mut added = 0;
            for item in items {
                match st.playlist.position(&item.id) {
                    Some(pos) => {
                        let existing = &mut st.playlist.items[pos];
                        if item.request.inline_content.is_some() {
                            existing.request.inline_content = item.request.inline_content;
                        }
                        existing.size_bytes = item.size_bytes.or(existing.size_bytes);
                        existing.modified_at = item.modified_at.or(existing.modified_at);
                        debug!(item_id = %existing.id, "Refreshed existing playlist item");
                    }
                    None => {
                        st.playlist.items.push(item);
                        added += 1;
                    }
                }
            }
            (added, st.playlist.items.len())
        };

        info!(added, length, "Added playlist items");
        self.inner.events.emit(PlaybackEvent::PlaylistChanged { length });
        self.inner.persist().await;
        added
    }

    /// Remove items by id. Removing the current item stops playback.
    pub async fn remove_items(&self, ids: Vec<PlaylistItemId>) -> Result<usize> {
        let token = self.inner.guard.current();
        self.inner
            .run(TransitionKind::Remove, token, move |inner, token| async move {
                inner.remove(ids, token).await
            })
            .await
    }

    /// Remove every item
    pub async fn clear(&self) -> Result<usize> {
        let ids = self.items().await.into_iter().map(|item| item.id).collect();
        self.remove_items(ids).await
    }

    /// Turn repeat on or off
    pub async fn set_repeat(&self, enabled: bool) {
        self.inner.state.lock().await.playlist.repeat_enabled = enabled;
        self.inner.persist().await;
    }

    /// Set or clear the duration override of an item
    pub async fn set_duration_override(
        &self,
        id: &PlaylistItemId,
        duration_ms: Option<u64>,
    ) -> Result<()> {
        {
            let mut st = self.inner.state.lock().await;
            let item = st
                .playlist
                .items
                .iter_mut()
                .find(|item| &item.id == id)
                .ok_or_else(|| PlaybackError::ItemNotFound(id.to_string()))?;
            item.duration_override_ms = duration_ms;
        }
        self.inner.persist().await;
        Ok(())
    }

    /// Choose how disks are booted; persisted across restarts
    pub async fn set_autostart_strategy(&self, strategy: AutostartStrategy) -> Result<()> {
        self.inner.state.lock().await.strategy = strategy;
        self.inner.store.save_strategy(strategy).await?;
        info!(?strategy, "Autostart strategy changed");
        Ok(())
    }

    // ===== Transport =====

    /// Play the item at `index` with the configured options
    pub async fn play(&self, index: usize) -> Result<()> {
        self.play_with(index, self.inner.config.play_options).await
    }

    /// Play the item at `index` with explicit options
    pub async fn play_with(&self, index: usize, options: PlayOptions) -> Result<()> {
        let token = self.inner.guard.supersede();
        self.inner
            .run(TransitionKind::Play, token, move |inner, token| async move {
                inner.play_index(index, options, token).await
            })
            .await
    }

    /// Stop playback (the current index is kept)
    pub async fn stop(&self) -> Result<()> {
        let token = self.inner.guard.supersede();
        self.inner
            .run(TransitionKind::Stop, token, |inner, _| async move {
                inner.stop_playback().await
            })
            .await
    }

    /// Pause when playing, resume when paused. Returns the new state.
    pub async fn pause_resume(&self) -> Result<PlaybackState> {
        let token = self.inner.guard.current();
        self.inner
            .run(TransitionKind::PauseResume, token, |inner, _| async move {
                inner.toggle_pause().await
            })
            .await
    }

    /// Play the next item (wraps with repeat, otherwise clamps)
    pub async fn next(&self) -> Result<()> {
        let token = self.inner.guard.supersede();
        self.inner
            .run(TransitionKind::Next, token, |inner, token| async move {
                inner.step(true, token).await
            })
            .await
    }

    /// Play the previous item (clamps at the first)
    pub async fn previous(&self) -> Result<()> {
        let token = self.inner.guard.supersede();
        self.inner
            .run(TransitionKind::Previous, token, |inner, token| async move {
                inner.step(false, token).await
            })
            .await
    }

    /// Re-randomize the items after the current one
    pub async fn reshuffle(&self) -> Result<()> {
        let token = self.inner.guard.current();
        self.inner
            .run(TransitionKind::Reshuffle, token, |inner, _| async move {
                inner.reshuffle().await;
                Ok(())
            })
            .await
    }

    /// Flip shuffle mode; enabling it reshuffles the tail. Returns the new
    /// mode.
    pub async fn toggle_shuffle(&self) -> Result<bool> {
        let token = self.inner.guard.current();
        self.inner
            .run(TransitionKind::ToggleShuffle, token, |inner, _| async move {
                let enabled = {
                    let mut st = inner.state.lock().await;
                    st.playlist.shuffle_enabled = !st.playlist.shuffle_enabled;
                    st.playlist.shuffle_enabled
                };
                if enabled {
                    inner.reshuffle().await;
                } else {
                    inner.persist().await;
                }
                info!(enabled, "Shuffle toggled");
                Ok(enabled)
            })
            .await
    }

    /// Cancel pending auto-advance, stop the worker, restore ducked channels
    /// and save the playlist
    pub async fn shutdown(&self) {
        self.inner.guard.supersede();
        self.inner.state.lock().await.timer.cancel();
        self.inner.queue.close().await;
        self.inner.end_session().await;
        self.inner.persist().await;
        info!("Playlist controller shut down");
    }
}

impl Inner {
    /// Run a transition on the queue, wrapped in start/finish events
    async fn run<F, Fut, T>(
        self: &Arc<Self>,
        kind: TransitionKind,
        token: CancellationToken,
        transition: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<Inner>, CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(self);
        self.queue
            .enqueue(move || async move {
                let transition = transition(Arc::clone(&inner), token.clone());
                inner.run_inline(kind, token, transition).await
            })
            .await
    }

    /// Event wrapper for a transition already running on the worker
    async fn run_inline<T>(
        &self,
        kind: TransitionKind,
        token: CancellationToken,
        transition: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let track_instance_id = token.track_instance_id();
        self.events.emit(PlaybackEvent::TransitionStarted {
            kind: kind.as_str().to_string(),
            track_instance_id,
        });
        debug!(kind = kind.as_str(), track_instance_id, "Transition started");

        let result = transition.await;

        let error = result.as_ref().err().map(ToString::to_string);
        if let Some(message) = &error {
            warn!(kind = kind.as_str(), track_instance_id, error = %message, "Transition failed");
            self.events.emit(PlaybackEvent::Error {
                message: message.clone(),
            });
        }
        self.events.emit(PlaybackEvent::TransitionFinished {
            kind: kind.as_str().to_string(),
            track_instance_id,
            error,
        });
        result
    }

    async fn play_index(
        self: &Arc<Self>,
        index: usize,
        options: PlayOptions,
        token: CancellationToken,
    ) -> Result<()> {
        let target = {
            let mut st = self.state.lock().await;
            let target = if st.playlist.items.is_empty() {
                Err(PlaybackError::QueueEmpty)
            } else {
                st.playlist
                    .items
                    .get(index)
                    .cloned()
                    .ok_or(PlaybackError::IndexOutOfBounds(index))
            };
            match target {
                Ok(item) => {
                    st.timer.cancel();
                    Ok((item, st.strategy))
                }
                // A superseded play may have left the transport loading
                Err(e) if st.playback == PlaybackState::Loading => {
                    st.playback = PlaybackState::Stopped;
                    Err((e, true))
                }
                Err(e) => Err((e, false)),
            }
        };
        let (item, strategy) = match target {
            Ok(target) => target,
            Err((e, stopped)) => {
                if stopped {
                    self.emit_state(PlaybackState::Stopped);
                }
                return Err(e);
            }
        };

        // Track change ends the ducking session of the previous item
        self.end_session().await;

        {
            let mut st = self.state.lock().await;
            st.playlist.current_index = Some(index);
            st.playback = PlaybackState::Loading;
        }
        self.emit_current(index, &item);
        self.emit_state(PlaybackState::Loading);

        info!(
            index,
            item_id = %item.id,
            category = %item.category,
            track_instance_id = token.track_instance_id(),
            "Starting item"
        );

        let started = match build_plan(&item.request, &options) {
            Ok(plan) => {
                self.sequencer
                    .execute(&plan, strategy, token.track_instance_id())
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = started {
            if self.guard.is_current(&token) {
                self.state.lock().await.playback = PlaybackState::Stopped;
                self.emit_state(PlaybackState::Stopped);
                self.persist().await;
            }
            return Err(e);
        }

        let resolved = self.resolver.resolve(&item).await;
        self.events.emit(PlaybackEvent::DurationResolved {
            item_id: item.id.to_string(),
            duration_ms: resolved.duration_ms,
            subsong_count: resolved.subsong_count,
            source: resolved.source,
        });

        let current = {
            let mut st = self.state.lock().await;
            if let Some(entry) = st
                .playlist
                .items
                .get_mut(index)
                .filter(|entry| entry.id == item.id)
            {
                entry.duration_ms = Some(resolved.duration_ms);
                entry.subsong_count = Some(resolved.subsong_count);
            }

            let current = self.guard.is_current(&token);
            if current {
                st.playback = PlaybackState::Playing;
                st.session = Some(self.ducking.session());
                let weak = Arc::downgrade(self);
                st.timer.arm(
                    Duration::from_millis(resolved.duration_ms),
                    token.clone(),
                    move |token| schedule_auto_advance(&weak, token),
                );
            }
            current
        };

        if current {
            self.emit_state(PlaybackState::Playing);
        } else {
            debug!(
                track_instance_id = token.track_instance_id(),
                "Transition superseded; leaving state to the newer one"
            );
        }
        self.persist().await;
        Ok(())
    }

    async fn step(self: &Arc<Self>, forward: bool, token: CancellationToken) -> Result<()> {
        let target = {
            let st = self.state.lock().await;
            let len = st.playlist.items.len();
            if len == 0 {
                return Err(PlaybackError::QueueEmpty);
            }
            match (forward, st.playlist.current_index) {
                (_, None) => 0,
                (true, Some(i)) if i + 1 < len => i + 1,
                (true, Some(_)) if st.playlist.repeat_enabled => 0,
                (true, Some(i)) => i.min(len - 1),
                (false, Some(i)) => i.saturating_sub(1),
            }
        };
        self.play_index(target, self.config.play_options, token).await
    }

    async fn auto_advance(self: &Arc<Self>, token: CancellationToken) -> Result<()> {
        if !self.guard.is_current(&token) {
            debug!(
                track_instance_id = token.track_instance_id(),
                "Stale auto-advance ignored"
            );
            return Ok(());
        }

        let next = {
            let st = self.state.lock().await;
            if st.playback != PlaybackState::Playing {
                debug!(state = ?st.playback, "Not playing; auto-advance ignored");
                return Ok(());
            }
            let len = st.playlist.items.len();
            match st.playlist.current_index {
                Some(i) if i + 1 < len => Some(i + 1),
                Some(_) if st.playlist.repeat_enabled && len > 0 => Some(0),
                _ => None,
            }
        };

        match next {
            Some(index) => {
                info!(index, "Auto-advancing");
                self.play_index(index, self.config.play_options, token).await
            }
            None => {
                info!("End of playlist");
                self.stop_playback().await
            }
        }
    }

    async fn stop_playback(self: &Arc<Self>) -> Result<()> {
        {
            let mut st = self.state.lock().await;
            st.timer.cancel();
            st.playback = PlaybackState::Stopped;
        }
        self.end_session().await;
        self.emit_state(PlaybackState::Stopped);

        let result = self.device.reset().await.map_err(PlaybackError::from);
        self.persist().await;
        result
    }

    async fn toggle_pause(self: &Arc<Self>) -> Result<PlaybackState> {
        let state = self.state.lock().await.playback;
        match state {
            PlaybackState::Playing => {
                self.device.pause().await?;
                self.ducking.on_pause().await;
                {
                    let mut st = self.state.lock().await;
                    let remaining = st.timer.pause();
                    st.playback = PlaybackState::Paused;
                    debug!(remaining_ms = ?remaining.map(|r| r.as_millis()), "Paused");
                }
                self.emit_state(PlaybackState::Paused);
                Ok(PlaybackState::Paused)
            }
            PlaybackState::Paused => {
                self.device.resume().await?;
                self.ducking.on_resume().await;
                {
                    let mut st = self.state.lock().await;
                    st.playback = PlaybackState::Playing;
                    let token = self.guard.current();
                    match st.timer.paused_remaining() {
                        Some(remaining) if self.guard.is_current(&token) => {
                            let weak = Arc::downgrade(self);
                            st.timer.arm(remaining, token, move |token| {
                                schedule_auto_advance(&weak, token);
                            });
                        }
                        _ => debug!("No auto-advance to resume"),
                    }
                }
                self.emit_state(PlaybackState::Playing);
                Ok(PlaybackState::Playing)
            }
            other => {
                debug!(state = ?other, "Nothing to pause or resume");
                Ok(other)
            }
        }
    }

    async fn remove(
        self: &Arc<Self>,
        ids: Vec<PlaylistItemId>,
        token: CancellationToken,
    ) -> Result<usize> {
        let ids: HashSet<PlaylistItemId> = ids.into_iter().collect();

        let (removed, removed_current, stopped, was_active, length) = {
            let mut st = self.state.lock().await;
            let before = st.playlist.items.len();
            let current = st.playlist.current_index;
            let removed_current = st.playlist.current().is_some_and(|item| ids.contains(&item.id));
            let removed_before = current.map_or(0, |cur| {
                st.playlist
                    .items
                    .iter()
                    .take(cur)
                    .filter(|item| ids.contains(&item.id))
                    .count()
            });

            st.playlist.items.retain(|item| !ids.contains(&item.id));
            let was_active = st.playback != PlaybackState::Stopped;

            // A transition queued after this one owns playback from here on
            let stopped = removed_current && self.guard.supersede_if_current(&token).is_some();
            if removed_current {
                st.playlist.current_index = None;
            } else {
                st.playlist.current_index = current.map(|cur| cur - removed_before);
            }
            if stopped {
                st.timer.cancel();
                st.playback = PlaybackState::Stopped;
            }
            st.playlist.clamp_current();

            (
                before - st.playlist.items.len(),
                removed_current,
                stopped,
                was_active,
                st.playlist.items.len(),
            )
        };

        if stopped {
            self.end_session().await;
            if was_active {
                if let Err(e) = self.device.reset().await {
                    warn!(error = %e, "Reset after removing the current item failed");
                }
            }
            self.emit_state(PlaybackState::Stopped);
        } else if removed_current {
            debug!(
                track_instance_id = token.track_instance_id(),
                "Removed the current item behind a newer transition; not stopping"
            );
        }
        if removed_current {
            self.events.emit(PlaybackEvent::CurrentItemChanged {
                index: -1,
                item_id: None,
            });
        }

        info!(removed, removed_current, length, "Removed playlist items");
        self.events.emit(PlaybackEvent::PlaylistChanged { length });
        self.persist().await;
        Ok(removed)
    }

    async fn reshuffle(&self) {
        let length = {
            let mut st = self.state.lock().await;
            let current = st.playlist.current_index;
            reshuffle_tail(&mut st.playlist.items, current);
            st.playlist.items.len()
        };
        self.events.emit(PlaybackEvent::PlaylistChanged { length });
        self.persist().await;
    }

    /// End the ducking session, restoring channels if they are muted
    async fn end_session(&self) {
        let session = self.state.lock().await.session.take();
        match session {
            Some(session) => session.close().await,
            None => self.ducking.end_session().await,
        }
    }

    async fn persist(&self) {
        let playlist = self.state.lock().await.playlist.clone();
        if let Err(e) = self.store.save(&playlist).await {
            warn!(error = %e, "Failed to save playlist");
        }
    }

    fn emit_state(&self, state: PlaybackState) {
        self.events.emit(PlaybackEvent::StateChanged { state });
    }

    fn emit_current(&self, index: usize, item: &PlaylistItem) {
        self.events.emit(PlaybackEvent::CurrentItemChanged {
            index: index as i64,
            item_id: Some(item.id.to_string()),
        });
    }
}

/// Timer callback: queue an auto-advance for the instance that armed it
fn schedule_auto_advance(inner: &Weak<Inner>, token: CancellationToken) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    // The new instance starts at submission, as for user transitions
    let Some(token) = inner.guard.supersede_if_current(&token) else {
        return;
    };

    tokio::spawn(async move {
        let kind = TransitionKind::AutoAdvance;
        let queued = Arc::clone(&inner);
        let submitted = inner
            .queue
            .submit(move || async move {
                let result = queued
                    .run_inline(kind, token.clone(), queued.auto_advance(token))
                    .await;
                if let Err(e) = result {
                    debug!(error = %e, "Auto-advance failed");
                }
            })
            .await;
        if let Err(e) = submitted {
            debug!(error = %e, "Could not queue auto-advance");
        }
    });
}
