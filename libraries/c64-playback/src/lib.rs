//! C64 Player - Playback Orchestration
//!
//! Turns "play this file" into the right sequence of device commands and
//! keeps a playlist moving on a remote C64.
//!
//! This crate provides:
//! - Play plans per media category (SID, MOD, PRG, CRT, disk images)
//! - Disk autostart via keyboard buffer injection or a DMA boot stub
//! - Duration resolution (override, song-length oracle, folder index, default)
//! - Volume ducking across pause/resume
//! - A single-worker transition queue with stale-work cancellation
//! - Playlist controller with shuffle, repeat, auto-advance and persistence
//!
//! # Architecture
//!
//! `c64-playback` talks to the outside world only through the ports in
//! `c64-core` (`DeviceApi`, `DurationOracle`, `SourceReader`,
//! `KeyValueStore`). The HTTP device client and the storage backends live in
//! their own crates.
//!
//! # Example
//!
//! ```rust,no_run
//! use c64_core::{DeviceApi, KeyValueStore, PlayRequest, PlaylistItem};
//! use c64_playback::{PlaybackConfig, PlaylistController};
//! use std::sync::Arc;
//!
//! # async fn demo(device: Arc<dyn DeviceApi>, store: Arc<dyn KeyValueStore>) -> c64_playback::Result<()> {
//! let controller = PlaylistController::builder(device, store)
//!     .config(PlaybackConfig::for_device("u64-livingroom"))
//!     .open()
//!     .await;
//!
//! controller
//!     .add_items([PlaylistItem::new(PlayRequest::remote("/Usb0/Games/Elite.d64"))?])
//!     .await;
//! controller.play(0).await?;
//! controller.pause_resume().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod autostart;
pub mod controller;
pub mod ducking;
pub mod duration;
pub mod error;
pub mod events;
pub mod persistence;
pub mod plan;
pub mod shuffle;
pub mod sid;
pub mod songlengths;
pub mod transition;
pub mod types;

pub use autostart::{AutostartPhase, AutostartReport, AutostartSequencer, AutostartState};
pub use controller::{PlaylistController, PlaylistControllerBuilder, PlaylistSnapshot};
pub use ducking::{DuckingManager, DuckingSession, VolumeSnapshot};
pub use duration::{DurationResolver, DurationSource, ResolvedDuration};
pub use error::{PlaybackError, Result};
pub use events::{EventBus, PlaybackEvent};
pub use persistence::PlaylistStore;
pub use plan::{build_plan, PlanStep, PlayPlan};
pub use songlengths::SongLengthDatabase;
pub use transition::{AutoAdvanceTimer, CancellationToken, TransitionGuard, TransitionQueue};
pub use types::{
    AutostartConfig, AutostartStrategy, DuckingConfig, LoadMode, PlayOptions, PlaybackConfig,
    PlaybackState, PlaylistState,
};
