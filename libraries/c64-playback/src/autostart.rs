//! Autostart Sequencer
//!
//! Executes a play plan against the device. Non-disk plans are a single
//! runner command. Disk plans go through the boot protocol:
//!
//! ```text
//! Idle -> Mounting -> Rebooting -> AwaitingReady -> Injecting -> Running
//!                              \-> WritingBootProgram ---------/
//! ```
//!
//! with `Failed` reachable from every phase on a device error. The keyboard
//! strategy waits for the ROM's keyboard buffer to empty, then types the
//! boot command into it. The DMA strategy writes a BASIC boot stub straight
//! into RAM and queues `RUN`, with no polling.

use crate::error::{PlaybackError, Result};
use crate::events::{EventBus, PlaybackEvent};
use crate::plan::{PlanStep, PlayPlan};
use crate::types::{AutostartConfig, AutostartStrategy, LoadMode};
use c64_core::{DeviceApi, Drive};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Start of the ROM keyboard buffer
pub const KEYBOARD_BUFFER: u16 = 0x0277;

/// Number of pending keystrokes in the keyboard buffer
pub const KEYBOARD_PENDING: u16 = 0x00C6;

/// Capacity of the keyboard buffer
pub const KEYBOARD_BUFFER_LEN: usize = 10;

/// Start of BASIC program text
pub const BASIC_START: u16 = 0x0801;

/// Pointer to the end of BASIC program text (start of variables)
pub const BASIC_END_POINTER: u16 = 0x002D;

/// BASIC token for `LOAD`
const TOKEN_LOAD: u8 = 0x93;

/// Phase of the disk boot protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutostartPhase {
    /// Nothing in flight
    Idle,
    /// Mounting the image
    Mounting,
    /// Rebooting against the new medium
    Rebooting,
    /// Waiting for the keyboard buffer to empty
    AwaitingReady,
    /// Typing the boot command
    Injecting,
    /// Writing the boot stub (DMA strategy)
    WritingBootProgram,
    /// Boot command delivered
    Running,
    /// A device command failed
    Failed,
}

/// Transient state of the transition being started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutostartState {
    /// Current phase
    pub phase: AutostartPhase,
    /// Track instance the sequence runs for
    pub track_instance_id: u64,
    /// When the sequence started
    pub started_at: Instant,
}

/// What a successful sequence had to put up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutostartReport {
    /// Set when the keyboard buffer never emptied and injection went ahead
    /// anyway; holds how long the sequencer waited
    pub timing_degraded_ms: Option<u64>,
}

/// Keystrokes that boot a disk in `drive`
pub fn boot_command(drive: Drive, load_mode: LoadMode) -> Vec<u8> {
    let run = match load_mode {
        LoadMode::Run => ":RUN",
        LoadMode::LoadOnly => "",
    };
    format!("LOAD\"*\",{},1{run}\r", drive.device_number()).into_bytes()
}

/// Tokenized BASIC program `0 LOAD"*",<dev>`
///
/// A LOAD executed from a running program chain-starts what it loaded.
pub fn boot_stub(drive: Drive) -> Vec<u8> {
    let mut line = vec![0x00, 0x00, TOKEN_LOAD, b'"', b'*', b'"', b','];
    line.push(b'0' + drive.device_number());
    line.push(0x00);

    let next_line = BASIC_START + 2 + line.len() as u16;
    let mut stub = next_line.to_le_bytes().to_vec();
    stub.extend_from_slice(&line);
    stub.extend_from_slice(&[0x00, 0x00]);
    stub
}

/// Runs play plans against the device
pub struct AutostartSequencer {
    device: Arc<dyn DeviceApi>,
    config: AutostartConfig,
    events: EventBus,
    state: watch::Sender<AutostartState>,
}

impl AutostartSequencer {
    /// Create a sequencer
    pub fn new(device: Arc<dyn DeviceApi>, config: AutostartConfig, events: EventBus) -> Self {
        let (state, _) = watch::channel(AutostartState {
            phase: AutostartPhase::Idle,
            track_instance_id: 0,
            started_at: Instant::now(),
        });
        Self {
            device,
            config,
            events,
            state,
        }
    }

    /// State of the most recent sequence
    pub fn state(&self) -> AutostartState {
        *self.state.borrow()
    }

    /// Execute a plan for a track instance.
    ///
    /// # Errors
    /// - `MountFailed` when the image cannot be mounted (not retried)
    /// - `DeviceUnreachable`, `UploadFailed` or `Device` when a command fails
    pub async fn execute(
        &self,
        plan: &PlayPlan,
        strategy: AutostartStrategy,
        track_instance_id: u64,
    ) -> Result<AutostartReport> {
        if !plan.needs_autostart() {
            for step in &plan.steps {
                debug!(step = step.name(), track_instance_id, "Running plan step");
                self.run_simple(step).await?;
            }
            return Ok(AutostartReport::default());
        }

        self.state.send_replace(AutostartState {
            phase: AutostartPhase::Idle,
            track_instance_id,
            started_at: Instant::now(),
        });

        let result = self.run_disk(plan, strategy).await;
        match &result {
            Ok(_) => self.enter(AutostartPhase::Running),
            Err(e) => {
                warn!(track_instance_id, error = %e, "Autostart failed");
                self.enter(AutostartPhase::Failed);
            }
        }
        result
    }

    async fn run_simple(&self, step: &PlanStep) -> Result<()> {
        let device = &self.device;
        match step {
            PlanStep::PlayAudio {
                source,
                song_number,
            } => device.play_audio(source.clone(), *song_number).await?,
            PlanStep::RunProgram { source } => device.run_program(source.clone()).await?,
            PlanStep::LoadProgram { source } => device.load_program(source.clone()).await?,
            PlanStep::RunCartridge { source } => device.run_cartridge(source.clone()).await?,
            PlanStep::MountImage { drive, source } => device
                .mount_image(*drive, source.clone())
                .await
                .map_err(PlaybackError::mount)?,
            PlanStep::Reboot => device.reboot().await?,
            PlanStep::Autostart { .. } => {
                return Err(PlaybackError::UnsupportedMedia(
                    "autostart outside a disk plan".to_string(),
                ))
            }
        }
        Ok(())
    }

    async fn run_disk(&self, plan: &PlayPlan, strategy: AutostartStrategy) -> Result<AutostartReport> {
        let mut report = AutostartReport::default();

        for step in &plan.steps {
            match step {
                PlanStep::MountImage { drive, .. } => {
                    self.enter(AutostartPhase::Mounting);
                    info!(drive = %drive, "Mounting disk image");
                    self.run_simple(step).await?;
                }
                PlanStep::Reboot => {
                    self.enter(AutostartPhase::Rebooting);
                    self.run_simple(step).await?;
                }
                PlanStep::Autostart { drive, load_mode } => match strategy {
                    AutostartStrategy::KeyboardBuffer => {
                        report.timing_degraded_ms = self.inject(*drive, *load_mode).await?;
                    }
                    AutostartStrategy::Dma => self.write_boot_program(*drive, *load_mode).await?,
                },
                other => self.run_simple(other).await?,
            }
        }

        Ok(report)
    }

    /// Keyboard strategy: wait for an empty buffer, then type the command
    async fn inject(&self, drive: Drive, load_mode: LoadMode) -> Result<Option<u64>> {
        self.enter(AutostartPhase::AwaitingReady);
        let mut degraded = None;
        if let Err(waited_ms) = self.wait_for_empty_buffer(self.config.ready_budget()).await {
            let err = PlaybackError::AutostartTimingDegraded { waited_ms };
            warn!(error = %err, "Keyboard buffer remained busy; injecting anyway");
            degraded = Some(waited_ms);
        }

        self.enter(AutostartPhase::Injecting);
        let command = boot_command(drive, load_mode);
        let mut chunks = command.chunks(KEYBOARD_BUFFER_LEN).peekable();
        while let Some(chunk) = chunks.next() {
            self.device.write_memory(KEYBOARD_BUFFER, chunk).await?;
            self.device
                .write_memory(KEYBOARD_PENDING, &[chunk.len() as u8])
                .await?;
            debug!(len = chunk.len(), "Injected keystrokes");

            if chunks.peek().is_some() {
                if let Err(waited_ms) = self.wait_for_empty_buffer(self.config.drain_budget()).await {
                    warn!(waited_ms, "Keyboard buffer did not drain between chunks");
                }
            }
        }

        Ok(degraded)
    }

    /// DMA strategy: boot stub into BASIC memory, `RUN` into the buffer
    async fn write_boot_program(&self, drive: Drive, load_mode: LoadMode) -> Result<()> {
        self.enter(AutostartPhase::WritingBootProgram);

        let stub = boot_stub(drive);
        let end = BASIC_START + stub.len() as u16;
        self.device.write_memory_block(BASIC_START, &stub).await?;
        self.device
            .write_memory(BASIC_END_POINTER, &end.to_le_bytes())
            .await?;

        if load_mode == LoadMode::Run {
            let keys = b"RUN\r";
            self.device.write_memory_block(KEYBOARD_BUFFER, keys).await?;
            self.device
                .write_memory(KEYBOARD_PENDING, &[keys.len() as u8])
                .await?;
        }
        debug!(bytes = stub.len(), "Wrote boot program");
        Ok(())
    }

    /// Poll the pending-keys counter until it reads zero.
    ///
    /// At least one read is made. Returns the time waited as the error when
    /// the budget runs out first. Read errors count as busy.
    async fn wait_for_empty_buffer(&self, budget: Duration) -> std::result::Result<(), u64> {
        let start = Instant::now();
        loop {
            match self.device.read_memory(KEYBOARD_PENDING, 1).await {
                Ok(bytes) if bytes.first() == Some(&0) => return Ok(()),
                Ok(bytes) => debug!(pending = ?bytes.first(), "Keyboard buffer busy"),
                Err(e) => debug!(error = %e, "Keyboard buffer not readable yet"),
            }

            let waited = start.elapsed();
            if waited >= budget {
                return Err(waited.as_millis() as u64);
            }
            sleep(self.config.poll_interval().min(budget - waited)).await;
        }
    }

    fn enter(&self, phase: AutostartPhase) {
        let mut track_instance_id = 0;
        self.state.send_modify(|state| {
            state.phase = phase;
            track_instance_id = state.track_instance_id;
        });
        debug!(?phase, track_instance_id, "Autostart phase");
        self.events.emit(PlaybackEvent::AutostartPhaseChanged {
            phase,
            track_instance_id,
        });
    }
}
