//! Play plans
//!
//! Maps a play request onto the ordered device actions that start it.
//! Pure: no state, no I/O.

use crate::error::{PlaybackError, Result};
use crate::types::{LoadMode, PlayOptions};
use c64_core::{Drive, MediaCategory, MediaSource, PlayRequest};

/// One device action of a plan
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    /// Play a SID/MOD tune (uploads when the source carries bytes)
    PlayAudio {
        /// Tune to play
        source: MediaSource,
        /// 1-based subsong, if requested
        song_number: Option<u16>,
    },

    /// Load and run a program
    RunProgram {
        /// Program to run
        source: MediaSource,
    },

    /// Load a program without running it
    LoadProgram {
        /// Program to load
        source: MediaSource,
    },

    /// Start a cartridge image
    RunCartridge {
        /// Cartridge to start
        source: MediaSource,
    },

    /// Mount a disk image
    MountImage {
        /// Target drive
        drive: Drive,
        /// Image to mount
        source: MediaSource,
    },

    /// Reboot so the ROM boots against the new medium
    Reboot,

    /// Boot the mounted disk (strategy chosen by the sequencer)
    Autostart {
        /// Drive the disk is on
        drive: Drive,
        /// Run after loading, or stop at load
        load_mode: LoadMode,
    },
}

impl PlanStep {
    /// Short name for logs and events
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayAudio { .. } => "play_audio",
            Self::RunProgram { .. } => "run_program",
            Self::LoadProgram { .. } => "load_program",
            Self::RunCartridge { .. } => "run_cartridge",
            Self::MountImage { .. } => "mount_image",
            Self::Reboot => "reboot",
            Self::Autostart { .. } => "autostart",
        }
    }
}

/// Ordered device actions for one request
#[derive(Debug, Clone, PartialEq)]
pub struct PlayPlan {
    /// Category of the request
    pub category: MediaCategory,

    /// Steps in execution order
    pub steps: Vec<PlanStep>,
}

impl PlayPlan {
    /// Whether the plan goes through the disk autostart protocol
    pub fn needs_autostart(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, PlanStep::Autostart { .. }))
    }
}

/// Build the plan for a request.
///
/// # Errors
/// - `UnsupportedMedia` for unrecognized paths and for volumes (folders
///   must be expanded into file requests first)
/// - `MissingSource` for local requests without content
pub fn build_plan(request: &PlayRequest, options: &PlayOptions) -> Result<PlayPlan> {
    let category = request.category().ok_or_else(|| {
        PlaybackError::UnsupportedMedia(format!("unrecognized file type: {}", request.path))
    })?;

    if category == MediaCategory::Volume {
        return Err(folder_not_playable(request));
    }

    let source = request
        .media_source()
        .ok_or_else(|| PlaybackError::MissingSource(request.path.clone()))?;

    let steps = match category {
        MediaCategory::Sid | MediaCategory::Mod => vec![PlanStep::PlayAudio {
            source,
            song_number: request.song_number,
        }],
        MediaCategory::Prg => match options.load_mode {
            LoadMode::Run => vec![PlanStep::RunProgram { source }],
            LoadMode::LoadOnly => vec![PlanStep::LoadProgram { source }],
        },
        MediaCategory::Crt => vec![PlanStep::RunCartridge { source }],
        MediaCategory::Disk => {
            let mut steps = vec![PlanStep::MountImage {
                drive: options.drive,
                source,
            }];
            if options.reset_before_mount {
                steps.push(PlanStep::Reboot);
            }
            steps.push(PlanStep::Autostart {
                drive: options.drive,
                load_mode: options.load_mode,
            });
            steps
        }
        MediaCategory::Volume => return Err(folder_not_playable(request)),
    };

    Ok(PlayPlan { category, steps })
}

fn folder_not_playable(request: &PlayRequest) -> PlaybackError {
    PlaybackError::UnsupportedMedia(format!(
        "{} is a folder; expand it into files before playing",
        request.path
    ))
}
