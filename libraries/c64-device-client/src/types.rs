//! Connection settings and response types for the device REST interface.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for connecting to a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Base URL of the device (e.g., "http://c64u")
    pub base_url: String,
    /// Network password, sent as `X-Password` when set
    pub password: Option<String>,
    /// Timeout for control commands (machine, memory, config)
    pub control_timeout_ms: u64,
    /// Timeout for commands carrying an upload
    pub upload_timeout_ms: u64,
}

impl DeviceConfig {
    /// Config for a base URL with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the network password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub(crate) fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout_ms)
    }

    pub(crate) fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://c64u".to_string(),
            password: None,
            control_timeout_ms: 5_000,
            upload_timeout_ms: 30_000,
        }
    }
}

/// Response of `GET /v1/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    /// REST API version
    pub version: String,
}

/// Machine command sent via `PUT /v1/machine:{command}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineCommand {
    Reset,
    Reboot,
    Pause,
    Resume,
}

impl MachineCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Reboot => "reboot",
            Self::Pause => "pause",
            Self::Resume => "resume",
        }
    }
}

/// Runner endpoint under `/v1/runners:{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runner {
    SidPlay,
    ModPlay,
    RunPrg,
    LoadPrg,
    RunCrt,
}

impl Runner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SidPlay => "sidplay",
            Self::ModPlay => "modplay",
            Self::RunPrg => "run_prg",
            Self::LoadPrg => "load_prg",
            Self::RunCrt => "run_crt",
        }
    }
}
