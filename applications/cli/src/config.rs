/// Player configuration
use crate::error::{CliError, Result};
use c64_device_client::DeviceConfig;
use c64_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "c64-player.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_device")]
    pub device: DeviceSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_playback")]
    pub playback: PlaybackSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceSettings {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Scopes the persisted playlist
    #[serde(default = "default_device_id")]
    pub id: String,

    #[serde(default = "default_control_timeout_ms")]
    pub control_timeout_ms: u64,

    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Local mirror of the device's storage, for reading device files
    #[serde(default)]
    pub remote_mirror: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: u64,

    /// HVSC `Songlengths.md5` used as the song-length oracle
    #[serde(default)]
    pub songlengths: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `c64-player.toml` is read
    /// when present. `C64_`-prefixed variables override both, with `__`
    /// between section and key (`C64_DEVICE__URL`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path.to_path_buf())),
            None => settings.add_source(
                config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false),
            ),
        };

        settings = settings.add_source(
            config::Environment::with_prefix("C64")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(settings.build()?.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = &self.device.url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CliError::Config(format!(
                "device.url must start with http:// or https:// (got {url:?})"
            )));
        }

        if self.device.id.trim().is_empty() {
            return Err(CliError::Config("device.id cannot be empty".to_string()));
        }

        if self.device.control_timeout_ms == 0 || self.device.upload_timeout_ms == 0 {
            return Err(CliError::Config("device timeouts must be positive".to_string()));
        }

        if !self.storage.database_url.starts_with("sqlite:") {
            return Err(CliError::Config(format!(
                "storage.database_url must be a sqlite: URL (got {:?})",
                self.storage.database_url
            )));
        }

        if self.playback.default_duration_secs == 0 {
            return Err(CliError::Config(
                "playback.default_duration_secs must be positive".to_string(),
            ));
        }

        if let Some(path) = &self.playback.songlengths {
            if !path.is_file() {
                return Err(CliError::Config(format!(
                    "Song-length database not found at {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            base_url: self.device.url.clone(),
            password: self.device.password.clone(),
            control_timeout_ms: self.device.control_timeout_ms,
            upload_timeout_ms: self.device.upload_timeout_ms,
        }
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            default_duration_ms: self.playback.default_duration_secs.saturating_mul(1000),
            ..PlaybackConfig::for_device(self.device.id.clone())
        }
    }
}

// Default values
fn default_device() -> DeviceSettings {
    DeviceSettings {
        url: default_url(),
        password: None,
        id: default_device_id(),
        control_timeout_ms: default_control_timeout_ms(),
        upload_timeout_ms: default_upload_timeout_ms(),
    }
}

fn default_url() -> String {
    "http://c64u".to_string()
}

fn default_device_id() -> String {
    "default".to_string()
}

fn default_control_timeout_ms() -> u64 {
    5_000
}

fn default_upload_timeout_ms() -> u64 {
    30_000
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
        remote_mirror: None,
    }
}

fn default_database_url() -> String {
    "sqlite://c64-player.db".to_string()
}

fn default_playback() -> PlaybackSettings {
    PlaybackSettings {
        default_duration_secs: default_duration_secs(),
        songlengths: None,
    }
}

fn default_duration_secs() -> u64 {
    180
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            storage: default_storage(),
            playback: default_playback(),
        }
    }
}
