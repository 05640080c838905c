//! CLI error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Device(#[from] c64_device_client::DeviceClientError),

    #[error(transparent)]
    Core(#[from] c64_core::C64Error),

    #[error(transparent)]
    Playback(#[from] c64_playback::PlaybackError),

    #[error(transparent)]
    Storage(#[from] c64_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
