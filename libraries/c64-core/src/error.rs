//! Core error types for the C64 player

use thiserror::Error;

/// Result type alias using `C64Error`
pub type Result<T> = std::result::Result<T, C64Error>;

/// Error type shared by every port (device, oracle, reader, store)
#[derive(Error, Debug)]
pub enum C64Error {
    /// The device could not be reached (connect failure, timeout, DNS)
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(String),

    /// The device answered but refused the command
    #[error("Device rejected {operation} ({status}): {message}")]
    DeviceRejected {
        /// Command that was refused
        operation: String,
        /// HTTP status code
        status: u16,
        /// Error text returned by the device
        message: String,
    },

    /// Uploading content to the device failed
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// The device answered with something we could not interpret
    #[error("Invalid device response: {0}")]
    InvalidResponse(String),

    /// Media type not recognized or not supported by the operation
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// Source content could not be read
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Duration lookup failed
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Key/value storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl C64Error {
    /// Create a device unreachable error
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::DeviceUnreachable(msg.into())
    }

    /// Create a device rejected error
    pub fn rejected(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::DeviceRejected {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Create an unsupported media error
    pub fn unsupported_media(msg: impl Into<String>) -> Self {
        Self::UnsupportedMedia(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the error means the device could not be talked to at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::DeviceUnreachable(_))
    }
}
