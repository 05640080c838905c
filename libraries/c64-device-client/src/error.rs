//! Error types for the device client.

use c64_core::C64Error;
use thiserror::Error;

/// Errors that can occur when talking to the device's REST interface.
#[derive(Error, Debug)]
pub enum DeviceClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Connect failure or timeout
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// Device answered with an error status or an `errors` list
    #[error("Device rejected {operation} ({status}): {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },

    /// Sending file content failed
    #[error("Upload of {file_name} failed: {message}")]
    UploadFailed { file_name: String, message: String },

    /// Invalid device URL
    #[error("Invalid device URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse device response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl DeviceClientError {
    /// Classify a transport error
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unreachable(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

impl From<DeviceClientError> for C64Error {
    fn from(err: DeviceClientError) -> Self {
        match err {
            DeviceClientError::Unreachable(msg) => C64Error::DeviceUnreachable(msg),
            DeviceClientError::Rejected {
                operation,
                status,
                message,
            } => C64Error::DeviceRejected {
                operation,
                status,
                message,
            },
            e @ DeviceClientError::UploadFailed { .. } => C64Error::UploadFailed(e.to_string()),
            DeviceClientError::InvalidUrl(msg) => C64Error::InvalidInput(msg),
            DeviceClientError::ParseError(msg) => C64Error::InvalidResponse(msg),
            DeviceClientError::Request(e) => C64Error::Other(e.to_string()),
        }
    }
}

/// Result type for device client operations.
pub type Result<T> = std::result::Result<T, DeviceClientError>;
