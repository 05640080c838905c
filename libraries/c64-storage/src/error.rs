//! Storage-specific errors

use c64_core::C64Error;
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Source file could not be located
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Source kind this reader cannot serve
    #[error("No access to {kind} source {path}")]
    SourceNotAccessible { kind: &'static str, path: String },

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}

impl From<StorageError> for C64Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SourceNotFound(_) | StorageError::SourceNotAccessible { .. } => {
                C64Error::SourceUnavailable(err.to_string())
            }
            StorageError::Io(e) => C64Error::SourceUnavailable(e.to_string()),
            other => C64Error::storage(other.to_string()),
        }
    }
}
