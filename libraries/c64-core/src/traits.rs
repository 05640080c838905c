//! Ports the playback engine consumes
//!
//! Every collaborator outside the engine (the device, the song-length
//! service, file access and key/value persistence) sits behind one of these
//! traits so the engine can be driven by fakes in tests.

use crate::error::Result;
use crate::types::{ConfigBatch, Drive, MediaSource, SourceKind};
use async_trait::async_trait;
use bytes::Bytes;

/// Command/response interface of the device
///
/// Implementations own transport concerns (auth, timeouts, wire format).
/// Callers never issue two mutating commands concurrently.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    // ========================================================================
    // Drives
    // ========================================================================

    /// Mount a disk image onto a virtual drive
    async fn mount_image(&self, drive: Drive, image: MediaSource) -> Result<()>;

    // ========================================================================
    // Machine control
    // ========================================================================

    /// Reboot the machine (re-runs the ROM boot sequence)
    async fn reboot(&self) -> Result<()>;

    /// Reset the machine
    async fn reset(&self) -> Result<()>;

    /// Freeze the CPU
    async fn pause(&self) -> Result<()>;

    /// Unfreeze the CPU
    async fn resume(&self) -> Result<()>;

    // ========================================================================
    // Memory
    // ========================================================================

    /// Read `length` bytes starting at `address`
    async fn read_memory(&self, address: u16, length: u16) -> Result<Vec<u8>>;

    /// Write a few bytes starting at `address`
    async fn write_memory(&self, address: u16, data: &[u8]) -> Result<()>;

    /// Bulk (DMA) write starting at `address`
    async fn write_memory_block(&self, address: u16, data: &[u8]) -> Result<()>;

    // ========================================================================
    // Runners
    // ========================================================================

    /// Play a SID or MOD tune; `song_number` is 1-based and SID-only
    async fn play_audio(&self, source: MediaSource, song_number: Option<u16>) -> Result<()>;

    /// Load and run a program
    async fn run_program(&self, source: MediaSource) -> Result<()>;

    /// Load a program without running it
    async fn load_program(&self, source: MediaSource) -> Result<()>;

    /// Start a cartridge image
    async fn run_cartridge(&self, source: MediaSource) -> Result<()>;

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Current value of a config item
    async fn get_config_value(&self, category: &str, item: &str) -> Result<String>;

    /// Set a single config item
    async fn set_config_value(&self, category: &str, item: &str, value: &str) -> Result<()>;

    /// Set many config items in one request
    async fn batch_set_config_values(&self, values: &ConfigBatch) -> Result<()>;
}

/// Song-length database keyed by content digest
#[async_trait]
pub trait DurationOracle: Send + Sync {
    /// Length in seconds of the default song for a lowercase hex MD5 digest
    async fn lookup_by_digest(&self, digest: &str) -> Result<Option<u32>>;

    /// Length in seconds of a specific subsong (1-based).
    ///
    /// Defaults to the digest lookup for oracles that only know one length
    /// per file.
    async fn lookup_subsong(&self, digest: &str, song_number: u16) -> Result<Option<u32>> {
        let _ = song_number;
        self.lookup_by_digest(digest).await
    }
}

/// Read access to file content, local or on the device
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Read the whole file at `path`
    async fn read(&self, kind: SourceKind, path: &str) -> Result<Bytes>;
}

/// Opaque key/value persistence
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}
