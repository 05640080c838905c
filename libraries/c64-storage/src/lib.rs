//! C64 Player Storage
//!
//! Persistence and file access backing the playback engine's ports.
//!
//! - [`MemoryStore`] and [`SqliteStore`] implement `KeyValueStore`
//! - [`FsSourceReader`] implements `SourceReader` for local files and an
//!   optional local mirror of the device's storage
//!
//! # Example
//!
//! ```rust,no_run
//! use c64_core::KeyValueStore;
//! use c64_storage::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("sqlite://c64-player.db").await?;
//! store.set("settings/autostart-strategy", b"\"dma\"".to_vec()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod error;
mod fs;
mod memory;
mod sqlite;

pub use error::{Result, StorageError};
pub use fs::FsSourceReader;
pub use memory::MemoryStore;
pub use sqlite::{create_pool, run_migrations, SqliteStore};
