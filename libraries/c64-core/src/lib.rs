//! C64 Player Core
//!
//! Domain types, ports and error handling shared by the playback engine,
//! the device client and the storage backends.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `PlayRequest`, `PlaylistItem`, `MediaCategory`, `MediaSource`
//! - **Ports**: `DeviceApi`, `DurationOracle`, `SourceReader`, `KeyValueStore`
//! - **Error Handling**: Unified `C64Error` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use c64_core::{MediaCategory, PlayRequest, PlaylistItem};
//!
//! let item = PlaylistItem::new(PlayRequest::remote("/Usb0/Music/Commando.sid")).unwrap();
//! assert_eq!(item.category, MediaCategory::Sid);
//! assert_eq!(item.label, "Commando.sid");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{C64Error, Result};
pub use traits::{DeviceApi, DurationOracle, KeyValueStore, SourceReader};
pub use types::{
    config_batch, file_extension, file_name, parent_folder, ChannelId, ConfigBatch, Drive,
    MediaCategory, MediaSource, PlayRequest, PlaylistItem, PlaylistItemId, SourceKind,
};
