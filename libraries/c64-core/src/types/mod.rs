//! Domain types

mod config;
mod media;
mod playlist;
mod request;

pub use config::{config_batch, ChannelId, ConfigBatch};
pub use media::{file_extension, file_name, parent_folder, Drive, MediaCategory, MediaSource};
pub use playlist::{PlaylistItem, PlaylistItemId};
pub use request::{PlayRequest, SourceKind};
