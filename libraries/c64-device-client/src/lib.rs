//! C64 Device Client
//!
//! HTTP client for the REST interface of Ultimate 64 / C64U devices, and
//! the [`DeviceApi`](c64_core::DeviceApi) implementation the playback engine
//! drives.
//!
//! # Features
//!
//! - **Machine**: reset, reboot, pause, resume
//! - **Memory**: small hex writes, binary block (DMA) writes, reads
//! - **Runners**: SID/MOD players, PRG run/load, cartridges, by path or upload
//! - **Drives**: mount images from device storage or by upload
//! - **Config**: read, write and batch-write config items
//!
//! # Example
//!
//! ```ignore
//! use c64_device_client::{C64DeviceClient, DeviceConfig};
//! use c64_core::{DeviceApi, MediaSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = C64DeviceClient::new(DeviceConfig::new("http://c64u").with_password("secret"))?;
//!     client.version().await?;
//!
//!     client
//!         .play_audio(MediaSource::Path("/Usb0/Music/Commando.sid".into()), Some(2))
//!         .await?;
//!     Ok(())
//! }
//! ```

mod client;
mod configs;
mod error;
mod runners;
mod types;

pub use client::C64DeviceClient;
pub use error::{DeviceClientError, Result};
pub use types::{DeviceConfig, MachineCommand, Runner, VersionInfo};
