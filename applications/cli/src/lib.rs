//! C64 Player - command-line front end
//!
//! Wires the device client, the storage backends and the playback engine
//! together. The binary in `main.rs` only parses arguments and installs
//! logging.

pub mod commands;
pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{CliError, Result};
