//! Media classification and device-side addressing

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content a path refers to, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    /// SID tune (may contain several subsongs)
    Sid,
    /// Amiga-style module
    Mod,
    /// C64 program file
    Prg,
    /// Cartridge image
    Crt,
    /// Floppy disk image (d64, g64, d71, g71, d81)
    Disk,
    /// A folder or volume; must be expanded before playing
    Volume,
}

impl MediaCategory {
    /// Classify a path by its extension.
    ///
    /// Paths ending in `/` are volumes. Returns `None` for anything else
    /// that is not recognized.
    pub fn from_path(path: &str) -> Option<Self> {
        if path.ends_with('/') {
            return Some(Self::Volume);
        }

        let ext = file_extension(path)?;
        match ext.as_str() {
            "sid" => Some(Self::Sid),
            "mod" => Some(Self::Mod),
            "prg" => Some(Self::Prg),
            "crt" => Some(Self::Crt),
            "d64" | "g64" | "d71" | "g71" | "d81" => Some(Self::Disk),
            _ => None,
        }
    }

    /// Whether the category plays through the audio runners
    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Sid | Self::Mod)
    }

    /// Lowercase name used in logs and persisted records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sid => "sid",
            Self::Mod => "mod",
            Self::Prg => "prg",
            Self::Crt => "crt",
            Self::Disk => "disk",
            Self::Volume => "volume",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercased extension of the last path segment, if any
pub fn file_extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Last segment of a `/`-separated path
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Parent folder of a `/`-separated path (empty for bare names)
pub fn parent_folder(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) => "/",
        Some((parent, _)) => parent,
        None => "",
    }
}

/// Virtual floppy drive on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Drive {
    /// First drive, bus device 8
    #[default]
    A,
    /// Second drive, bus device 9
    B,
}

impl Drive {
    /// Identifier used by the device API (`a` / `b`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }

    /// IEC bus device number the drive answers on
    pub fn device_number(&self) -> u8 {
        match self {
            Self::A => 8,
            Self::B => 9,
        }
    }
}

impl fmt::Display for Drive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Drive {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "8" => Ok(Self::A),
            "b" | "9" => Ok(Self::B),
            other => Err(format!("unknown drive '{other}' (expected a or b)")),
        }
    }
}

/// Where the device gets content from: a path it can already see, or
/// bytes that have to be uploaded with the command
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    /// File already resident on the device's storage
    Path(String),
    /// Content uploaded with the command
    Upload {
        /// Name the device sees
        file_name: String,
        /// File content
        data: Bytes,
    },
}

impl MediaSource {
    /// File name the device sees (used for type detection on upload)
    pub fn file_name(&self) -> &str {
        match self {
            Self::Path(path) => file_name(path),
            Self::Upload { file_name, .. } => file_name,
        }
    }

    /// Whether the command carries an upload
    pub fn is_upload(&self) -> bool {
        matches!(self, Self::Upload { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_from_extension() {
        assert_eq!(MediaCategory::from_path("/Usb0/Hubbard/Commando.sid"), Some(MediaCategory::Sid));
        assert_eq!(MediaCategory::from_path("tune.MOD"), Some(MediaCategory::Mod));
        assert_eq!(MediaCategory::from_path("game.prg"), Some(MediaCategory::Prg));
        assert_eq!(MediaCategory::from_path("/carts/action.crt"), Some(MediaCategory::Crt));
        for disk in ["a.d64", "a.g64", "a.d71", "a.g71", "a.D81"] {
            assert_eq!(MediaCategory::from_path(disk), Some(MediaCategory::Disk));
        }
        assert_eq!(MediaCategory::from_path("/Usb0/Games/"), Some(MediaCategory::Volume));
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        assert_eq!(MediaCategory::from_path("notes.txt"), None);
        assert_eq!(MediaCategory::from_path("README"), None);
        assert_eq!(MediaCategory::from_path(".sid"), None);
    }

    #[test]
    fn path_helpers() {
        assert_eq!(file_name("/Usb0/Music/a.sid"), "a.sid");
        assert_eq!(file_name("a.sid"), "a.sid");
        assert_eq!(parent_folder("/Usb0/Music/a.sid"), "/Usb0/Music");
        assert_eq!(parent_folder("/a.sid"), "/");
        assert_eq!(parent_folder("a.sid"), "");
    }

    #[test]
    fn drives_map_to_bus_devices() {
        assert_eq!(Drive::default(), Drive::A);
        assert_eq!(Drive::A.device_number(), 8);
        assert_eq!(Drive::B.device_number(), 9);
        assert_eq!("B".parse::<Drive>(), Ok(Drive::B));
        assert!("c".parse::<Drive>().is_err());
    }
}
