//! Filesystem `SourceReader`

use crate::error::{Result, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use c64_core::{SourceKind, SourceReader};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Reads local files directly from disk.
///
/// Device paths (`/Usb0/...`) are only readable when a local mirror of the
/// device storage is configured with [`FsSourceReader::with_remote_root`];
/// otherwise remote reads fail as unavailable.
#[derive(Debug, Clone, Default)]
pub struct FsSourceReader {
    remote_root: Option<PathBuf>,
}

impl FsSourceReader {
    /// Reader for local files only
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve device paths under `root`
    pub fn with_remote_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.remote_root = Some(root.into());
        self
    }

    /// Filesystem location for a source path
    ///
    /// # Errors
    ///
    /// Remote paths fail without a mirror root, or when they would escape it
    pub fn resolve(&self, kind: SourceKind, path: &str) -> Result<PathBuf> {
        match kind {
            SourceKind::Local => Ok(PathBuf::from(path)),
            SourceKind::Remote => {
                let root = self.remote_root.as_ref().ok_or_else(|| {
                    StorageError::SourceNotAccessible {
                        kind: kind.as_str(),
                        path: path.to_string(),
                    }
                })?;
                let relative = Path::new(path.trim_start_matches('/'));
                if relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
                {
                    return Err(StorageError::SourceNotAccessible {
                        kind: kind.as_str(),
                        path: path.to_string(),
                    });
                }
                Ok(root.join(relative))
            }
        }
    }

    /// Read the whole file
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be resolved or read
    pub async fn read_file(&self, kind: SourceKind, path: &str) -> Result<Bytes> {
        let location = self.resolve(kind, path)?;
        match tokio::fs::read(&location).await {
            Ok(data) => {
                debug!(path = %location.display(), bytes = data.len(), "Read source file");
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::SourceNotFound(location.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SourceReader for FsSourceReader {
    async fn read(&self, kind: SourceKind, path: &str) -> c64_core::Result<Bytes> {
        Ok(self.read_file(kind, path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_paths_need_a_root() {
        let reader = FsSourceReader::new();
        assert!(reader.resolve(SourceKind::Remote, "/Usb0/a.sid").is_err());
        assert_eq!(
            reader.resolve(SourceKind::Local, "/home/me/a.sid").unwrap(),
            PathBuf::from("/home/me/a.sid")
        );
    }

    #[test]
    fn remote_paths_stay_under_the_root() {
        let reader = FsSourceReader::new().with_remote_root("/mnt/c64");
        assert_eq!(
            reader.resolve(SourceKind::Remote, "/Usb0/Music/a.sid").unwrap(),
            PathBuf::from("/mnt/c64/Usb0/Music/a.sid")
        );
        assert!(reader.resolve(SourceKind::Remote, "/Usb0/../../etc/passwd").is_err());
    }
}
