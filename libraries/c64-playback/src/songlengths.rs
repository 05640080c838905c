//! Song-length database
//!
//! Parses the HVSC `Songlengths.md5` / `Songlengths.txt` format:
//!
//! ```text
//! [Database]
//! ; /MUSICIANS/H/Hubbard_Rob/Commando.sid
//! 2b0ed0ae5db6e7ab2fc3e4f7b7b8b0d4=4:26 0:05.500 0:12(G)
//! ```
//!
//! Each data line maps a content MD5 to one length per subsong. The comment
//! line above it names the file, which lets a folder-local index be searched
//! by file name as well as by digest.

use async_trait::async_trait;
use c64_core::{file_name, DurationOracle};
use std::collections::HashMap;
use tracing::debug;

/// Parsed song-length database
#[derive(Debug, Clone, Default)]
pub struct SongLengthDatabase {
    /// Lowercase hex digest -> per-subsong lengths in milliseconds
    by_digest: HashMap<String, Vec<u32>>,

    /// Lowercase file name -> digest
    by_name: HashMap<String, String>,
}

impl SongLengthDatabase {
    /// Parse database text.
    ///
    /// Malformed lines are skipped; parsing never fails.
    pub fn parse(text: &str) -> Self {
        let mut db = Self::default();
        let mut pending_path: Option<&str> = None;
        let mut skipped = 0usize;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('[') {
                continue;
            }

            if let Some(comment) = line.strip_prefix(';') {
                let comment = comment.trim();
                if comment.starts_with('/') {
                    pending_path = Some(comment);
                }
                continue;
            }

            let Some((digest, lengths)) = line.split_once('=') else {
                skipped += 1;
                continue;
            };

            let digest = digest.trim().to_ascii_lowercase();
            if digest.len() != 32 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
                skipped += 1;
                continue;
            }

            let lengths: Vec<u32> = lengths.split_whitespace().filter_map(parse_length).collect();
            if lengths.is_empty() {
                skipped += 1;
                continue;
            }

            if let Some(path) = pending_path.take() {
                db.by_name
                    .insert(file_name(path).to_ascii_lowercase(), digest.clone());
            }
            db.by_digest.insert(digest, lengths);
        }

        if skipped > 0 {
            debug!(skipped, entries = db.by_digest.len(), "Skipped malformed song-length lines");
        }

        db
    }

    /// Number of files in the database
    pub fn len(&self) -> usize {
        self.by_digest.len()
    }

    /// Whether the database has no entries
    pub fn is_empty(&self) -> bool {
        self.by_digest.is_empty()
    }

    /// Per-subsong lengths (ms) for a content digest
    pub fn lengths_by_digest(&self, digest: &str) -> Option<&[u32]> {
        self.by_digest
            .get(&digest.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    /// Per-subsong lengths (ms) for a file name, via its `; /path` comment
    pub fn lengths_by_name(&self, name: &str) -> Option<&[u32]> {
        let digest = self.by_name.get(&name.to_ascii_lowercase())?;
        self.lengths_by_digest(digest)
    }
}

/// Pick the length of a subsong (1-based); `None` picks the first song
pub fn song_length_ms(lengths: &[u32], song_number: Option<u16>) -> Option<u32> {
    let index = song_number.map_or(0, |n| usize::from(n.max(1)) - 1);
    lengths.get(index).copied()
}

/// Parse `m:ss`, `m:ss.f`, `m:ss.mmm`, with an optional `(X)` suffix
fn parse_length(token: &str) -> Option<u32> {
    let token = token.split('(').next()?;
    let (minutes, rest) = token.split_once(':')?;
    let (seconds, fraction) = match rest.split_once('.') {
        Some((seconds, fraction)) => (seconds, Some(fraction)),
        None => (rest, None),
    };

    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }

    let millis = match fraction {
        None => 0,
        Some(f) if f.is_empty() || f.len() > 3 || !f.bytes().all(|b| b.is_ascii_digit()) => {
            return None
        }
        Some(f) => format!("{f:0<3}").parse::<u32>().ok()?,
    };

    minutes
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)
}

fn ms_to_secs(ms: u32) -> u32 {
    ms.div_ceil(1000)
}

#[async_trait]
impl DurationOracle for SongLengthDatabase {
    async fn lookup_by_digest(&self, digest: &str) -> c64_core::Result<Option<u32>> {
        Ok(self
            .lengths_by_digest(digest)
            .and_then(|lengths| song_length_ms(lengths, None))
            .map(ms_to_secs))
    }

    async fn lookup_subsong(&self, digest: &str, song_number: u16) -> c64_core::Result<Option<u32>> {
        Ok(self
            .lengths_by_digest(digest)
            .and_then(|lengths| song_length_ms(lengths, Some(song_number)))
            .map(ms_to_secs))
    }
}
