//! SID file header
//!
//! PSID/RSID files start with a fixed big-endian header. Only the fields the
//! resolver needs are read: the number of songs and the default start song.

/// Offset of the big-endian song count
const SONGS_OFFSET: usize = 0x0E;

/// Offset of the big-endian start song (1-based)
const START_SONG_OFFSET: usize = 0x10;

/// Fields of interest from a SID header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidHeader {
    /// Number of subsongs (at least 1)
    pub songs: u16,

    /// Subsong played when none is requested (1-based, at most `songs`)
    pub start_song: u16,
}

impl Default for SidHeader {
    fn default() -> Self {
        Self {
            songs: 1,
            start_song: 1,
        }
    }
}

/// Parse the header at the start of `data`.
///
/// Returns `None` when the magic is missing or the buffer is too short.
pub fn parse_header(data: &[u8]) -> Option<SidHeader> {
    let magic = data.get(0..4)?;
    if magic != b"PSID" && magic != b"RSID" {
        return None;
    }

    let songs = read_u16_be(data, SONGS_OFFSET)?.max(1);
    let start_song = read_u16_be(data, START_SONG_OFFSET)
        .filter(|start| (1..=songs).contains(start))
        .unwrap_or(1);

    Some(SidHeader { songs, start_song })
}

/// Subsong count of a SID file, 1 when the header cannot be read
pub fn subsong_count(data: &[u8]) -> u16 {
    parse_header(data).unwrap_or_default().songs
}

fn read_u16_be(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

#[cfg(test)]
pub(crate) fn test_header(songs: u16, start_song: u16) -> Vec<u8> {
    let mut data = vec![0u8; 0x7C];
    data[0..4].copy_from_slice(b"PSID");
    data[4..6].copy_from_slice(&2u16.to_be_bytes());
    data[SONGS_OFFSET..SONGS_OFFSET + 2].copy_from_slice(&songs.to_be_bytes());
    data[START_SONG_OFFSET..START_SONG_OFFSET + 2].copy_from_slice(&start_song.to_be_bytes());
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_song_count_and_start_song() {
        let header = parse_header(&test_header(12, 3)).unwrap();
        assert_eq!(header.songs, 12);
        assert_eq!(header.start_song, 3);
    }

    #[test]
    fn rsid_magic_is_accepted() {
        let mut data = test_header(2, 1);
        data[0..4].copy_from_slice(b"RSID");
        assert_eq!(subsong_count(&data), 2);
    }

    #[test]
    fn out_of_range_start_song_falls_back_to_first() {
        let header = parse_header(&test_header(4, 9)).unwrap();
        assert_eq!(header.start_song, 1);

        let header = parse_header(&test_header(4, 0)).unwrap();
        assert_eq!(header.start_song, 1);
    }

    #[test]
    fn zero_songs_counts_as_one() {
        assert_eq!(subsong_count(&test_header(0, 0)), 1);
    }

    #[test]
    fn garbage_defaults_to_one_song() {
        assert_eq!(parse_header(b"MThd\x00\x00"), None);
        assert_eq!(subsong_count(b"PSID"), 1);
        assert_eq!(subsong_count(&[]), 1);
        assert_eq!(subsong_count(b"not a sid file at all, just text"), 1);
    }
}
