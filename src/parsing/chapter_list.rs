//! Nero chapter list (`chpl`) parser.
//!
//! Layout after the 4-byte version/flags prefix:
//! - version 1: 1 reserved byte, then a 32-bit entry count
//! - version 0: an 8-bit entry count
//!
//! Each entry is a 64-bit start time in 100 ns units (independent of the
//! movie timescale), an 8-bit title length and that many bytes of UTF-8.

use super::byte_reader::ByteReader;
use crate::error::{Result, TimelineError};
use tracing::warn;

/// 100 ns units per millisecond.
pub const HNS_PER_MS: u64 = 10_000;

/// A chapter marker as stored in the box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChapterEntry {
    pub title: String,
    /// Start time in 100 ns units.
    pub start_time_hns: u64,
}

pub struct ChapterListParser;

impl ChapterListParser {
    /// Start time (8) + title length (1).
    const ENTRY_HEADER_SIZE: usize = 9;

    /// Decode entries in box order.
    ///
    /// The declared count is clamped to `max_entries`. A truncated entry ends
    /// decoding and every entry before it is returned.
    pub fn parse(payload: &[u8], max_entries: usize) -> Result<Vec<RawChapterEntry>> {
        let mut reader = ByteReader::new(payload);
        let (version, _flags) = reader.read_version_and_flags().ok_or(
            TimelineError::BufferTooSmall {
                needed: 4,
                have: payload.len(),
            },
        )?;

        let declared = match version {
            0 => reader.read_u8().map(u64::from),
            1 => reader.skip(1).and_then(|()| reader.read_u32_be()).map(u64::from),
            v => {
                return Err(TimelineError::UnsupportedVersion {
                    box_type: *b"chpl",
                    version: v,
                })
            }
        }
        .ok_or(TimelineError::BufferTooSmall {
            needed: reader.position() + 1,
            have: payload.len(),
        })?;

        let count = if declared > max_entries as u64 {
            warn!(declared, limit = max_entries, "clamping chapter count");
            max_entries
        } else {
            declared as usize
        };

        // Every entry needs at least its fixed header.
        let mut entries =
            Vec::with_capacity(count.min(reader.remaining() / Self::ENTRY_HEADER_SIZE));
        for _ in 0..count {
            match Self::parse_entry(&mut reader) {
                Some(entry) => entries.push(entry),
                None => {
                    warn!(
                        decoded = entries.len(),
                        declared = count,
                        "chapter list truncated"
                    );
                    break;
                }
            }
        }
        Ok(entries)
    }

    fn parse_entry(reader: &mut ByteReader<'_>) -> Option<RawChapterEntry> {
        if reader.remaining() < Self::ENTRY_HEADER_SIZE {
            return None;
        }
        let start_time_hns = reader.read_u64_be()?;
        let title_len = reader.read_u8()? as usize;
        let title = reader.read_bytes(title_len)?;
        Some(RawChapterEntry {
            title: String::from_utf8_lossy(title).into_owned(),
            start_time_hns,
        })
    }
}

/// Per-entry durations in 100 ns units.
///
/// Each entry runs until the next one starts; the last runs until
/// `total_hns` when the movie duration is known and is zero otherwise.
/// Out-of-order start times give zero rather than wrapping.
pub fn chapter_durations_hns(entries: &[RawChapterEntry], total_hns: Option<u64>) -> Vec<u64> {
    let mut durations: Vec<u64> = entries
        .windows(2)
        .map(|pair| pair[1].start_time_hns.saturating_sub(pair[0].start_time_hns))
        .collect();
    if let Some(last) = entries.last() {
        durations.push(total_hns.map_or(0, |total| total.saturating_sub(last.start_time_hns)));
    }
    durations
}
