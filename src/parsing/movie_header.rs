//! Movie header (`mvhd`) parser.
//!
//! Only the timescale and duration are extracted. Version 1 uses 64-bit
//! creation/modification times and duration; version 0 uses 32-bit ones.

use super::byte_reader::ByteReader;
use crate::error::{Result, TimelineError};

/// 100-nanosecond units per second.
pub const HNS_PER_SECOND: u64 = 10_000_000;

/// Timing from the movie header. Zero means "unknown".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovieTiming {
    /// Ticks per second.
    pub timescale: u32,
    pub duration_ticks: u64,
}

impl MovieTiming {
    pub fn is_known(&self) -> bool {
        self.timescale > 0 && self.duration_ticks > 0
    }

    /// Total duration in 100 ns units, if the header was present.
    pub fn duration_hns(&self) -> Option<u64> {
        if !self.is_known() {
            return None;
        }
        let hns = u128::from(self.duration_ticks) * u128::from(HNS_PER_SECOND)
            / u128::from(self.timescale);
        u64::try_from(hns).ok()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_hns().map(|hns| hns / 10_000)
    }
}

pub struct MovieHeaderParser;

impl MovieHeaderParser {
    /// Version/flags (4) + times (8) + timescale (4) + duration (4).
    pub const V0_SIZE: usize = 20;
    /// Version/flags (4) + times (16) + timescale (4) + duration (8).
    pub const V1_SIZE: usize = 32;

    pub fn parse(payload: &[u8]) -> Result<MovieTiming> {
        let mut reader = ByteReader::new(payload);
        let (version, _flags) = reader.read_version_and_flags().ok_or(
            TimelineError::BufferTooSmall {
                needed: 4,
                have: payload.len(),
            },
        )?;

        let needed = match version {
            0 => Self::V0_SIZE,
            1 => Self::V1_SIZE,
            v => {
                return Err(TimelineError::UnsupportedVersion {
                    box_type: *b"mvhd",
                    version: v,
                })
            }
        };
        if payload.len() < needed {
            return Err(TimelineError::BufferTooSmall {
                needed,
                have: payload.len(),
            });
        }

        let timing = if version == 1 {
            reader.skip(16);
            let timescale = reader.read_u32_be().unwrap_or(0);
            let duration_ticks = reader.read_u64_be().unwrap_or(0);
            MovieTiming {
                timescale,
                duration_ticks,
            }
        } else {
            reader.skip(8);
            let timescale = reader.read_u32_be().unwrap_or(0);
            let duration_ticks = u64::from(reader.read_u32_be().unwrap_or(0));
            MovieTiming {
                timescale,
                duration_ticks,
            }
        };
        Ok(timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::fixtures::{mvhd_v0, mvhd_v1};

    #[test]
    fn test_parse_version_0() {
        let timing = MovieHeaderParser::parse(&mvhd_v0(1000, 2000)).unwrap();
        assert_eq!(timing.timescale, 1000);
        assert_eq!(timing.duration_ticks, 2000);
        assert_eq!(timing.duration_hns(), Some(20_000_000));
        assert_eq!(timing.duration_ms(), Some(2000));
    }

    #[test]
    fn test_parse_version_1() {
        let timing = MovieHeaderParser::parse(&mvhd_v1(44_100, 5_000_000_000)).unwrap();
        assert_eq!(timing.timescale, 44_100);
        assert_eq!(timing.duration_ticks, 5_000_000_000);
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let payload = mvhd_v1(1000, 1000);
        assert!(matches!(
            MovieHeaderParser::parse(&payload[..20]),
            Err(TimelineError::BufferTooSmall { needed: 32, .. })
        ));
        assert!(MovieHeaderParser::parse(&[0, 0]).is_err());
    }

    #[test]
    fn test_unknown_version() {
        let mut payload = mvhd_v0(1000, 1000);
        payload[0] = 3;
        assert!(matches!(
            MovieHeaderParser::parse(&payload),
            Err(TimelineError::UnsupportedVersion { version: 3, .. })
        ));
    }

    #[test]
    fn test_unknown_timing_has_no_duration() {
        assert_eq!(MovieTiming::default().duration_hns(), None);
        let no_scale = MovieTiming {
            timescale: 0,
            duration_ticks: 10,
        };
        assert_eq!(no_scale.duration_ms(), None);
    }

    #[test]
    fn test_large_duration_does_not_overflow() {
        let timing = MovieTiming {
            timescale: 1,
            duration_ticks: u64::MAX / 2,
        };
        assert_eq!(timing.duration_hns(), None);
    }
}
