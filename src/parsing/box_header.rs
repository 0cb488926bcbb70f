//! Box header parser.
//!
//! Every ISO base media box starts with a 4-byte big-endian size and a
//! 4-byte type tag. A size of `1` means a 64-bit size follows the type
//! (16-byte header); a size of `0` means the box runs to the end of the
//! enclosing range.

use crate::error::{Result, TimelineError};

/// Box types this crate acts on. Everything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxType {
    /// Movie container.
    Moov,
    /// User data container.
    Udta,
    /// Metadata container; a full box, so its children start 4 bytes in.
    Meta,
    /// iTunes item list container.
    Ilst,
    /// Movie header: timescale and duration.
    Mvhd,
    /// Nero chapter list.
    Chpl,
    Other([u8; 4]),
}

impl BoxType {
    pub fn from_fourcc(fourcc: [u8; 4]) -> Self {
        match &fourcc {
            b"moov" => Self::Moov,
            b"udta" => Self::Udta,
            b"meta" => Self::Meta,
            b"ilst" => Self::Ilst,
            b"mvhd" => Self::Mvhd,
            b"chpl" => Self::Chpl,
            _ => Self::Other(fourcc),
        }
    }

    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            Self::Moov => *b"moov",
            Self::Udta => *b"udta",
            Self::Meta => *b"meta",
            Self::Ilst => *b"ilst",
            Self::Mvhd => *b"mvhd",
            Self::Chpl => *b"chpl",
            Self::Other(fourcc) => *fourcc,
        }
    }

    /// Whether the payload is itself a sequence of boxes we descend into.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Moov | Self::Udta | Self::Meta | Self::Ilst)
    }

    /// Bytes between the end of the header and the first child box.
    pub fn child_offset(&self) -> u64 {
        match self {
            Self::Meta => 4,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub box_type: BoxType,
    /// Resolved size of the whole box, header included.
    pub size: u64,
    /// 8, or 16 when the extended size field is present.
    pub header_size: u64,
}

pub struct BoxHeaderParser;

impl BoxHeaderParser {
    pub const HEADER_SIZE: usize = 8;
    pub const EXTENDED_HEADER_SIZE: usize = 16;

    /// Parse a box header starting at absolute `offset`.
    ///
    /// `remaining` is the number of bytes from `offset` to the end of the
    /// enclosing range; a box may not claim more than that.
    pub fn parse(buffer: &[u8], offset: u64, remaining: u64) -> Result<BoxHeader> {
        if buffer.len() < Self::HEADER_SIZE {
            return Err(TimelineError::BufferTooSmall {
                needed: Self::HEADER_SIZE,
                have: buffer.len(),
            });
        }

        let raw_size = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]);
        let box_type = BoxType::from_fourcc([buffer[4], buffer[5], buffer[6], buffer[7]]);

        let (size, header_size) = match raw_size {
            0 => (remaining, Self::HEADER_SIZE as u64),
            1 => {
                if buffer.len() < Self::EXTENDED_HEADER_SIZE {
                    return Err(TimelineError::BufferTooSmall {
                        needed: Self::EXTENDED_HEADER_SIZE,
                        have: buffer.len(),
                    });
                }
                let mut large = [0u8; 8];
                large.copy_from_slice(&buffer[8..16]);
                let large = u64::from_be_bytes(large);
                (large, Self::EXTENDED_HEADER_SIZE as u64)
            }
            n => (n as u64, Self::HEADER_SIZE as u64),
        };

        if size < header_size {
            return Err(TimelineError::MalformedBox {
                offset,
                reason: "size smaller than header",
            });
        }
        if size > remaining {
            return Err(TimelineError::MalformedBox {
                offset,
                reason: "size extends past enclosing range",
            });
        }

        Ok(BoxHeader {
            box_type,
            size,
            header_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact_header() {
        let buffer = [0, 0, 0, 0x20, b'm', b'o', b'o', b'v'];
        let header = BoxHeaderParser::parse(&buffer, 0, 100).unwrap();
        assert_eq!(header.box_type, BoxType::Moov);
        assert_eq!(header.size, 32);
        assert_eq!(header.header_size, 8);
    }

    #[test]
    fn test_parse_extended_size() {
        let mut buffer = vec![0, 0, 0, 1];
        buffer.extend_from_slice(b"mdat");
        buffer.extend_from_slice(&40u64.to_be_bytes());
        let header = BoxHeaderParser::parse(&buffer, 0, 40).unwrap();
        assert_eq!(header.box_type, BoxType::Other(*b"mdat"));
        assert_eq!(header.size, 40);
        assert_eq!(header.header_size, 16);
    }

    #[test]
    fn test_size_zero_extends_to_range_end() {
        let buffer = [0, 0, 0, 0, b'm', b'd', b'a', b't'];
        let header = BoxHeaderParser::parse(&buffer, 64, 1000).unwrap();
        assert_eq!(header.size, 1000);
    }

    #[test]
    fn test_extended_size_needs_sixteen_bytes() {
        let buffer = [0, 0, 0, 1, b'm', b'd', b'a', b't', 0, 0];
        assert!(matches!(
            BoxHeaderParser::parse(&buffer, 0, 100),
            Err(TimelineError::BufferTooSmall { needed: 16, have: 10 })
        ));
    }

    #[test]
    fn test_rejects_undersized_and_oversized() {
        let tiny = [0, 0, 0, 4, b'f', b'r', b'e', b'e'];
        assert!(matches!(
            BoxHeaderParser::parse(&tiny, 0, 100),
            Err(TimelineError::MalformedBox { .. })
        ));

        let huge = [0xFF, 0xFF, 0xFF, 0xFF, b'f', b'r', b'e', b'e'];
        assert!(matches!(
            BoxHeaderParser::parse(&huge, 8, 100),
            Err(TimelineError::MalformedBox { offset: 8, .. })
        ));
    }

    #[test]
    fn test_meta_children_skip_version_and_flags() {
        assert_eq!(BoxType::Meta.child_offset(), 4);
        assert_eq!(BoxType::Udta.child_offset(), 0);
        assert!(!BoxType::Chpl.is_container());
        assert_eq!(BoxType::from_fourcc(*b"chpl").fourcc(), *b"chpl");
    }
}
