//! Error types for box parsing, chapter decoding and playback coordination.
//!
//! This module provides the [`TimelineError`] type. None of these errors
//! escape the public chapter-extraction or coordinator entry points: each
//! decode step returns a `Result` so the caller can recover locally, keep
//! whatever was decoded so far, and degrade to an empty chapter list.
//!
//! ## Error Categories
//!
//! | Category | Errors | Recovery |
//! |----------|--------|----------|
//! | Format | [`MalformedBox`], [`UnsupportedVersion`] | Truncate traversal / zero-fill the field |
//! | Limits | [`ResourceExhausted`], [`BufferTooSmall`] | Cap and continue |
//! | I/O | [`Io`] | Empty chapter list |
//! | Playback | [`SeekOutOfRange`] | Clamp before issuing to the transport |
//! | Persistence | [`Persistence`] | Log and drop the write |
//!
//! [`MalformedBox`]: TimelineError::MalformedBox
//! [`UnsupportedVersion`]: TimelineError::UnsupportedVersion
//! [`ResourceExhausted`]: TimelineError::ResourceExhausted
//! [`BufferTooSmall`]: TimelineError::BufferTooSmall
//! [`Io`]: TimelineError::Io
//! [`SeekOutOfRange`]: TimelineError::SeekOutOfRange
//! [`Persistence`]: TimelineError::Persistence

use std::fmt;
use std::io;

/// Error type for timeline operations.
#[derive(Debug)]
pub enum TimelineError {
    /// A box header is truncated, has a zero/undersized length, or claims
    /// more bytes than its enclosing range holds.
    MalformedBox {
        /// Absolute file offset of the offending header.
        offset: u64,
        /// Short description of what was wrong.
        reason: &'static str,
    },

    /// A full box carries a version byte this crate does not understand.
    UnsupportedVersion {
        /// Four-character box type, e.g. `mvhd`.
        box_type: [u8; 4],
        version: u8,
    },

    /// A count or size exceeded a configured cap.
    ///
    /// Never surfaced to callers; the value is clamped instead.
    ResourceExhausted {
        what: &'static str,
        limit: u64,
    },

    /// Fewer bytes were available than a fixed-layout field needs.
    BufferTooSmall {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        have: usize,
    },

    /// A playback position at or past the end of the media.
    SeekOutOfRange {
        position_ms: u64,
        duration_ms: u64,
    },

    /// The durable key-value store failed to read or write.
    Persistence(String),

    /// An I/O error occurred.
    ///
    /// Wraps [`std::io::Error`] for file system operations.
    Io(io::Error),
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedBox { offset, reason } => {
                write!(f, "Malformed box at offset {}: {}", offset, reason)
            }
            Self::UnsupportedVersion { box_type, version } => write!(
                f,
                "Unsupported {} version: {}",
                String::from_utf8_lossy(box_type),
                version
            ),
            Self::ResourceExhausted { what, limit } => {
                write!(f, "Too many {} (limit {})", what, limit)
            }
            Self::BufferTooSmall { needed, have } => {
                write!(f, "Buffer too small: need {} bytes, have {}", needed, have)
            }
            Self::SeekOutOfRange {
                position_ms,
                duration_ms,
            } => write!(
                f,
                "Seek out of range: {} ms (duration: {} ms)",
                position_ms, duration_ms
            ),
            Self::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for TimelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TimelineError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for TimelineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TimelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_box_type() {
        let err = TimelineError::UnsupportedVersion {
            box_type: *b"chpl",
            version: 7,
        };
        assert_eq!(err.to_string(), "Unsupported chpl version: 7");
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error;
        let err: TimelineError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("IO error"));
    }
}
