//! Sequential box traversal over a byte range of a [`MediaSource`].
//!
//! The reader never buffers the file: each step reads at most one 16-byte
//! header. Traversal stops at the first malformed or truncated header and
//! the boxes already yielded stay valid.

use super::box_header::{BoxHeaderParser, BoxType};
use crate::error::Result;
use crate::file_media::{MediaSource, ReadInterval};
use tracing::debug;

/// A box located inside a media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerBox {
    pub box_type: BoxType,
    /// Absolute offset of the box header.
    pub offset: u64,
    /// Size of the whole box, header included.
    pub size: u64,
    pub payload_offset: u64,
    pub payload_size: u64,
}

impl ContainerBox {
    /// Absolute offset one past the last payload byte.
    pub fn end(&self) -> u64 {
        self.payload_offset + self.payload_size
    }

    /// Byte range holding this container's child boxes.
    pub fn children_range(&self) -> (u64, u64) {
        let start = (self.payload_offset + self.box_type.child_offset()).min(self.end());
        (start, self.end())
    }
}

/// Lazy iterator over the boxes in `[start, end)`.
pub struct BoxReader<'a, M: MediaSource + ?Sized> {
    media: &'a M,
    start: u64,
    end: u64,
    position: u64,
    done: bool,
}

impl<'a, M: MediaSource + ?Sized> BoxReader<'a, M> {
    /// Reader over `[start, end)`; `end` is clamped to the media length.
    pub fn new(media: &'a M, start: u64, end: u64) -> Self {
        let end = end.min(media.length());
        Self {
            media,
            start,
            end,
            position: start,
            done: false,
        }
    }

    /// Reader over the top-level boxes of the whole source.
    pub fn top_level(media: &'a M) -> Self {
        Self::new(media, 0, media.length())
    }

    /// Rewind to the start of the range.
    pub fn restart(&mut self) {
        self.position = self.start;
        self.done = false;
    }

    fn read_next(&mut self) -> Result<Option<ContainerBox>> {
        let remaining = self.end.saturating_sub(self.position);
        if remaining < BoxHeaderParser::HEADER_SIZE as u64 {
            return Ok(None);
        }

        let read_len = remaining.min(BoxHeaderParser::EXTENDED_HEADER_SIZE as u64);
        let header_buf = self
            .media
            .read_range(ReadInterval::with_len(self.position, read_len))?;
        let header = BoxHeaderParser::parse(&header_buf, self.position, remaining)?;

        let found = ContainerBox {
            box_type: header.box_type,
            offset: self.position,
            size: header.size,
            payload_offset: self.position + header.header_size,
            payload_size: header.size - header.header_size,
        };
        self.position += header.size;
        Ok(Some(found))
    }
}

impl<M: MediaSource + ?Sized> Iterator for BoxReader<'_, M> {
    type Item = ContainerBox;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(found)) => Some(found),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                debug!(
                    media = self.media.name(),
                    offset = self.position,
                    error = %e,
                    "stopping box traversal"
                );
                self.done = true;
                None
            }
        }
    }
}

/// Read a box payload, keeping at most `cap` bytes.
pub fn read_payload<M: MediaSource + ?Sized>(
    media: &M,
    found: &ContainerBox,
    cap: usize,
) -> Result<Vec<u8>> {
    let len = found.payload_size.min(cap as u64);
    if len == 0 {
        return Ok(Vec::new());
    }
    media.read_range(ReadInterval::with_len(found.payload_offset, len))
}
