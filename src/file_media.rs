//! MediaSource trait - abstract random-access byte source for box reading.

use crate::error::{Result, TimelineError};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Interval for reading a byte range. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadInterval {
    pub start: u64,
    pub end: u64,
}

impl ReadInterval {
    /// Interval covering `len` bytes from `start`. A zero `len` gives an
    /// empty interval (`end < start`).
    pub fn with_len(start: u64, len: u64) -> Self {
        match len.checked_sub(1) {
            Some(last) => Self {
                start,
                end: start.saturating_add(last),
            },
            None => {
                let start = start.max(1);
                Self {
                    start,
                    end: start - 1,
                }
            }
        }
    }

    pub fn len(&self) -> u64 {
        if self.end >= self.start {
            self.end - self.start + 1
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Abstract byte source that can provide byte ranges.
///
/// Implement this trait for custom byte sources (e.g. platform content
/// providers). The library provides [`LocalFileMedia`] for local files and
/// [`MemoryMedia`] for buffers already in memory.
pub trait MediaSource: Send + Sync {
    fn length(&self) -> u64;
    fn name(&self) -> &str;
    /// Read exactly the bytes in `interval`; short reads are errors.
    fn read_range(&self, interval: ReadInterval) -> Result<Vec<u8>>;
}

/// Local file implementation.
///
/// Every read opens its own handle, so independent extractions never share
/// a cursor.
#[derive(Debug, Clone)]
pub struct LocalFileMedia {
    path: PathBuf,
    name: String,
    length: u64,
}

impl LocalFileMedia {
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            length: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MediaSource for LocalFileMedia {
    fn length(&self) -> u64 {
        self.length
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_range(&self, interval: ReadInterval) -> Result<Vec<u8>> {
        if interval.is_empty() || interval.end >= self.length {
            return Err(TimelineError::BufferTooSmall {
                needed: interval.len() as usize,
                have: self.length.saturating_sub(interval.start) as usize,
            });
        }
        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(interval.start))?;
        let mut buffer = vec![0u8; interval.len() as usize];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

/// In-memory byte source.
#[derive(Debug, Clone)]
pub struct MemoryMedia {
    name: String,
    data: Arc<[u8]>,
}

impl MemoryMedia {
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl MediaSource for MemoryMedia {
    fn length(&self) -> u64 {
        self.data.len() as u64
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_range(&self, interval: ReadInterval) -> Result<Vec<u8>> {
        let len = self.data.len() as u64;
        if interval.is_empty() || interval.end >= len {
            return Err(TimelineError::BufferTooSmall {
                needed: interval.len() as usize,
                have: len.saturating_sub(interval.start) as usize,
            });
        }
        Ok(self.data[interval.start as usize..=interval.end as usize].to_vec())
    }
}
