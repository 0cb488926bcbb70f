//! ChapterTimeline - one addressable chapter sequence per audiobook.
//!
//! A book split into many files gets one chapter per file
//! ([`TimelineMode::FileBoundary`]); a single chaptered file gets the
//! chapters from its embedded list ([`TimelineMode::IntraFile`]). Either
//! way the timeline maps between a global position and a
//! `(chapter, offset)` pair, and between chapters and transport seek
//! targets.

use crate::error::{Result, TimelineError};
use crate::library::AudioFile;
use serde::{Deserialize, Serialize};

/// A resolved chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub name: String,
    /// URI of the file this chapter plays from.
    pub source_uri: String,
    pub duration_ms: u64,
}

impl Chapter {
    pub fn new(name: impl Into<String>, source_uri: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            source_uri: source_uri.into(),
            duration_ms,
        }
    }
}

impl From<&AudioFile> for Chapter {
    fn from(file: &AudioFile) -> Self {
        Self::new(file.name.clone(), file.uri.clone(), file.duration_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineMode {
    /// One chapter per physical file.
    FileBoundary,
    /// Chapters subdivide a single file.
    IntraFile,
}

/// A chapter index plus the offset into that chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChapterPosition {
    pub index: usize,
    pub offset_ms: u64,
}

/// Where the transport should go: a queue item and an offset inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeekTarget {
    pub file_index: usize,
    pub position_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ChapterTimeline {
    mode: TimelineMode,
    chapters: Vec<Chapter>,
    /// Cumulative end of each chapter; sorted, so lookups binary search.
    ends: Vec<u64>,
    /// Probed length of the underlying media; may exceed the chapter sum
    /// when the last chapter's duration is unknown.
    media_ms: u64,
}

impl Default for ChapterTimeline {
    fn default() -> Self {
        Self::from_chapters(TimelineMode::FileBoundary, Vec::new())
    }
}

impl ChapterTimeline {
    /// Build the timeline for a book.
    ///
    /// Embedded chapters win only when the book has exactly one file and
    /// the list is non-empty; otherwise every file becomes a chapter.
    pub fn build(files: &[AudioFile], single_file_chapters: Option<Vec<Chapter>>) -> Self {
        match single_file_chapters {
            Some(chapters) if files.len() == 1 && !chapters.is_empty() => {
                Self::from_chapters(TimelineMode::IntraFile, chapters)
                    .with_media_duration(files[0].duration_ms)
            }
            _ => Self::from_chapters(
                TimelineMode::FileBoundary,
                files.iter().map(Chapter::from).collect(),
            ),
        }
    }

    pub fn from_chapters(mode: TimelineMode, chapters: Vec<Chapter>) -> Self {
        let ends = chapters
            .iter()
            .scan(0u64, |acc, chapter| {
                *acc = acc.saturating_add(chapter.duration_ms);
                Some(*acc)
            })
            .collect();
        Self {
            mode,
            chapters,
            ends,
            media_ms: 0,
        }
    }

    /// Record the probed media length backing the chapters.
    pub fn with_media_duration(mut self, media_ms: u64) -> Self {
        self.media_ms = media_ms;
        self
    }

    pub fn mode(&self) -> TimelineMode {
        self.mode
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Sum of the chapter durations.
    pub fn total_ms(&self) -> u64 {
        self.ends.last().copied().unwrap_or(0)
    }

    /// Playable length: the chapter sum or the probed media length,
    /// whichever is longer.
    pub fn duration_ms(&self) -> u64 {
        self.total_ms().max(self.media_ms)
    }

    #[inline]
    fn clamp_index(&self, index: usize) -> usize {
        index.min(self.chapters.len().saturating_sub(1))
    }

    #[inline]
    fn start_of(&self, index: usize) -> u64 {
        if index == 0 {
            0
        } else {
            self.ends[index - 1]
        }
    }

    /// Find the chapter that owns `global_ms`.
    ///
    /// Positions at or past the end land on the last chapter with the offset
    /// clamped to its duration. O(log n).
    #[inline]
    pub fn position_to_chapter(&self, global_ms: u64) -> ChapterPosition {
        if self.chapters.is_empty() {
            return ChapterPosition::default();
        }

        // First chapter whose cumulative end is past the position.
        let index = self.ends.partition_point(|&end| end <= global_ms);
        if index < self.ends.len() {
            ChapterPosition {
                index,
                offset_ms: global_ms - self.start_of(index),
            }
        } else {
            let last = self.chapters.len() - 1;
            ChapterPosition {
                index: last,
                offset_ms: self.chapters[last].duration_ms,
            }
        }
    }

    /// Global start of a chapter; the index is clamped into range.
    pub fn chapter_to_position(&self, index: usize) -> u64 {
        if self.chapters.is_empty() {
            return 0;
        }
        self.start_of(self.clamp_index(index))
    }

    /// Transport target for jumping to the start of a chapter.
    pub fn chapter_seek_target(&self, index: usize) -> SeekTarget {
        match self.mode {
            TimelineMode::FileBoundary => SeekTarget {
                file_index: self.clamp_index(index),
                position_ms: 0,
            },
            TimelineMode::IntraFile => SeekTarget {
                file_index: 0,
                position_ms: self.chapter_to_position(index),
            },
        }
    }

    /// Transport target for a global position.
    pub fn seek_target(&self, global_ms: u64) -> SeekTarget {
        match self.mode {
            TimelineMode::FileBoundary => {
                let pos = self.position_to_chapter(global_ms);
                SeekTarget {
                    file_index: pos.index,
                    position_ms: pos.offset_ms,
                }
            }
            TimelineMode::IntraFile => SeekTarget {
                file_index: 0,
                position_ms: global_ms,
            },
        }
    }

    /// Global position for a transport-reported item and offset.
    pub fn global_position(&self, file_index: usize, file_position_ms: u64) -> u64 {
        match self.mode {
            TimelineMode::FileBoundary => self
                .chapter_to_position(file_index)
                .saturating_add(file_position_ms),
            TimelineMode::IntraFile => file_position_ms,
        }
    }

    /// Largest position the transport may be sent to: strictly below the
    /// duration, or zero when the duration is unknown.
    pub fn clamp_position(&self, global_ms: u64) -> u64 {
        global_ms.min(self.duration_ms().saturating_sub(1))
    }

    /// `global_ms` unchanged if it lies before the end of the book.
    pub fn check_position(&self, global_ms: u64) -> Result<u64> {
        let total = self.duration_ms();
        if global_ms >= total {
            return Err(TimelineError::SeekOutOfRange {
                position_ms: global_ms,
                duration_ms: total,
            });
        }
        Ok(global_ms)
    }

    /// Transport target for a saved `(chapter, offset)` pair.
    ///
    /// The position is clamped strictly below the duration. With file
    /// boundaries the saved file stays authoritative, so an offset longer
    /// than the probed file duration does not spill into the next file.
    pub fn resume_target(&self, index: usize, offset_ms: u64) -> SeekTarget {
        let start = self.chapter_to_position(index);
        let global = self.clamp_position(start.saturating_add(offset_ms));
        match self.mode {
            TimelineMode::FileBoundary => SeekTarget {
                file_index: self.clamp_index(index),
                position_ms: global.saturating_sub(start),
            },
            TimelineMode::IntraFile => SeekTarget {
                file_index: 0,
                position_ms: global,
            },
        }
    }
}
