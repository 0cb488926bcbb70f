//! Options for chapter extraction and playback coordination.
//!
//! Both structs are plain data with defaults, and deserialize from any
//! serde format with missing fields filled in from [`Default`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied while walking a container file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum bytes of a single box payload copied into memory.
    pub max_box_payload: usize,
    /// Maximum chapter entries decoded from one chapter list.
    pub max_chapters: usize,
    /// Maximum container nesting depth followed.
    pub max_depth: usize,
    /// Maximum boxes visited in one file.
    pub max_boxes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_box_payload: 512 * 1024,
            max_chapters: 2000,
            max_depth: 8,
            max_boxes: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Step used by skip forward/backward.
    pub skip_interval_ms: u64,
    /// How often resume state is written while playing.
    pub persist_interval_ms: u64,
    /// Lower-case file extensions whose containers carry embedded chapters.
    pub embedded_chapter_extensions: Vec<String>,
}

impl PlaybackConfig {
    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.persist_interval_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            skip_interval_ms: 15_000,
            persist_interval_ms: 2_500,
            embedded_chapter_extensions: vec!["m4b".into(), "m4a".into(), "mp4".into()],
        }
    }
}
