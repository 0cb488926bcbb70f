//! Chapter timelines and resumable playback for audiobooks.
//!
//! Reads the Nero-style `chpl` chapter list and the `mvhd` movie header out
//! of MP4/M4B containers without loading the file, and turns either those
//! chapters or a book's file list into one seekable chapter timeline.
//! A playback coordinator drives an external audio transport over that
//! timeline and persists where the listener left off.
//!
//! ```no_run
//! use audiobook_timeline::{read_chapters, AudioFile, ChapterTimeline};
//!
//! let chapters = read_chapters("book.m4b");
//! let files = [AudioFile::new("book.m4b", "file:///book.m4b", 3_600_000)];
//! let timeline = ChapterTimeline::build(&files, Some(chapters));
//! let at = timeline.position_to_chapter(90_000);
//! println!("chapter {} +{} ms", at.index, at.offset_ms);
//! ```
//!
//! ## Features
//! - `async` - [`read_chapters_async`] runs extraction on tokio's blocking pool
//! - `parallel` - [`read_chapters_many`] scans many files with rayon

pub mod chapters;
pub mod config;
pub mod coordinator;
pub mod error;
mod file_media;
pub mod library;
pub mod parsing;
pub mod persistence;
pub mod timeline;
pub mod transport;

pub use chapters::{read_chapters, ChapterExtractor, ChapterScan};
pub use config::{ParseOptions, PlaybackConfig};
pub use coordinator::{PlaybackCoordinator, PlaybackSnapshot};
pub use error::{Result, TimelineError};
pub use file_media::{LocalFileMedia, MediaSource, MemoryMedia, ReadInterval};
pub use library::{AudioFile, Audiobook};
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore, ResumeState, ResumeStore, StoredValue};
pub use timeline::{Chapter, ChapterPosition, ChapterTimeline, SeekTarget, TimelineMode};
pub use transport::{PlayerState, QueueItem, Transport, TransportEvent};

#[cfg(feature = "async")]
pub use chapters::read_chapters_async;
#[cfg(feature = "parallel")]
pub use chapters::read_chapters_many;
