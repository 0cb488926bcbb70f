//! Audiobook catalog records consumed by the timeline.
//!
//! Discovery and tag extraction happen elsewhere; this crate only needs
//! each book's ordered files with their probed durations.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One physical audio file of an audiobook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFile {
    pub name: String,
    pub uri: String,
    /// Probed duration; zero when unknown.
    pub duration_ms: u64,
}

impl AudioFile {
    pub fn new(name: impl Into<String>, uri: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            duration_ms,
        }
    }

    /// Lower-case extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audiobook {
    pub id: String,
    pub title: String,
    /// Files in playback order.
    pub files: Vec<AudioFile>,
}

impl Audiobook {
    pub fn new(id: impl Into<String>, title: impl Into<String>, files: Vec<AudioFile>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            files,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.files.iter().map(|f| f.duration_ms).sum()
    }

    /// The single file whose embedded chapter list may replace file
    /// boundaries, or `None` when the book has several files or the file's
    /// container is not in `extensions`.
    pub fn chaptered_file(&self, extensions: &[String]) -> Option<&AudioFile> {
        match self.files.as_slice() {
            [only] => only
                .extension()
                .filter(|ext| extensions.iter().any(|e| e == ext))
                .map(|_| only),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec!["m4b".into(), "m4a".into()]
    }

    #[test]
    fn test_single_m4b_is_chaptered() {
        let book = Audiobook::new(
            "b1",
            "Book",
            vec![AudioFile::new("Book.M4B", "file:///Book.M4B", 60_000)],
        );
        assert_eq!(book.chaptered_file(&exts()).map(|f| f.name.as_str()), Some("Book.M4B"));
    }

    #[test]
    fn test_multi_file_or_mp3_is_not_chaptered() {
        let mp3 = Audiobook::new("b2", "Mp3", vec![AudioFile::new("01.mp3", "u", 1)]);
        assert!(mp3.chaptered_file(&exts()).is_none());

        let split = Audiobook::new(
            "b3",
            "Split",
            vec![AudioFile::new("a.m4b", "u1", 1), AudioFile::new("b.m4b", "u2", 2)],
        );
        assert!(split.chaptered_file(&exts()).is_none());
        assert_eq!(split.duration_ms(), 3);
    }

    #[test]
    fn test_extension_missing() {
        assert_eq!(AudioFile::new("README", "u", 0).extension(), None);
    }
}
