//! Embedded chapter extraction for MP4-family audio files.
//!
//! The extractor walks `moov`, `udta`, `meta` and `ilst` containers with an
//! explicit work list instead of recursion, picks up the movie header and
//! the first non-empty chapter list, and turns them into [`Chapter`]s.
//!
//! Extraction never fails: unreadable files, corrupt boxes and unsupported
//! versions all degrade to fewer (or no) chapters, which callers treat as
//! "use file boundaries instead".

use crate::config::ParseOptions;
use crate::error::TimelineError;
use crate::file_media::{LocalFileMedia, MediaSource};
use crate::parsing::{
    chapter_durations_hns, read_payload, BoxReader, BoxType, ChapterListParser, ContainerBox,
    MovieHeaderParser, MovieTiming, RawChapterEntry, HNS_PER_MS,
};
use crate::timeline::Chapter;
use std::path::Path;
use tracing::{debug, warn};

/// What one pass over a file found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterScan {
    pub timing: MovieTiming,
    pub entries: Vec<RawChapterEntry>,
}

impl ChapterScan {
    /// Resolve entries into named chapters with millisecond durations.
    ///
    /// Blank titles become `Chapter N`.
    pub fn into_chapters(self, source_uri: &str) -> Vec<Chapter> {
        let durations = chapter_durations_hns(&self.entries, self.timing.duration_hns());
        self.entries
            .into_iter()
            .zip(durations)
            .enumerate()
            .map(|(i, (entry, duration_hns))| {
                let name = if entry.title.trim().is_empty() {
                    format!("Chapter {}", i + 1)
                } else {
                    entry.title
                };
                Chapter::new(name, source_uri, duration_hns / HNS_PER_MS)
            })
            .collect()
    }
}

/// A pending range of child boxes.
#[derive(Debug, Clone, Copy)]
struct WorkItem {
    start: u64,
    end: u64,
    depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ChapterExtractor {
    opts: ParseOptions,
}

impl ChapterExtractor {
    pub fn new(opts: ParseOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.opts
    }

    /// Walk the box tree and collect timing and chapter entries.
    pub fn scan<M: MediaSource + ?Sized>(&self, media: &M) -> ChapterScan {
        let mut scan = ChapterScan::default();
        let mut work = vec![WorkItem {
            start: 0,
            end: media.length(),
            depth: 0,
        }];
        let mut visited = 0usize;

        while let Some(item) = work.pop() {
            // Children are pushed after the loop in reverse so the stack
            // pops them in file order.
            let mut children = Vec::new();

            for found in BoxReader::new(media, item.start, item.end) {
                visited += 1;
                if visited > self.opts.max_boxes {
                    let err = TimelineError::ResourceExhausted {
                        what: "boxes",
                        limit: self.opts.max_boxes as u64,
                    };
                    warn!(media = media.name(), "{}", err);
                    return scan;
                }

                match found.box_type {
                    BoxType::Mvhd => {
                        if let Some(timing) = self.decode_movie_header(media, &found) {
                            scan.timing = timing;
                        }
                    }
                    BoxType::Chpl if scan.entries.is_empty() => {
                        scan.entries = self.decode_chapter_list(media, &found);
                    }
                    t if t.is_container() => {
                        if item.depth + 1 >= self.opts.max_depth {
                            debug!(offset = found.offset, "container nesting too deep, skipping");
                            continue;
                        }
                        let (start, end) = found.children_range();
                        children.push(WorkItem {
                            start,
                            end,
                            depth: item.depth + 1,
                        });
                    }
                    _ => {}
                }
            }

            work.extend(children.into_iter().rev());
        }

        scan
    }

    fn decode_movie_header<M: MediaSource + ?Sized>(
        &self,
        media: &M,
        found: &ContainerBox,
    ) -> Option<MovieTiming> {
        let payload = self.payload(media, found)?;
        match MovieHeaderParser::parse(&payload) {
            Ok(timing) => Some(timing),
            Err(e) => {
                warn!(media = media.name(), offset = found.offset, error = %e, "ignoring movie header");
                None
            }
        }
    }

    fn decode_chapter_list<M: MediaSource + ?Sized>(
        &self,
        media: &M,
        found: &ContainerBox,
    ) -> Vec<RawChapterEntry> {
        let Some(payload) = self.payload(media, found) else {
            return Vec::new();
        };
        match ChapterListParser::parse(&payload, self.opts.max_chapters) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(media = media.name(), offset = found.offset, error = %e, "ignoring chapter list");
                Vec::new()
            }
        }
    }

    fn payload<M: MediaSource + ?Sized>(&self, media: &M, found: &ContainerBox) -> Option<Vec<u8>> {
        if found.payload_size > self.opts.max_box_payload as u64 {
            debug!(
                box_size = found.payload_size,
                limit = self.opts.max_box_payload,
                "box payload capped"
            );
        }
        match read_payload(media, found, self.opts.max_box_payload) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(media = media.name(), offset = found.offset, error = %e, "box payload unreadable");
                None
            }
        }
    }

    /// Chapters embedded in `media`, or an empty list.
    pub fn extract<M: MediaSource + ?Sized>(&self, media: &M, source_uri: &str) -> Vec<Chapter> {
        let chapters = self.scan(media).into_chapters(source_uri);
        debug!(media = media.name(), count = chapters.len(), "extracted chapters");
        chapters
    }

    /// Chapters embedded in the file at `path`, or an empty list if the file
    /// cannot be opened.
    pub fn extract_path(&self, path: &Path) -> Vec<Chapter> {
        match LocalFileMedia::new(path) {
            Ok(media) => self.extract(&media, &path.to_string_lossy()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open audio file");
                Vec::new()
            }
        }
    }
}

/// Read the embedded chapters of one file with default limits.
pub fn read_chapters(path: impl AsRef<Path>) -> Vec<Chapter> {
    ChapterExtractor::default().extract_path(path.as_ref())
}

/// Read chapters on the blocking pool so the caller's task is never stalled
/// by file I/O.
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub async fn read_chapters_async(
    path: impl AsRef<Path>,
    opts: ParseOptions,
) -> Vec<Chapter> {
    let path = path.as_ref().to_path_buf();
    match tokio::task::spawn_blocking(move || ChapterExtractor::new(opts).extract_path(&path)).await
    {
        Ok(chapters) => chapters,
        Err(e) => {
            warn!(error = %e, "chapter extraction task failed");
            Vec::new()
        }
    }
}

/// Read chapters for many files in parallel. Results keep input order.
#[cfg(feature = "parallel")]
#[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
pub fn read_chapters_many<P>(paths: &[P], opts: &ParseOptions) -> Vec<Vec<Chapter>>
where
    P: AsRef<Path> + Sync,
{
    use rayon::prelude::*;

    let extractor = ChapterExtractor::new(opts.clone());
    paths
        .par_iter()
        .map(|path| extractor.extract_path(path.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_media::MemoryMedia;
    use crate::parsing::fixtures::{chpl_v1, m4b, meta_payload, mp4_box, mvhd_v1};

    #[test]
    fn test_extract_resolves_durations() {
        // 2 s movie at a 1 kHz timescale = 20_000_000 hns.
        let data = m4b(1000, 2000, &[(0, "One"), (5_000_000, "Two"), (12_000_000, "Three")]);
        let media = MemoryMedia::new("book.m4b", data);

        let chapters = ChapterExtractor::default().extract(&media, "file:///book.m4b");
        let durations: Vec<u64> = chapters.iter().map(|c| c.duration_ms).collect();
        assert_eq!(durations, [500, 700, 800]);
        assert_eq!(chapters[2].name, "Three");
        assert!(chapters.iter().all(|c| c.source_uri == "file:///book.m4b"));
    }

    #[test]
    fn test_blank_titles_are_numbered() {
        let data = m4b(1000, 3000, &[(0, ""), (10_000_000, "  ")]);
        let media = MemoryMedia::new("book.m4b", data);
        let chapters = ChapterExtractor::default().extract(&media, "u");
        assert_eq!(chapters[0].name, "Chapter 1");
        assert_eq!(chapters[1].name, "Chapter 2");
    }

    #[test]
    fn test_chapter_list_inside_meta() {
        let chpl = mp4_box(b"chpl", &chpl_v1(&[(0, "A"), (10_000_000, "B")]));
        let hdlr = mp4_box(b"hdlr", &[0; 24]);
        let ilst = mp4_box(b"ilst", &mp4_box(b"\xA9nam", &[0; 8]));
        let meta = mp4_box(b"meta", &meta_payload(&[hdlr, ilst, chpl]));
        let mut moov = mp4_box(b"mvhd", &mvhd_v1(600, 1200));
        moov.extend(mp4_box(b"udta", &meta));

        let mut data = mp4_box(b"ftyp", b"M4A ");
        data.extend(mp4_box(b"moov", &moov));
        let media = MemoryMedia::new("book.m4a", data);

        let chapters = ChapterExtractor::default().extract(&media, "u");
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].duration_ms, 1000);
        assert_eq!(chapters[1].duration_ms, 1000);
    }

    #[test]
    fn test_missing_movie_header_zeroes_last_duration() {
        let udta = mp4_box(b"udta", &mp4_box(b"chpl", &chpl_v1(&[(0, "A"), (50_000, "B")])));
        let data = mp4_box(b"moov", &udta);
        let media = MemoryMedia::new("book.m4b", data);

        let scan = ChapterExtractor::default().scan(&media);
        assert!(!scan.timing.is_known());
        let chapters = scan.into_chapters("u");
        assert_eq!(chapters[0].duration_ms, 5);
        assert_eq!(chapters[1].duration_ms, 0);
    }

    #[test]
    fn test_no_chapters_in_plain_file() {
        let mut data = mp4_box(b"ftyp", b"M4A ");
        data.extend(mp4_box(b"moov", &mp4_box(b"mvhd", &mvhd_v1(1000, 1000))));
        let media = MemoryMedia::new("song.m4a", data);
        let scan = ChapterExtractor::default().scan(&media);
        assert_eq!(scan.timing.timescale, 1000);
        assert!(scan.into_chapters("u").is_empty());
    }

    #[test]
    fn test_garbage_yields_nothing() {
        let media = MemoryMedia::new("junk", vec![0xAB; 300]);
        assert!(ChapterExtractor::default().extract(&media, "u").is_empty());
        let empty = MemoryMedia::new("empty", Vec::new());
        assert!(ChapterExtractor::default().extract(&empty, "u").is_empty());
    }

    #[test]
    fn test_corrupt_trailing_data_keeps_chapters() {
        let mut data = m4b(1000, 2000, &[(0, "A"), (10_000_000, "B")]);
        data.extend_from_slice(&[0x7F, 0xFF, 0xFF, 0xFF]);
        data.extend_from_slice(b"bad!");
        let media = MemoryMedia::new("book.m4b", data);
        assert_eq!(ChapterExtractor::default().extract(&media, "u").len(), 2);
    }

    #[test]
    fn test_depth_limit_stops_descent() {
        let data = m4b(1000, 2000, &[(0, "A")]);
        let media = MemoryMedia::new("book.m4b", data);
        let shallow = ChapterExtractor::new(ParseOptions {
            max_depth: 2,
            ..ParseOptions::default()
        });
        // moov is followed, udta is not.
        let scan = shallow.scan(&media);
        assert!(scan.timing.is_known());
        assert!(scan.entries.is_empty());
    }

    #[test]
    fn test_box_limit_stops_scan() {
        let mut data = Vec::new();
        for _ in 0..20 {
            data.extend(mp4_box(b"free", &[]));
        }
        data.extend(m4b(1000, 2000, &[(0, "A")]));
        let media = MemoryMedia::new("book.m4b", data);
        let limited = ChapterExtractor::new(ParseOptions {
            max_boxes: 10,
            ..ParseOptions::default()
        });
        assert!(limited.extract(&media, "u").is_empty());
    }

    #[test]
    fn test_payload_cap_truncates_chapter_list() {
        let titles: Vec<String> = (0..50).map(|i| format!("Chapter title {:02}", i)).collect();
        let entries: Vec<(u64, &str)> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| (i as u64 * 10_000_000, t.as_str()))
            .collect();
        let data = m4b(1000, 60_000, &entries);
        let media = MemoryMedia::new("book.m4b", data);

        let capped = ChapterExtractor::new(ParseOptions {
            max_box_payload: 256,
            ..ParseOptions::default()
        });
        let chapters = capped.extract(&media, "u");
        assert!(!chapters.is_empty());
        assert!(chapters.len() < 50);
    }

    #[test]
    fn test_read_chapters_missing_file() {
        assert!(read_chapters("/no/such/book.m4b").is_empty());
    }

    #[test]
    fn test_read_chapters_from_disk() {
        use std::io::Write;
        let mut file = tempfile::Builder::new().suffix(".m4b").tempfile().unwrap();
        file.write_all(&m4b(44_100, 441_000, &[(0, "Intro"), (40_000_000, "Outro")]))
            .unwrap();
        file.flush().unwrap();

        let chapters = read_chapters(file.path());
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].duration_ms, 4000);
        assert_eq!(chapters[1].duration_ms, 6000);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_read_chapters_async() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&m4b(1000, 2000, &[(0, "A"), (10_000_000, "B")]))
            .unwrap();
        file.flush().unwrap();

        let chapters = read_chapters_async(file.path(), ParseOptions::default()).await;
        assert_eq!(chapters.len(), 2);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_read_chapters_many_keeps_order() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for n in 1..=4u64 {
            let path = dir.path().join(format!("{}.m4b", n));
            let entries: Vec<(u64, &str)> = (0..n).map(|i| (i * 1_000_000, "c")).collect();
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(&m4b(1000, 10_000, &entries)).unwrap();
            paths.push(path);
        }
        paths.push(dir.path().join("missing.m4b"));

        let results = read_chapters_many(&paths, &ParseOptions::default());
        let counts: Vec<usize> = results.iter().map(|c| c.len()).collect();
        assert_eq!(counts, [1, 2, 3, 4, 0]);
    }
}
