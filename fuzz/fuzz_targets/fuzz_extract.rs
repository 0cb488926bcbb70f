#![no_main]
use audiobook_timeline::{AudioFile, ChapterExtractor, ChapterTimeline, MemoryMedia};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let media = MemoryMedia::new("fuzz.m4b", data.to_vec());
    let chapters = ChapterExtractor::default().extract(&media, "fuzz.m4b");

    // Whatever came out must form a usable timeline.
    let files = [AudioFile::new("fuzz.m4b", "fuzz.m4b", 0)];
    let timeline = ChapterTimeline::build(&files, Some(chapters));
    let at = timeline.position_to_chapter(timeline.total_ms() / 2);
    assert!(timeline.is_empty() || at.index < timeline.len());
});
