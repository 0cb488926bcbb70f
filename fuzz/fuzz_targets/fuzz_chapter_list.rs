#![no_main]
use audiobook_timeline::parsing::{chapter_durations_hns, ChapterListParser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(entries) = ChapterListParser::parse(data, 2000) {
        assert!(entries.len() <= 2000);
        let durations = chapter_durations_hns(&entries, Some(u64::MAX));
        assert_eq!(durations.len(), entries.len());
    }
});
