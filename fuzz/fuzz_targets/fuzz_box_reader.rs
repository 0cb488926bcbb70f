#![no_main]
use audiobook_timeline::parsing::{BoxHeaderParser, BoxReader};
use audiobook_timeline::MemoryMedia;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = BoxHeaderParser::parse(data, 0, data.len() as u64);

    let media = MemoryMedia::new("fuzz", data.to_vec());
    let mut end = 0;
    for found in BoxReader::top_level(&media) {
        assert!(found.offset >= end);
        assert!(found.end() <= data.len() as u64);
        end = found.end();
    }
});
