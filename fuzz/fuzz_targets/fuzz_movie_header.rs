#![no_main]
use audiobook_timeline::parsing::MovieHeaderParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(timing) = MovieHeaderParser::parse(data) {
        let _ = timing.duration_ms();
    }
});
