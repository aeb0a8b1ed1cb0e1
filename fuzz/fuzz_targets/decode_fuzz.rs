#![no_main]
use libfuzzer_sys::fuzz_target;
use deltax::engine;
use deltax::format::{FileTable, PatternTable};

fuzz_target!(|data: &[u8]| {
    // Arbitrary archive bytes must only ever produce errors, never panics.
    let _ = engine::decode(data);

    // Same for the raw (already inflated) tables.
    let _ = PatternTable::decode(data);
    let _ = FileTable::decode(data);
});
