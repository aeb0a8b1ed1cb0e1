#![no_main]
use libfuzzer_sys::fuzz_target;
use deltax::dedup::PatternMatcher;
use deltax::format::{PatternTable, Segment};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Carve patterns out of the input itself so matches are likely.
    let n = 1 + data[0] as usize % 8;
    let body = &data[1..];
    let patterns: Vec<Vec<u8>> = (0..n)
        .filter_map(|i| {
            let start = (i * 7) % body.len().max(1);
            let len = 1 + (i * 3) % 13;
            body.get(start..(start + len).min(body.len())).map(<[u8]>::to_vec)
        })
        .collect();
    let table = PatternTable::new(patterns);
    let matcher = PatternMatcher::new(&table);

    let segments = matcher.encode(body);
    let mut rebuilt = Vec::with_capacity(body.len());
    for s in &segments {
        match s {
            Segment::Literal(b) => rebuilt.extend_from_slice(b),
            Segment::Reference(i) => rebuilt.extend_from_slice(table.get(*i).unwrap()),
        }
    }
    assert_eq!(rebuilt, body);
});
