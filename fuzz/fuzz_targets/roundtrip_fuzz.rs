#![no_main]
use libfuzzer_sys::fuzz_target;
use deltax::dedup::ChunkMode;
use deltax::engine::{self, Corpus, EncodeOptions, SourceFile};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // First byte picks the mode, second the number of files.
    let mode = if data[0] & 1 == 0 {
        ChunkMode::fixed(1 + (data[0] >> 1) as usize).unwrap()
    } else {
        ChunkMode::Separator(data[..(data[0] >> 6) as usize].to_vec())
    };
    let count = 1 + (data[1] as usize % 4);
    let payload = &data[2..];
    let step = payload.len().div_ceil(count).max(1);

    let corpus = Corpus {
        files: payload
            .chunks(step)
            .enumerate()
            .map(|(i, chunk)| SourceFile::new(format!("f{i}"), chunk.to_vec()))
            .collect(),
        empty_dirs: vec!["d".into()],
    };

    let opts = EncodeOptions {
        level: 1,
        ..EncodeOptions::new(mode)
    };
    let bytes = engine::encode(&corpus, &opts).unwrap();
    let tree = engine::decode(&bytes).unwrap();
    assert_eq!(tree.files, corpus.files);
    assert_eq!(tree.empty_dirs, corpus.empty_dirs);
});
