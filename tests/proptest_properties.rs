use std::collections::HashMap;

use deltax::dedup::chunker::extract_chunks;
use deltax::dedup::matcher::{Candidate, resolve_overlaps};
use deltax::dedup::{ChunkMode, PatternMatcher};
use deltax::engine::{self, Corpus, EncodeOptions, SourceFile};
use deltax::format::{Segment, varint};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn mode_strategy() -> impl Strategy<Value = ChunkMode> {
    prop_oneof![
        (1usize..=32).prop_map(|n| ChunkMode::fixed(n).unwrap()),
        proptest::collection::vec(any::<u8>(), 0..3).prop_map(ChunkMode::Separator),
    ]
}

/// Small alphabet so chunks actually repeat.
fn corpus_strategy() -> impl Strategy<Value = Corpus> {
    proptest::collection::vec(
        proptest::collection::vec(prop_oneof![Just(b'a'), Just(b'b'), Just(b' '), Just(b',')], 0..200),
        0..6,
    )
    .prop_map(|files| Corpus {
        files: files
            .into_iter()
            .enumerate()
            .map(|(i, data)| SourceFile::new(format!("f{i}"), data))
            .collect(),
        empty_dirs: Vec::new(),
    })
}

/// Seeded text-like corpus built from a fixed word list.
fn word_corpus(seed: u64, files: usize) -> Corpus {
    const WORDS: &[&str] = &["lorem", "ipsum", "dolor", "sit", "amet", "x", "deltax"];
    let mut rng = StdRng::seed_from_u64(seed);
    let files = (0..files)
        .map(|i| {
            let words = rng.random_range(0..64);
            let mut data = Vec::new();
            for _ in 0..words {
                data.extend_from_slice(WORDS[rng.random_range(0..WORDS.len())].as_bytes());
                data.push(if rng.random_bool(0.1) { b'\n' } else { b' ' });
            }
            SourceFile::new(format!("dir{}/file{i}.txt", i % 3), data)
        })
        .collect();
    Corpus {
        files,
        empty_dirs: vec!["void".into()],
    }
}

proptest! {
    #[test]
    fn prop_varint_idempotent(n in any::<u64>()) {
        let bytes = varint::encode(n);
        prop_assert_eq!(varint::decode(&bytes, 0).unwrap(), (n, bytes.len()));
    }

    #[test]
    fn prop_corpus_roundtrip(corpus in corpus_strategy(), mode in mode_strategy()) {
        let opts = EncodeOptions::new(mode);
        let bytes = engine::encode(&corpus, &opts).unwrap();
        let tree = engine::decode(&bytes).unwrap();
        prop_assert_eq!(tree.files, corpus.files);
    }

    #[test]
    fn prop_patterns_are_exactly_the_repeats(corpus in corpus_strategy(), mode in mode_strategy()) {
        let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();
        for f in &corpus.files {
            for chunk in extract_chunks(&f.data, &mode) {
                *counts.entry(chunk.into_owned()).or_default() += 1;
            }
        }
        let table = engine::build_pattern_table(&corpus.files, &mode);

        let mut seen = std::collections::HashSet::new();
        for p in table.iter() {
            prop_assert!(seen.insert(p.to_vec()), "duplicate pattern {:?}", p);
            prop_assert!(counts.get(p).copied().unwrap_or(0) >= 2);
        }
        let repeats = counts.values().filter(|&&c| c >= 2).count();
        prop_assert_eq!(table.len(), repeats);
    }

    #[test]
    fn prop_segments_expand_to_original_size(corpus in corpus_strategy(), mode in mode_strategy()) {
        let table = engine::build_pattern_table(&corpus.files, &mode);
        let matcher = PatternMatcher::new(&table);
        for f in &corpus.files {
            let segments = matcher.encode(&f.data);
            let total: usize = segments
                .iter()
                .map(|s| s.expanded_len(&table).unwrap())
                .sum();
            prop_assert_eq!(total, f.data.len());
            // No two literals in a row.
            for pair in segments.windows(2) {
                prop_assert!(!(pair[0].is_literal() && pair[1].is_literal()));
            }
        }
    }

    #[test]
    fn prop_overlap_resolution_is_deterministic(
        raw in proptest::collection::vec((0usize..64, 0usize..8, 1usize..12), 0..40)
    ) {
        let candidates: Vec<Candidate> = raw
            .iter()
            .map(|&(start, index, len)| Candidate { start, index, len })
            .collect();
        let mut shuffled = candidates.clone();
        shuffled.reverse();

        let accepted = resolve_overlaps(candidates.clone());
        prop_assert_eq!(&accepted, &resolve_overlaps(shuffled));

        for pair in accepted.windows(2) {
            prop_assert!(pair[0].end() <= pair[1].start);
        }
        // Every accepted candidate is the longest one at its start.
        for a in &accepted {
            let longest = candidates
                .iter()
                .filter(|c| c.start == a.start)
                .map(|c| c.len)
                .max()
                .unwrap();
            prop_assert_eq!(a.len, longest);
        }
    }
}

#[test]
fn seeded_word_corpora_roundtrip() {
    for seed in 0..8u64 {
        let corpus = word_corpus(seed, 12);
        for mode in [
            ChunkMode::separator(" "),
            ChunkMode::separator(""),
            ChunkMode::fixed(5).unwrap(),
        ] {
            let bytes = engine::encode(&corpus, &EncodeOptions::new(mode.clone())).unwrap();
            let tree = engine::decode(&bytes).unwrap();
            assert_eq!(tree.files, corpus.files, "seed {seed} mode {mode}");
            assert_eq!(tree.empty_dirs, corpus.empty_dirs);
        }
    }
}

#[test]
fn seeded_word_corpus_references_shared_words() {
    let corpus = word_corpus(42, 16);
    let archive = engine::encode_corpus(&corpus, &EncodeOptions::new(ChunkMode::separator(" "))).unwrap();
    assert!(!archive.patterns.is_empty());
    let refs: usize = archive
        .files
        .files
        .iter()
        .flat_map(|r| &r.segments)
        .filter(|s| matches!(s, Segment::Reference(_)))
        .count();
    assert!(refs > 0);
}
