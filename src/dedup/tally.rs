// Pattern table construction.
//
// Each file produces a `ChunkTally`: per-digest occurrence counts plus the
// chunk bytes, kept in first-occurrence order. Tallies are merged into a
// `PatternTableBuilder` strictly in corpus order, so the resulting table is
// ordered by first global occurrence no matter how the per-file work was
// scheduled.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::format::tables::PatternTable;

use super::chunker::{ChunkMode, extract_chunks};

/// Content digest identifying a chunk.
pub type ChunkDigest = [u8; 32];

pub fn digest(chunk: &[u8]) -> ChunkDigest {
    Sha256::digest(chunk).into()
}

// ---------------------------------------------------------------------------
// Per-file tally
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry {
    key: ChunkDigest,
    bytes: Vec<u8>,
    count: u64,
}

/// Chunk counts for one file, in first-occurrence order.
#[derive(Debug, Clone, Default)]
pub struct ChunkTally {
    index: HashMap<ChunkDigest, usize>,
    entries: Vec<Entry>,
    total: u64,
}

impl ChunkTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally every chunk of `data` under `mode`.
    pub fn from_file(data: &[u8], mode: &ChunkMode) -> Self {
        let mut tally = Self::new();
        for chunk in extract_chunks(data, mode) {
            tally.add(&chunk);
        }
        tally
    }

    pub fn add(&mut self, chunk: &[u8]) {
        self.add_count(digest(chunk), chunk, 1);
    }

    fn add_count(&mut self, key: ChunkDigest, chunk: &[u8], count: u64) {
        self.total += count;
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].count += count,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(Entry {
                    key,
                    bytes: chunk.to_vec(),
                    count,
                });
            }
        }
    }

    /// Number of distinct chunks.
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// Number of chunk occurrences, duplicates included.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, chunk: &[u8]) -> u64 {
        self.index
            .get(&digest(chunk))
            .map_or(0, |&slot| self.entries[slot].count)
    }
}

// ---------------------------------------------------------------------------
// Global builder
// ---------------------------------------------------------------------------

/// Accumulates per-file tallies and emits the final pattern table.
#[derive(Debug, Clone, Default)]
pub struct PatternTableBuilder {
    tally: ChunkTally,
    files: usize,
}

impl PatternTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file's tally in. Call in corpus order.
    pub fn merge(&mut self, local: ChunkTally) {
        for entry in local.entries {
            self.tally.add_count(entry.key, &entry.bytes, entry.count);
        }
        self.files += 1;
    }

    pub fn files_merged(&self) -> usize {
        self.files
    }

    pub fn distinct_chunks(&self) -> usize {
        self.tally.distinct()
    }

    pub fn total_chunks(&self) -> u64 {
        self.tally.total()
    }

    /// Keep every chunk seen more than once, in first-occurrence order.
    pub fn finish(self) -> PatternTable {
        PatternTable::new(
            self.tally
                .entries
                .into_iter()
                .filter(|e| e.count > 1)
                .map(|e| e.bytes)
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
