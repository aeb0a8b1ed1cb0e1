// File delta encoding.
//
// Patterns are bucketed by a short prefix fingerprint: the first
// min(len, 8) bytes packed into a u64, keyed together with that prefix
// length. At every file offset each distinct prefix length is probed once;
// a bucket hit is confirmed with a literal byte comparison. Buckets are
// sorted longest pattern first, so the first confirmed hit in a bucket is
// that bucket's longest match at this offset.
//
// Overlap resolution: candidates sorted by start ascending, longer first at
// equal start; a candidate is accepted only if it starts at or after the end
// of the previously accepted one.

use std::collections::HashMap;

use crate::format::tables::{PatternTable, Segment};

const PREFIX_MAX: usize = 8;

#[inline]
fn fingerprint(bytes: &[u8]) -> u64 {
    debug_assert!(bytes.len() <= PREFIX_MAX);
    let mut buf = [0u8; PREFIX_MAX];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

/// One pattern occurrence inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub start: usize,
    pub index: usize,
    pub len: usize,
}

impl Candidate {
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Read-only index over a frozen pattern table. Shared by all file tasks.
#[derive(Debug)]
pub struct PatternMatcher<'t> {
    table: &'t PatternTable,
    buckets: HashMap<(usize, u64), Vec<usize>>,
    /// Distinct prefix lengths present, ascending.
    prefix_lens: Vec<usize>,
}

impl<'t> PatternMatcher<'t> {
    pub fn new(table: &'t PatternTable) -> Self {
        let mut buckets: HashMap<(usize, u64), Vec<usize>> = HashMap::new();
        for (index, pattern) in table.iter().enumerate() {
            if pattern.is_empty() {
                continue;
            }
            let plen = pattern.len().min(PREFIX_MAX);
            buckets
                .entry((plen, fingerprint(&pattern[..plen])))
                .or_default()
                .push(index);
        }

        for bucket in buckets.values_mut() {
            // Longest first; lower index first among equals.
            bucket.sort_by(|&a, &b| {
                let la = table.get(a).map_or(0, <[u8]>::len);
                let lb = table.get(b).map_or(0, <[u8]>::len);
                lb.cmp(&la).then(a.cmp(&b))
            });
        }

        let mut prefix_lens: Vec<usize> = buckets.keys().map(|&(plen, _)| plen).collect();
        prefix_lens.sort_unstable();
        prefix_lens.dedup();

        Self {
            table,
            buckets,
            prefix_lens,
        }
    }

    pub fn table(&self) -> &'t PatternTable {
        self.table
    }

    /// Longest pattern starting at `pos`, if any.
    fn longest_at(&self, data: &[u8], pos: usize) -> Option<Candidate> {
        let tail = &data[pos..];
        let mut best: Option<Candidate> = None;

        for &plen in &self.prefix_lens {
            if plen > tail.len() {
                break;
            }
            let Some(bucket) = self.buckets.get(&(plen, fingerprint(&tail[..plen]))) else {
                continue;
            };
            let hit = bucket.iter().find_map(|&index| {
                let pattern = self.table.get(index)?;
                tail.starts_with(pattern).then_some(Candidate {
                    start: pos,
                    index,
                    len: pattern.len(),
                })
            });
            if let Some(c) = hit
                && best.is_none_or(|b| c.len > b.len)
            {
                best = Some(c);
            }
        }
        best
    }

    /// For every offset where some pattern occurs, the longest one there.
    /// Returned in ascending start order.
    pub fn find_candidates(&self, data: &[u8]) -> Vec<Candidate> {
        if self.prefix_lens.is_empty() {
            return Vec::new();
        }
        (0..data.len())
            .filter_map(|pos| self.longest_at(data, pos))
            .collect()
    }

    /// Encode one file as literal runs and pattern references.
    pub fn encode(&self, data: &[u8]) -> Vec<Segment> {
        let accepted = resolve_overlaps(self.find_candidates(data));
        emit_segments(data, &accepted)
    }
}

// ---------------------------------------------------------------------------
// Overlap resolution and segment emission
// ---------------------------------------------------------------------------

/// Reduce arbitrary candidates to a non-overlapping, start-ascending set.
pub fn resolve_overlaps(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.len.cmp(&a.len))
            .then(a.index.cmp(&b.index))
    });

    let mut accepted = Vec::with_capacity(candidates.len());
    let mut cursor = 0usize;
    for c in candidates {
        if c.len == 0 || c.start < cursor {
            continue;
        }
        cursor = c.end();
        accepted.push(c);
    }
    accepted
}

/// Walk `data` left to right, filling gaps between accepted candidates
/// with literals.
pub fn emit_segments(data: &[u8], accepted: &[Candidate]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(accepted.len() * 2 + 1);
    let mut cursor = 0usize;
    for c in accepted {
        if cursor < c.start {
            segments.push(Segment::Literal(data[cursor..c.start].to_vec()));
        }
        segments.push(Segment::Reference(c.index));
        cursor = c.end();
    }
    if cursor < data.len() {
        segments.push(Segment::Literal(data[cursor..].to_vec()));
    }
    segments
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
