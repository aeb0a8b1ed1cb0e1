// Chunk deduplication.
//
// - `chunker` - Chunk extraction (fixed windows or separator tokens)
// - `tally`   - Per-file chunk counts and the global pattern table builder
// - `matcher` - Pattern search, overlap resolution and segment emission

pub mod chunker;
pub mod matcher;
pub mod tally;

pub use chunker::{ChunkMode, extract_chunks};
pub use matcher::{Candidate, PatternMatcher, resolve_overlaps};
pub use tally::{ChunkTally, PatternTableBuilder};
