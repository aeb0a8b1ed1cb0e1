// Archive engine: ties chunking, pattern discovery and delta encoding to the
// archive format.
//
// Encoding runs in two fan-out/fan-in phases over the corpus:
//   1. per-file chunk tallies, merged in corpus order into the pattern table
//   2. per-file delta encoding against the frozen table
// Phase 2 starts only once phase 1 has returned the finished table.
//
// Decoding unpacks the archive and replays every file's segments against
// the pattern table. Reconstruction is independent per file.

use log::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::dedup::chunker::ChunkMode;
use crate::dedup::matcher::PatternMatcher;
use crate::dedup::tally::{ChunkTally, PatternTableBuilder};
use crate::error::{DeltaXError, Result};
use crate::format::archive::Archive;
use crate::format::header::Header;
use crate::format::section::{DEFAULT_LEVEL, GzipCodec};
use crate::format::tables::{FileRecord, FileTable, PatternTable, Segment};

// ---------------------------------------------------------------------------
// Input corpus
// ---------------------------------------------------------------------------

/// One input file: relative `/`-separated path plus its full contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }
}

/// Everything the encoder consumes, in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    pub files: Vec<SourceFile>,
    pub empty_dirs: Vec<String>,
}

impl Corpus {
    pub fn input_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.data.len() as u64).sum()
    }
}

// ---------------------------------------------------------------------------
// Encode options
// ---------------------------------------------------------------------------

/// Configuration for archive creation.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub mode: ChunkMode,
    /// Gzip level (0-9) for both table blocks.
    pub level: u32,
    /// Worker count. `None` uses the global pool.
    pub threads: Option<usize>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            mode: ChunkMode::default(),
            level: DEFAULT_LEVEL,
            threads: None,
        }
    }
}

impl EncodeOptions {
    pub fn new(mode: ChunkMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Worker pool helpers
// ---------------------------------------------------------------------------

#[cfg(feature = "parallel")]
pub(crate) fn map_each<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_each<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items.iter().map(f).collect()
}

/// Like `map_each`, stopping outstanding work at the first error.
#[cfg(feature = "parallel")]
pub(crate) fn try_map_each<T, R, F>(items: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync + Send,
{
    items.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn try_map_each<T, R, F>(items: &[T], f: F) -> Result<Vec<R>>
where
    F: Fn(&T) -> Result<R>,
{
    items.iter().map(f).collect()
}

/// Run `f` on a dedicated pool of `threads` workers, or on the global pool.
#[cfg(feature = "parallel")]
pub fn with_threads<R, F>(threads: Option<usize>, f: F) -> Result<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match threads {
        None => Ok(f()),
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| DeltaXError::WorkerPool(e.to_string()))?;
            Ok(pool.install(f))
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub fn with_threads<R, F>(_threads: Option<usize>, f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    Ok(f())
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Phase 1: count chunks per file, merge in corpus order, keep repeats.
pub fn build_pattern_table(files: &[SourceFile], mode: &ChunkMode) -> PatternTable {
    let tallies = map_each(files, |f| ChunkTally::from_file(&f.data, mode));

    let mut builder = PatternTableBuilder::new();
    for tally in tallies {
        builder.merge(tally);
    }
    debug!(
        "tallied {} chunks ({} distinct) across {} files",
        builder.total_chunks(),
        builder.distinct_chunks(),
        builder.files_merged()
    );

    let table = builder.finish();
    debug!(
        "pattern table: {} patterns, {} bytes",
        table.len(),
        table.total_bytes()
    );
    table
}

/// Phase 2: encode every file against the frozen pattern table.
pub fn encode_files(files: &[SourceFile], patterns: &PatternTable) -> Vec<FileRecord> {
    let matcher = PatternMatcher::new(patterns);
    map_each(files, |f| {
        let segments = matcher.encode(&f.data);
        debug!("{}: {} segments", f.path, segments.len());
        FileRecord {
            path: f.path.clone(),
            original_size: f.data.len() as u64,
            segments,
        }
    })
}

/// Build the full archive model for a corpus.
pub fn encode_corpus(corpus: &Corpus, opts: &EncodeOptions) -> Result<Archive> {
    info!(
        "encoding {} files, {} empty directories, mode {}",
        corpus.files.len(),
        corpus.empty_dirs.len(),
        opts.mode
    );
    with_threads(opts.threads, || {
        let patterns = build_pattern_table(&corpus.files, &opts.mode);
        let files = encode_files(&corpus.files, &patterns);
        Archive {
            header: Header::default(),
            patterns,
            files: FileTable {
                files,
                empty_dirs: corpus.empty_dirs.clone(),
            },
        }
    })
}

/// Encode and serialize in one step.
pub fn encode(corpus: &Corpus, opts: &EncodeOptions) -> Result<Vec<u8>> {
    encode_corpus(corpus, opts)?.pack(&GzipCodec::new(opts.level))
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Replay one record's segments against the pattern table.
///
/// The expanded length is checked against `original_size` before any
/// output buffer is allocated.
pub fn reconstruct_file(record: &FileRecord, patterns: &PatternTable) -> Result<Vec<u8>> {
    let mut expected: u64 = 0;
    for segment in &record.segments {
        expected = expected.saturating_add(segment.expanded_len(patterns)? as u64);
    }
    if expected != record.original_size {
        return Err(DeltaXError::SizeMismatch {
            path: record.path.clone(),
            expected: record.original_size,
            actual: expected,
        });
    }

    let mut out = Vec::with_capacity(expected as usize);
    for segment in &record.segments {
        match segment {
            Segment::Literal(bytes) => out.extend_from_slice(bytes),
            Segment::Reference(index) => out.extend_from_slice(patterns.resolve(*index)?),
        }
    }
    Ok(out)
}

/// A fully reconstructed archive, ready to be written out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTree {
    pub header: Header,
    pub files: Vec<SourceFile>,
    pub empty_dirs: Vec<String>,
}

impl DecodedTree {
    pub fn output_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.data.len() as u64).sum()
    }
}

/// Reconstruct every file of an unpacked archive. Fails on the first
/// inconsistent record.
pub fn reconstruct_archive(archive: &Archive) -> Result<DecodedTree> {
    let files = try_map_each(&archive.files.files, |record| {
        Ok(SourceFile {
            path: record.path.clone(),
            data: reconstruct_file(record, &archive.patterns)?,
        })
    })?;
    Ok(DecodedTree {
        header: archive.header,
        files,
        empty_dirs: archive.files.empty_dirs.clone(),
    })
}

/// Unpack and reconstruct an archive buffer.
pub fn decode(bytes: &[u8]) -> Result<DecodedTree> {
    let archive = Archive::unpack(bytes)?;
    debug!(
        "unpacked {} patterns, {} files, {} empty directories",
        archive.patterns.len(),
        archive.files.files.len(),
        archive.files.empty_dirs.len()
    );
    reconstruct_archive(&archive)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
