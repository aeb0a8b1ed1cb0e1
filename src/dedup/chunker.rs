// Chunk extraction.
//
// Fixed mode cuts the file into consecutive windows of `size` bytes (the
// last one may be short). Separator mode splits on runs of delimiter bytes,
// where the delimiter set is ASCII whitespace plus every byte of the
// separator, and re-appends the separator to each non-empty token.

use std::borrow::Cow;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::error::DeltaXError;

/// Bytes always treated as delimiters in separator mode.
pub const WHITESPACE: &[u8; 6] = b" \t\n\r\x0B\x0C";

/// Chunking strategy, fixed once per archive-creation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkMode {
    Fixed(NonZeroUsize),
    Separator(Vec<u8>),
}

impl ChunkMode {
    pub fn fixed(size: usize) -> Result<Self, DeltaXError> {
        NonZeroUsize::new(size)
            .map(Self::Fixed)
            .ok_or(DeltaXError::InvalidChunkSize)
    }

    pub fn separator(sep: impl Into<Vec<u8>>) -> Self {
        Self::Separator(sep.into())
    }
}

impl Default for ChunkMode {
    fn default() -> Self {
        Self::Separator(b" ".to_vec())
    }
}

/// An argument that parses as an integer selects fixed mode; anything else
/// is a separator.
impl FromStr for ChunkMode {
    type Err = DeltaXError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<i128>() {
            Ok(n) => usize::try_from(n)
                .map_err(|_| DeltaXError::InvalidChunkSize)
                .and_then(Self::fixed),
            Err(_) => Ok(Self::Separator(s.as_bytes().to_vec())),
        }
    }
}

impl fmt::Display for ChunkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(size) => write!(f, "fixed:{size}"),
            Self::Separator(sep) => write!(f, "separator:{:?}", String::from_utf8_lossy(sep)),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Delimiter membership table for separator mode.
#[derive(Clone)]
struct DelimiterSet([bool; 256]);

impl DelimiterSet {
    fn new(sep: &[u8]) -> Self {
        let mut set = [false; 256];
        for &b in WHITESPACE.iter().chain(sep) {
            set[b as usize] = true;
        }
        Self(set)
    }

    #[inline]
    fn contains(&self, b: u8) -> bool {
        self.0[b as usize]
    }
}

/// Produce the ordered chunk sequence of one file, duplicates included.
///
/// Fixed-mode chunks borrow from `data`; separator-mode chunks are owned
/// unless the separator is empty.
pub fn extract_chunks<'a>(data: &'a [u8], mode: &ChunkMode) -> Vec<Cow<'a, [u8]>> {
    match mode {
        ChunkMode::Fixed(size) => data.chunks(size.get()).map(Cow::Borrowed).collect(),
        ChunkMode::Separator(sep) => {
            let delims = DelimiterSet::new(sep);
            data.split(|&b| delims.contains(b))
                .filter(|token| !token.is_empty())
                .map(|token| {
                    if sep.is_empty() {
                        Cow::Borrowed(token)
                    } else {
                        let mut chunk = Vec::with_capacity(token.len() + sep.len());
                        chunk.extend_from_slice(token);
                        chunk.extend_from_slice(sep);
                        Cow::Owned(chunk)
                    }
                })
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
