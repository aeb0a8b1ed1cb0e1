// Crate-wide error type.
//
// Every decode-side kind is fatal: the archive is rejected as a whole and
// nothing is written to the destination. Encode-side failures come only from
// the scan collaborator (unreadable input) or from the environment.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which compressed block of the archive an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    PatternTable,
    FileTable,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::PatternTable => write!(f, "pattern table"),
            Self::FileTable => write!(f, "file table"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeltaXError {
    #[error("invalid magic {found:#06X}: not a DeltaX archive")]
    InvalidMagic { found: u16 },

    #[error("unsupported archive version {found}")]
    UnsupportedVersion { found: u16 },

    #[error("truncated varint at offset {offset}")]
    TruncatedVarint { offset: usize },

    #[error("varint at offset {offset} exceeds 64 bits")]
    VarintOverflow { offset: usize },

    #[error("truncated buffer: need {needed} bytes at offset {offset}, {available} available")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("{section} block does not inflate: {source}")]
    DecompressionFailure {
        section: Section,
        #[source]
        source: io::Error,
    },

    #[error("reference to pattern {index} but the table holds {table_len} patterns")]
    DanglingPatternIndex { index: usize, table_len: usize },

    #[error("invalid segment flag {tag:#04X} at offset {offset}")]
    InvalidSegmentTag { tag: u8, offset: usize },

    #[error("path at offset {offset} is not valid UTF-8")]
    InvalidPath { offset: usize },

    #[error("{len} unexpected trailing bytes after {section}")]
    TrailingBytes { section: Section, len: usize },

    #[error("{path}: reconstructed {actual} bytes, archive records {expected}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("refusing to extract unsafe path: {0}")]
    UnsafePath(String),

    #[error("path recorded more than once: {0}")]
    DuplicatePath(String),

    #[error("chunk size must be a positive integer")]
    InvalidChunkSize,

    #[error("{}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DeltaXError>;

impl DeltaXError {
    /// True for the kinds that mean the archive bytes themselves are bad.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic { .. }
                | Self::UnsupportedVersion { .. }
                | Self::TruncatedVarint { .. }
                | Self::VarintOverflow { .. }
                | Self::TruncatedBuffer { .. }
                | Self::DecompressionFailure { .. }
                | Self::DanglingPatternIndex { .. }
                | Self::InvalidSegmentTag { .. }
                | Self::InvalidPath { .. }
                | Self::TrailingBytes { .. }
                | Self::SizeMismatch { .. }
                | Self::DuplicatePath(_)
        )
    }
}
