// Whole-archive pack/unpack.
//
//   Header (8 bytes) | PatternBlock | FileBlock
//
// Both blocks are `varint(len) | gzip(table)`. Unpack consumes the buffer
// completely; anything after the file block is corruption.

use crate::error::{DeltaXError, Result, Section};

use super::header::Header;
use super::reader::ByteReader;
use super::section::{self, GzipCodec};
use super::tables::{FileTable, PatternTable};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    pub header: Header,
    pub patterns: PatternTable,
    pub files: FileTable,
}

/// Byte accounting of a packed archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackedSizes {
    pub pattern_raw: usize,
    pub pattern_compressed: usize,
    pub file_raw: usize,
    pub file_compressed: usize,
    pub total: usize,
}

impl Archive {
    pub fn new(patterns: PatternTable, files: FileTable) -> Self {
        Self {
            header: Header::default(),
            patterns,
            files,
        }
    }

    /// Serialize the archive with the given gzip codec.
    pub fn pack(&self, codec: &GzipCodec) -> Result<Vec<u8>> {
        Ok(self.pack_with_sizes(codec)?.0)
    }

    pub fn pack_with_sizes(&self, codec: &GzipCodec) -> Result<(Vec<u8>, PackedSizes)> {
        let mut pattern_raw = Vec::new();
        self.patterns.encode(&mut pattern_raw);
        let mut file_raw = Vec::new();
        self.files.encode(&mut file_raw);

        let mut out = Vec::with_capacity(16 + (pattern_raw.len() + file_raw.len()) / 2);
        self.header.encode(&mut out);
        let pattern_compressed = section::write_block(codec, &pattern_raw, &mut out)?;
        let file_compressed = section::write_block(codec, &file_raw, &mut out)?;

        let sizes = PackedSizes {
            pattern_raw: pattern_raw.len(),
            pattern_compressed,
            file_raw: file_raw.len(),
            file_compressed,
            total: out.len(),
        };
        Ok((out, sizes))
    }

    /// Parse and validate a complete archive buffer.
    pub fn unpack(buf: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(buf);
        let header = Header::decode(&mut r)?;

        let pattern_raw = section::read_block(&mut r, Section::PatternTable)?;
        let patterns = PatternTable::decode(&pattern_raw)?;

        let file_raw = section::read_block(&mut r, Section::FileTable)?;
        let files = FileTable::decode(&file_raw)?;

        if !r.is_empty() {
            return Err(DeltaXError::TrailingBytes {
                section: Section::FileTable,
                len: r.remaining(),
            });
        }

        Ok(Self {
            header,
            patterns,
            files,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
