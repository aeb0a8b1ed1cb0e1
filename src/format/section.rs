// Length-prefixed compressed blocks.
//
// Each table is serialized on its own, compressed on its own with gzip
// (deflate + gzip framing, the same container `gzip(1)` produces) and
// written as:
//
//   varint(len(compressed)) | compressed
//
// Blocks are self-describing, so a reader can skip one without touching
// its siblings. A block may hold several concatenated gzip members; every
// byte of it must belong to one.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::error::{DeltaXError, Result, Section};

use super::reader::ByteReader;
use super::varint;

/// Default gzip level. Matches `gzip.compress()` without an explicit level.
pub const DEFAULT_LEVEL: u32 = 9;

// ---------------------------------------------------------------------------
// Gzip codec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: Compression,
}

impl GzipCodec {
    /// Create a codec with the given compression level (0-9, clamped).
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    pub fn level(&self) -> u32 {
        self.level.level()
    }

    pub fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }

    pub fn decompress(&self, data: &[u8], section: Section) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(DeltaXError::DecompressionFailure {
                section,
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "empty compressed block"),
            });
        }
        let mut decoder = MultiGzDecoder::new(data);
        let mut output = Vec::new();
        decoder
            .read_to_end(&mut output)
            .map_err(|source| DeltaXError::DecompressionFailure { section, source })?;
        Ok(output)
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

// ---------------------------------------------------------------------------
// Block framing
// ---------------------------------------------------------------------------

/// Compress `raw` and append it to `out` as a length-prefixed block.
/// Returns the compressed payload length (without the prefix).
pub fn write_block(codec: &GzipCodec, raw: &[u8], out: &mut Vec<u8>) -> io::Result<usize> {
    let compressed = codec.compress(raw)?;
    varint::encode_usize(compressed.len(), out);
    out.extend_from_slice(&compressed);
    Ok(compressed.len())
}

/// Read one length-prefixed block and inflate it.
pub fn read_block(r: &mut ByteReader<'_>, section: Section) -> Result<Vec<u8>> {
    let compressed = r.read_prefixed()?;
    GzipCodec::default().decompress(compressed, section)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_roundtrip() {
        let codec = GzipCodec::default();
        let data: Vec<u8> = b"Hello, world! This is test data. "
            .iter()
            .copied()
            .cycle()
            .take(1024)
            .collect();
        let compressed = codec.compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        // gzip member magic
        assert_eq!(&compressed[..2], &[0x1F, 0x8B]);
        let decompressed = codec.decompress(&compressed, Section::FileTable).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn empty_payload_roundtrip() {
        let mut out = Vec::new();
        let len = write_block(&GzipCodec::default(), &[], &mut out).unwrap();
        assert!(len > 0, "an empty table still produces a gzip member");
        let mut r = ByteReader::new(&out);
        assert!(read_block(&mut r, Section::PatternTable).unwrap().is_empty());
        assert!(r.is_empty());
    }

    #[test]
    fn block_is_length_prefixed() {
        let mut out = Vec::new();
        let len = write_block(&GzipCodec::new(1), b"abcabcabc", &mut out).unwrap();
        let (prefix, next) = varint::decode(&out, 0).unwrap();
        assert_eq!(prefix as usize, len);
        assert_eq!(out.len(), next + len);
    }

    #[test]
    fn garbage_block_fails_to_inflate() {
        let mut out = Vec::new();
        varint::encode_into(4, &mut out);
        out.extend_from_slice(b"nope");
        let err = read_block(&mut ByteReader::new(&out), Section::PatternTable).unwrap_err();
        assert!(matches!(
            err,
            DeltaXError::DecompressionFailure {
                section: Section::PatternTable,
                ..
            }
        ));
    }

    #[test]
    fn junk_after_member_fails_to_inflate() {
        let codec = GzipCodec::default();
        let mut payload = codec.compress(b"pattern bytes").unwrap();
        payload.extend_from_slice(b"GARBAGE-NOT-GZIP");
        let mut out = Vec::new();
        varint::encode_usize(payload.len(), &mut out);
        out.extend_from_slice(&payload);
        assert!(matches!(
            read_block(&mut ByteReader::new(&out), Section::FileTable),
            Err(DeltaXError::DecompressionFailure {
                section: Section::FileTable,
                ..
            })
        ));
    }

    #[test]
    fn concatenated_members_are_all_read() {
        let codec = GzipCodec::new(6);
        let mut payload = codec.compress(b"first ").unwrap();
        payload.extend_from_slice(&codec.compress(b"second").unwrap());
        assert_eq!(
            codec.decompress(&payload, Section::PatternTable).unwrap(),
            b"first second"
        );
    }

    #[test]
    fn zero_length_block_rejected() {
        let out = [0x00];
        assert!(matches!(
            read_block(&mut ByteReader::new(&out), Section::FileTable),
            Err(DeltaXError::DecompressionFailure { .. })
        ));
    }

    #[test]
    fn level_is_clamped() {
        assert_eq!(GzipCodec::new(42).level(), 9);
        assert_eq!(GzipCodec::new(0).level(), 0);
    }
}
