// Uncompressed table encodings.
//
// Pattern table:
//   varint(pattern_count) | { varint(len) | bytes }*
//
// File table:
//   varint(file_count) | FileRecord* | [ "DIR" | { varint(len) | utf8 }* ]
//
// FileRecord:
//   varint(len(path)) | path | varint(original_size) | varint(segment_count) | Segment*
//
// Segment:
//   0x01 | varint(len) | bytes        (literal)
//   0x00 | varint(pattern_index)      (reference)
//
// The "DIR" trailer is present only when at least one empty directory is
// recorded and runs to the end of the table.

use crate::error::{DeltaXError, Result, Section};

use super::reader::ByteReader;
use super::varint;

/// Marker introducing the empty-directory list.
pub const DIR_MARKER: &[u8; 3] = b"DIR";

const TAG_REFERENCE: u8 = 0;
const TAG_LITERAL: u8 = 1;

// ---------------------------------------------------------------------------
// Pattern table
// ---------------------------------------------------------------------------

/// Ordered table of shared byte patterns. A pattern's index is its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternTable {
    patterns: Vec<Vec<u8>>,
}

impl PatternTable {
    pub fn new(patterns: Vec<Vec<u8>>) -> Self {
        Self { patterns }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.patterns.get(index).map(Vec::as_slice)
    }

    /// Look up a pattern for reconstruction, failing on an out-of-range index.
    pub fn resolve(&self, index: usize) -> Result<&[u8]> {
        self.get(index).ok_or(DeltaXError::DanglingPatternIndex {
            index,
            table_len: self.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.patterns.iter().map(Vec::as_slice)
    }

    /// Sum of all pattern lengths.
    pub fn total_bytes(&self) -> usize {
        self.patterns.iter().map(Vec::len).sum()
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        varint::encode_usize(self.patterns.len(), out);
        for pattern in &self.patterns {
            varint::encode_usize(pattern.len(), out);
            out.extend_from_slice(pattern);
        }
    }

    /// Decode a complete, decompressed pattern table.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(buf);
        let count = r.read_varint_usize()?;
        let mut patterns = Vec::with_capacity(r.capacity_hint(count));
        for _ in 0..count {
            patterns.push(r.read_prefixed()?.to_vec());
        }
        if !r.is_empty() {
            return Err(DeltaXError::TrailingBytes {
                section: Section::PatternTable,
                len: r.remaining(),
            });
        }
        Ok(Self { patterns })
    }
}

// ---------------------------------------------------------------------------
// Segments and file records
// ---------------------------------------------------------------------------

/// One unit of a file's encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Raw bytes copied verbatim.
    Literal(Vec<u8>),
    /// Index into the pattern table; the implied length is the pattern's length.
    Reference(usize),
}

impl Segment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Number of output bytes this segment expands to.
    pub fn expanded_len(&self, patterns: &PatternTable) -> Result<usize> {
        match self {
            Self::Literal(bytes) => Ok(bytes.len()),
            Self::Reference(index) => Ok(patterns.resolve(*index)?.len()),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Literal(bytes) => {
                out.push(TAG_LITERAL);
                varint::encode_usize(bytes.len(), out);
                out.extend_from_slice(bytes);
            }
            Self::Reference(index) => {
                out.push(TAG_REFERENCE);
                varint::encode_usize(*index, out);
            }
        }
    }

    pub fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let offset = r.position();
        match r.read_u8()? {
            TAG_LITERAL => Ok(Self::Literal(r.read_prefixed()?.to_vec())),
            TAG_REFERENCE => Ok(Self::Reference(r.read_varint_usize()?)),
            tag => Err(DeltaXError::InvalidSegmentTag { tag, offset }),
        }
    }
}

/// Encoding of one file: its path, full size and ordered segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Relative path with `/` separators.
    pub path: String,
    pub original_size: u64,
    pub segments: Vec<Segment>,
}

impl FileRecord {
    pub fn reference_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_literal()).count()
    }

    pub fn literal_bytes(&self) -> usize {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(bytes) => bytes.len(),
                Segment::Reference(_) => 0,
            })
            .sum()
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        varint::encode_usize(self.path.len(), out);
        out.extend_from_slice(self.path.as_bytes());
        varint::encode_into(self.original_size, out);
        varint::encode_usize(self.segments.len(), out);
        for segment in &self.segments {
            segment.encode(out);
        }
    }

    pub fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let path = r.read_prefixed_str()?.to_owned();
        let original_size = r.read_varint()?;
        let count = r.read_varint_usize()?;
        let mut segments = Vec::with_capacity(r.capacity_hint(count));
        for _ in 0..count {
            segments.push(Segment::decode(r)?);
        }
        Ok(Self {
            path,
            original_size,
            segments,
        })
    }
}

// ---------------------------------------------------------------------------
// File table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTable {
    pub files: Vec<FileRecord>,
    /// Relative paths of directories that had no entries at scan time.
    pub empty_dirs: Vec<String>,
}

impl FileTable {
    pub fn encode(&self, out: &mut Vec<u8>) {
        varint::encode_usize(self.files.len(), out);
        for file in &self.files {
            file.encode(out);
        }
        if !self.empty_dirs.is_empty() {
            out.extend_from_slice(DIR_MARKER);
            for dir in &self.empty_dirs {
                varint::encode_usize(dir.len(), out);
                out.extend_from_slice(dir.as_bytes());
            }
        }
    }

    /// Decode a complete, decompressed file table.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(buf);
        let count = r.read_varint_usize()?;
        let mut files = Vec::with_capacity(r.capacity_hint(count));
        for _ in 0..count {
            files.push(FileRecord::decode(&mut r)?);
        }

        let mut empty_dirs = Vec::new();
        if !r.is_empty() {
            if !r.starts_with(DIR_MARKER) {
                return Err(DeltaXError::TrailingBytes {
                    section: Section::FileTable,
                    len: r.remaining(),
                });
            }
            r.read_bytes(DIR_MARKER.len())?;
            while !r.is_empty() {
                empty_dirs.push(r.read_prefixed_str()?.to_owned());
            }
        }

        Ok(Self { files, empty_dirs })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> FileTable {
        FileTable {
            files: vec![
                FileRecord {
                    path: "a.txt".into(),
                    original_size: 17,
                    segments: vec![
                        Segment::Reference(0),
                        Segment::Literal(b"world hello".to_vec()),
                    ],
                },
                FileRecord {
                    path: "empty.bin".into(),
                    original_size: 0,
                    segments: vec![],
                },
            ],
            empty_dirs: vec!["empty".into(), "nested/void".into()],
        }
    }

    #[test]
    fn pattern_table_layout() {
        let table = PatternTable::new(vec![b"hello ".to_vec(), b"x".to_vec()]);
        let mut buf = Vec::new();
        table.encode(&mut buf);
        assert_eq!(
            buf,
            [&[0x02, 0x06][..], b"hello ", &[0x01], b"x"].concat()
        );
        assert_eq!(PatternTable::decode(&buf).unwrap(), table);
        assert_eq!(table.total_bytes(), 7);
    }

    #[test]
    fn empty_pattern_table() {
        let mut buf = Vec::new();
        PatternTable::default().encode(&mut buf);
        assert_eq!(buf, [0x00]);
        assert!(PatternTable::decode(&buf).unwrap().is_empty());
    }

    #[test]
    fn pattern_table_trailing_bytes() {
        let buf = [0x00, 0x42];
        assert!(matches!(
            PatternTable::decode(&buf),
            Err(DeltaXError::TrailingBytes {
                section: Section::PatternTable,
                len: 1
            })
        ));
    }

    #[test]
    fn segment_layout() {
        let mut buf = Vec::new();
        Segment::Literal(b"ab".to_vec()).encode(&mut buf);
        Segment::Reference(300).encode(&mut buf);
        assert_eq!(buf, [0x01, 0x02, b'a', b'b', 0x00, 0xAC, 0x02]);

        let mut r = ByteReader::new(&buf);
        assert_eq!(
            Segment::decode(&mut r).unwrap(),
            Segment::Literal(b"ab".to_vec())
        );
        assert_eq!(Segment::decode(&mut r).unwrap(), Segment::Reference(300));
    }

    #[test]
    fn bad_segment_tag() {
        let buf = [0x07, 0x00];
        assert!(matches!(
            Segment::decode(&mut ByteReader::new(&buf)),
            Err(DeltaXError::InvalidSegmentTag { tag: 7, offset: 0 })
        ));
    }

    #[test]
    fn file_table_roundtrip_with_dirs() {
        let table = sample_table();
        let mut buf = Vec::new();
        table.encode(&mut buf);
        assert_eq!(FileTable::decode(&buf).unwrap(), table);
    }

    #[test]
    fn dir_marker_only_when_dirs_present() {
        let mut table = sample_table();
        table.empty_dirs.clear();
        let mut buf = Vec::new();
        table.encode(&mut buf);
        assert!(!buf.windows(3).any(|w| w == DIR_MARKER));
        assert_eq!(FileTable::decode(&buf).unwrap(), table);
    }

    #[test]
    fn dirs_without_files() {
        let table = FileTable {
            files: vec![],
            empty_dirs: vec!["empty".into()],
        };
        let mut buf = Vec::new();
        table.encode(&mut buf);
        assert_eq!(buf, [&[0x00][..], b"DIR", &[0x05], b"empty"].concat());
        assert_eq!(FileTable::decode(&buf).unwrap(), table);
    }

    #[test]
    fn junk_after_records_rejected() {
        let buf = [0x00, b'X', b'Y', b'Z'];
        assert!(matches!(
            FileTable::decode(&buf),
            Err(DeltaXError::TrailingBytes {
                section: Section::FileTable,
                len: 3
            })
        ));
    }

    #[test]
    fn truncated_record() {
        let mut buf = Vec::new();
        sample_table().encode(&mut buf);
        buf.truncate(9);
        assert!(FileTable::decode(&buf).is_err());
    }

    #[test]
    fn hostile_count_does_not_allocate() {
        // Claims 2^40 files but carries no data.
        let mut buf = Vec::new();
        varint::encode_into(1 << 40, &mut buf);
        assert!(matches!(
            FileTable::decode(&buf),
            Err(DeltaXError::TruncatedVarint { .. })
        ));
    }

    #[test]
    fn record_counters() {
        let table = sample_table();
        assert_eq!(table.files[0].reference_count(), 1);
        assert_eq!(table.files[0].literal_bytes(), 11);
    }

    #[test]
    fn resolve_out_of_range() {
        let table = PatternTable::new(vec![b"x".to_vec()]);
        assert!(matches!(
            table.resolve(1),
            Err(DeltaXError::DanglingPatternIndex {
                index: 1,
                table_len: 1
            })
        ));
        assert!(matches!(
            Segment::Reference(5).expanded_len(&table),
            Err(DeltaXError::DanglingPatternIndex { .. })
        ));
    }
}
