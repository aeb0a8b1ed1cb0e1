// DeltaX on-disk format.
//
// # Modules
//
// - `varint`  - Variable-length integer encoding (base-128, little-endian groups)
// - `reader`  - Bounds-checked cursor used by every unpack routine
// - `header`  - Fixed 8-byte archive header and reserved flags
// - `section` - Length-prefixed gzip blocks
// - `tables`  - Pattern table, segments, file records, file table
// - `archive` - Whole-archive pack/unpack

pub mod archive;
pub mod header;
pub mod reader;
pub mod section;
pub mod tables;
pub mod varint;

// Re-export key types for convenience.
pub use archive::{Archive, PackedSizes};
pub use header::{ArchiveFlags, DX_MAGIC, DX_VERSION, HEADER_LEN, Header};
pub use reader::ByteReader;
pub use section::{DEFAULT_LEVEL, GzipCodec};
pub use tables::{DIR_MARKER, FileRecord, FileTable, PatternTable, Segment};
