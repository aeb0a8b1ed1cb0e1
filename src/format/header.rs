// DeltaX fixed archive header.
//
// Layout (8 bytes, big-endian):
//   magic:   u16 = 0x4458 ('DX')
//   version: u16
//   flags:   u32 (reserved, carried through unchanged)

use bitflags::bitflags;

use crate::error::{DeltaXError, Result};

use super::reader::ByteReader;

// ---------------------------------------------------------------------------
// Magic and version
// ---------------------------------------------------------------------------

pub const DX_MAGIC: u16 = 0x4458;
pub const DX_VERSION: u16 = 1;
pub const HEADER_LEN: usize = 8;

bitflags! {
    /// Header flag word. No bits are assigned yet; all 32 are reserved and
    /// must survive an unpack/pack cycle bit-for-bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ArchiveFlags: u32 {
        const _ = !0;
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub flags: ArchiveFlags,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: DX_VERSION,
            flags: ArchiveFlags::empty(),
        }
    }
}

impl Header {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&DX_MAGIC.to_be_bytes());
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.flags.bits().to_be_bytes());
    }

    /// Decode and validate the header.
    ///
    /// Magic is checked before version, so a foreign file always reports
    /// `InvalidMagic` rather than a version mismatch.
    pub fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let magic = r.read_u16_be()?;
        if magic != DX_MAGIC {
            return Err(DeltaXError::InvalidMagic { found: magic });
        }
        let version = r.read_u16_be()?;
        if version != DX_VERSION {
            return Err(DeltaXError::UnsupportedVersion { found: version });
        }
        let flags = ArchiveFlags::from_bits_retain(r.read_u32_be()?);
        Ok(Self { version, flags })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
