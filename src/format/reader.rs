// Bounds-checked cursor over an in-memory buffer.
//
// All unpack routines read through this so that every length prefix is
// validated against the bytes actually present before slicing.

use crate::error::{DeltaXError, Result};

use super::varint;

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the buffer.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.rest().starts_with(prefix)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Borrow the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(DeltaXError::TruncatedBuffer {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let (val, next) = varint::decode(self.buf, self.pos)?;
        self.pos = next;
        Ok(val)
    }

    pub fn read_varint_usize(&mut self) -> Result<usize> {
        let (val, next) = varint::decode_usize(self.buf, self.pos)?;
        self.pos = next;
        Ok(val)
    }

    /// Read a `varint(len) | bytes` field.
    pub fn read_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_varint_usize()?;
        self.read_bytes(len)
    }

    /// Read a `varint(len) | utf8` field.
    pub fn read_prefixed_str(&mut self) -> Result<&'a str> {
        let len = self.read_varint_usize()?;
        let offset = self.pos;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| DeltaXError::InvalidPath { offset })
    }

    /// Capacity hint for a count read from the wire: never more than one
    /// element per remaining byte, so a hostile count cannot force a huge
    /// allocation before the data runs out.
    pub fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fixed_width_big_endian() {
        let data = [0x44, 0x58, 0x00, 0x01, 0xDE, 0xAD, 0xBE, 0xEF];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u16_be().unwrap(), 0x4458);
        assert_eq!(r.read_u16_be().unwrap(), 1);
        assert_eq!(r.read_u32_be().unwrap(), 0xDEAD_BEEF);
        assert!(r.is_empty());
    }

    #[test]
    fn prefixed_fields() {
        let data = [0x03, b'a', b'b', b'c', 0x02, 0xC3, 0xA9];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_prefixed().unwrap(), b"abc");
        assert_eq!(r.read_prefixed_str().unwrap(), "é");
        assert_eq!(r.position(), data.len());
    }

    #[test]
    fn overlong_length_is_truncated_buffer() {
        let data = [0x05, b'a', b'b'];
        let mut r = ByteReader::new(&data);
        match r.read_prefixed() {
            Err(DeltaXError::TruncatedBuffer {
                offset,
                needed,
                available,
            }) => {
                assert_eq!(offset, 1);
                assert_eq!(needed, 5);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_path() {
        let data = [0x02, 0xFF, 0xFE];
        let mut r = ByteReader::new(&data);
        assert!(matches!(
            r.read_prefixed_str(),
            Err(DeltaXError::InvalidPath { offset: 1 })
        ));
    }

    #[test]
    fn capacity_hint_is_bounded() {
        let data = [0u8; 4];
        let r = ByteReader::new(&data);
        assert_eq!(r.capacity_hint(1 << 40), 4);
        assert_eq!(r.capacity_hint(2), 2);
    }
}
