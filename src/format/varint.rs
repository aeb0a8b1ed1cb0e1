// DeltaX variable-length integer encoding.
//
// Base-128, little-endian: least-significant 7-bit group first.
// Each byte has bit 7 set except the final byte. Zero encodes as a single
// 0x00 byte. Values are carried as u64; anything wider is rejected.

use crate::error::{DeltaXError, Result};

/// Maximum encoded length for a 64-bit value (ceil(64/7) = 10).
pub const MAX_VARINT_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Append the encoding of `num` to `out`. Returns the number of bytes written (1..=10).
#[inline]
pub fn encode_into(mut num: u64, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    while num >= 0x80 {
        out.push((num as u8 & 0x7F) | 0x80);
        num >>= 7;
    }
    out.push(num as u8);
    out.len() - start
}

/// Encode `num` into a fresh buffer.
pub fn encode(num: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(num));
    encode_into(num, &mut out);
    out
}

/// Encode a `usize` length or index.
#[inline]
pub fn encode_usize(num: usize, out: &mut Vec<u8>) -> usize {
    encode_into(num as u64, out)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a varint starting at `offset`.
///
/// Returns `(value, new_offset)` where `new_offset` points just past the
/// terminating byte. Fails with `TruncatedVarint` if the buffer ends before a
/// byte without the continuation bit, and with `VarintOverflow` if the value
/// does not fit in 64 bits. Redundant zero groups are tolerated.
pub fn decode(buf: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    let mut pos = offset;
    loop {
        let Some(&byte) = buf.get(pos) else {
            return Err(DeltaXError::TruncatedVarint { offset });
        };
        pos += 1;
        let group = u64::from(byte & 0x7F);
        if group != 0 {
            if shift >= 64 || (group << shift) >> shift != group {
                return Err(DeltaXError::VarintOverflow { offset });
            }
            value |= group << shift;
        }
        if byte & 0x80 == 0 {
            return Ok((value, pos));
        }
        shift = shift.saturating_add(7);
    }
}

/// Decode a varint that must fit in `usize` (lengths, counts, indices).
pub fn decode_usize(buf: &[u8], offset: usize) -> Result<(usize, usize)> {
    let (val, next) = decode(buf, offset)?;
    let val = usize::try_from(val).map_err(|_| DeltaXError::VarintOverflow { offset })?;
    Ok((val, next))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Return the encoded byte-length of a `u64` value.
#[inline]
pub fn encoded_len(num: u64) -> usize {
    let bits = 64 - num.leading_zeros();
    (bits.max(1).div_ceil(7) as usize).min(MAX_VARINT_LEN)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_u64() {
        let cases: &[u64] = &[
            0,
            1,
            127,
            128,
            255,
            256,
            16383,
            16384,
            u32::MAX as u64,
            u64::MAX - 1,
            u64::MAX,
        ];
        for &val in cases {
            let bytes = encode(val);
            let (decoded, next) = decode(&bytes, 0).unwrap();
            assert_eq!(decoded, val, "roundtrip failed for {val}");
            assert_eq!(next, bytes.len(), "length mismatch for {val}");
            assert_eq!(encoded_len(val), bytes.len(), "encoded_len mismatch for {val}");
        }
    }

    #[test]
    fn zero_is_single_byte() {
        assert_eq!(encode(0), vec![0x00]);
    }

    #[test]
    fn encoding_is_little_endian() {
        // 300 = 0b1_0010_1100: low group 0101100 first with continuation, then 10.
        assert_eq!(encode(300), vec![0xAC, 0x02]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
    }

    #[test]
    fn single_byte_values() {
        for val in 0..=127u64 {
            assert_eq!(encode(val), vec![val as u8]);
        }
    }

    #[test]
    fn decode_at_offset() {
        let mut buf = vec![0xFF, 0xFF];
        encode_into(300, &mut buf);
        buf.push(0x05);
        let (val, next) = decode(&buf, 2).unwrap();
        assert_eq!(val, 300);
        assert_eq!(next, 4);
        assert_eq!(decode(&buf, next).unwrap(), (5, 5));
    }

    #[test]
    fn truncated_detection() {
        let data = [0x80, 0x80, 0x80];
        assert!(matches!(
            decode(&data, 0),
            Err(DeltaXError::TruncatedVarint { offset: 0 })
        ));
        assert!(matches!(
            decode(&[], 0),
            Err(DeltaXError::TruncatedVarint { .. })
        ));
    }

    #[test]
    fn overflow_detection() {
        // Ten continuation groups of 0x7F followed by a terminator: 77 bits.
        let mut data = vec![0xFF; 10];
        data.push(0x01);
        assert!(matches!(
            decode(&data, 0),
            Err(DeltaXError::VarintOverflow { .. })
        ));

        // u64::MAX with the top group set to 2 instead of 1.
        let mut data = encode(u64::MAX);
        *data.last_mut().unwrap() = 0x02;
        assert!(matches!(
            decode(&data, 0),
            Err(DeltaXError::VarintOverflow { .. })
        ));
    }

    #[test]
    fn redundant_zero_groups_tolerated() {
        let data = [0x85, 0x80, 0x80, 0x00];
        assert_eq!(decode(&data, 0).unwrap(), (5, 4));
    }
}
