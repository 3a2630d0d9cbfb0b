//! LEB128 varints with zig-zag mapping for signed values.
//!
//! Seven data bits per byte, low group first, high bit set on every byte but
//! the last. Signed values are zig-zag mapped first so that small negative
//! deltas stay short: 0 → 0, -1 → 1, 1 → 2, -2 → 3.

use crate::error::{Result, TsFileError};
use bytes::{Buf, BufMut};

/// Longest possible encoding of a u64.
pub const MAX_VARINT_LEN: usize = 10;

/// Encodes a signed integer as a zig-zag varint.
pub fn encode_varint(buf: &mut impl BufMut, value: i64) {
    encode_varint_u64(buf, zigzag(value));
}

/// Encodes an unsigned integer as a varint.
pub fn encode_varint_u64(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80;
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Decodes a zig-zag varint.
pub fn decode_varint(buf: &mut impl Buf) -> Result<i64> {
    decode_varint_u64(buf).map(unzigzag)
}

/// Decodes an unsigned varint.
///
/// # Errors
///
/// Returns `TsFileError::Corrupted` if the input ends mid-varint or the
/// varint is longer than ten bytes.
pub fn decode_varint_u64(buf: &mut impl Buf) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0;

    loop {
        if !buf.has_remaining() {
            return Err(TsFileError::Corrupted("truncated varint".into()));
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok(value);
        }

        shift += 7;
        if shift >= 64 {
            return Err(TsFileError::Corrupted("varint too long".into()));
        }
    }
}

/// Number of bytes `value` occupies as an unsigned varint.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
