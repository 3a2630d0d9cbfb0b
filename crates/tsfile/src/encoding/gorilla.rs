//! Gorilla encoding for timestamps and numeric values.
//!
//! # Timestamp Encoding (Delta-of-Delta)
//!
//! - First value: 64 bits raw
//! - Subsequent values use variable-length encoding based on delta-of-delta:
//!   - `0`: `'0'` (1 bit)
//!   - `[-63, 64]`: `'10'` + 7 bits
//!   - `[-255, 256]`: `'110'` + 9 bits
//!   - `[-2047, 2048]`: `'1110'` + 12 bits
//!   - else: `'1111'` + 64 bits
//!
//! Deltas wrap, so any pair of `i64` timestamps is representable.
//!
//! # Value Encoding (XOR-based)
//!
//! Values are XOR-compressed over their 64-bit pattern. 32-bit types are
//! widened by bit pattern (`u32 as u64`), never numerically.
//! - First value: 64 bits raw
//! - Subsequent values:
//!   - XOR = 0: `'0'` (1 bit)
//!   - Same window: `'10'` + meaningful bits
//!   - New window: `'11'` + 5 bits leading + 6 bits length + meaningful bits
//!
//! Bit streams are MSB-first and zero-padded to a whole byte.

use crate::error::{Result, TsFileError};
use crate::types::{Column, DataType, Encoding};
use bitvec::prelude::*;

type Bits = BitVec<u8, Msb0>;

fn push_bits(output: &mut Bits, value: u64, width: u32) {
    for i in (0..width).rev() {
        output.push((value >> i) & 1 == 1);
    }
}

fn finish(mut bits: Bits, out: &mut Vec<u8>) {
    bits.set_uninitialized(false);
    out.extend_from_slice(&bits.into_vec());
}

/// Encoder for timestamps using delta-of-delta encoding.
#[derive(Debug, Default)]
pub(crate) struct TimestampEncoder {
    started: bool,
    prev_ts: i64,
    prev_delta: i64,
}

impl TimestampEncoder {
    /// Creates a new timestamp encoder.
    pub fn new() -> Self {
        Self::default()
    }

    fn encode(&mut self, timestamp: i64, output: &mut Bits) {
        if !self.started {
            self.started = true;
            self.prev_ts = timestamp;
            self.prev_delta = 0;
            push_bits(output, timestamp as u64, 64);
            return;
        }

        let delta = timestamp.wrapping_sub(self.prev_ts);
        let delta_of_delta = delta.wrapping_sub(self.prev_delta);

        if delta_of_delta == 0 {
            output.push(false);
        } else if (-63..=64).contains(&delta_of_delta) {
            push_bits(output, 0b10, 2);
            push_bits(output, (delta_of_delta + 63) as u64, 7);
        } else if (-255..=256).contains(&delta_of_delta) {
            push_bits(output, 0b110, 3);
            push_bits(output, (delta_of_delta + 255) as u64, 9);
        } else if (-2047..=2048).contains(&delta_of_delta) {
            push_bits(output, 0b1110, 4);
            push_bits(output, (delta_of_delta + 2047) as u64, 12);
        } else {
            push_bits(output, 0b1111, 4);
            push_bits(output, delta_of_delta as u64, 64);
        }

        self.prev_delta = delta;
        self.prev_ts = timestamp;
    }
}

/// Encoder for 64-bit value patterns using XOR compression.
#[derive(Debug, Default)]
pub(crate) struct ValueEncoder {
    started: bool,
    has_window: bool,
    prev_value: u64,
    prev_leading: u32,
    prev_trailing: u32,
}

impl ValueEncoder {
    /// Creates a new value encoder.
    pub fn new() -> Self {
        Self::default()
    }

    fn encode(&mut self, bits: u64, output: &mut Bits) {
        if !self.started {
            self.started = true;
            self.prev_value = bits;
            push_bits(output, bits, 64);
            return;
        }

        let xor = bits ^ self.prev_value;
        self.prev_value = bits;

        if xor == 0 {
            output.push(false);
            return;
        }

        let leading = xor.leading_zeros().min(31);
        let trailing = xor.trailing_zeros();

        if self.has_window && leading >= self.prev_leading && trailing >= self.prev_trailing {
            push_bits(output, 0b10, 2);
            let meaningful_bits = 64 - self.prev_leading - self.prev_trailing;
            push_bits(output, xor >> self.prev_trailing, meaningful_bits);
        } else {
            push_bits(output, 0b11, 2);
            let meaningful_bits = 64 - leading - trailing;
            push_bits(output, leading as u64, 5);
            // 1..=64 stored as 0..=63
            push_bits(output, (meaningful_bits - 1) as u64, 6);
            push_bits(output, xor >> trailing, meaningful_bits);

            self.has_window = true;
            self.prev_leading = leading;
            self.prev_trailing = trailing;
        }
    }
}

struct BitReader<'a> {
    data: &'a BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            data: BitSlice::from_slice(bytes),
            pos: 0,
        }
    }

    fn read_bit(&mut self) -> Result<bool> {
        let bit = self
            .data
            .get(self.pos)
            .map(|b| *b)
            .ok_or_else(|| TsFileError::Corrupted("gorilla stream ended early".into()))?;
        self.pos += 1;
        Ok(bit)
    }

    fn read_bits(&mut self, width: u32) -> Result<u64> {
        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value)
    }

    /// Bytes consumed so far, including padding of the current byte.
    fn consumed_bytes(&self) -> usize {
        self.pos.div_ceil(8)
    }
}

/// Encodes timestamps into a padded bit stream.
pub(crate) fn encode_times(timestamps: &[i64], out: &mut Vec<u8>) {
    let mut bits = Bits::new();
    let mut encoder = TimestampEncoder::new();
    for &ts in timestamps {
        encoder.encode(ts, &mut bits);
    }
    finish(bits, out);
}

/// Decodes `count` timestamps and advances `buf` past the padded stream.
pub(crate) fn decode_times(buf: &mut &[u8], count: usize) -> Result<Vec<i64>> {
    let data: &[u8] = *buf;
    let mut reader = BitReader::new(data);
    let mut out = Vec::with_capacity(count);
    let mut prev_ts = 0i64;
    let mut prev_delta = 0i64;

    for i in 0..count {
        if i == 0 {
            prev_ts = reader.read_bits(64)? as i64;
            out.push(prev_ts);
            continue;
        }

        let delta_of_delta = if !reader.read_bit()? {
            0
        } else if !reader.read_bit()? {
            reader.read_bits(7)? as i64 - 63
        } else if !reader.read_bit()? {
            reader.read_bits(9)? as i64 - 255
        } else if !reader.read_bit()? {
            reader.read_bits(12)? as i64 - 2047
        } else {
            reader.read_bits(64)? as i64
        };

        prev_delta = prev_delta.wrapping_add(delta_of_delta);
        prev_ts = prev_ts.wrapping_add(prev_delta);
        out.push(prev_ts);
    }

    let consumed = reader.consumed_bytes();
    *buf = &data[consumed..];
    Ok(out)
}

fn decode_patterns(buf: &mut &[u8], count: usize) -> Result<Vec<u64>> {
    let data: &[u8] = *buf;
    let mut reader = BitReader::new(data);
    let mut out = Vec::with_capacity(count);
    let mut prev = 0u64;
    let mut prev_leading = 0u32;
    let mut prev_trailing = 0u32;

    for i in 0..count {
        if i == 0 {
            prev = reader.read_bits(64)?;
            out.push(prev);
            continue;
        }

        let xor = if !reader.read_bit()? {
            0
        } else if !reader.read_bit()? {
            let meaningful_bits = 64 - prev_leading - prev_trailing;
            reader.read_bits(meaningful_bits)? << prev_trailing
        } else {
            let leading = reader.read_bits(5)? as u32;
            let meaningful_bits = reader.read_bits(6)? as u32 + 1;
            let trailing = 64u32
                .checked_sub(leading + meaningful_bits)
                .ok_or_else(|| TsFileError::Corrupted("gorilla window exceeds 64 bits".into()))?;
            prev_leading = leading;
            prev_trailing = trailing;
            reader.read_bits(meaningful_bits)? << trailing
        };

        prev ^= xor;
        out.push(prev);
    }

    let consumed = reader.consumed_bytes();
    *buf = &data[consumed..];
    Ok(out)
}

/// Encodes a numeric column. Callers must have checked the data type.
pub(crate) fn encode_values(values: &Column, out: &mut Vec<u8>) {
    let patterns: Box<dyn Iterator<Item = u64> + '_> = match values {
        Column::Int32(v) => Box::new(v.iter().map(|&x| x as u32 as u64)),
        Column::Int64(v) => Box::new(v.iter().map(|&x| x as u64)),
        Column::Float(v) => Box::new(v.iter().map(|&x| x.to_bits() as u64)),
        Column::Double(v) => Box::new(v.iter().map(|&x| x.to_bits())),
        Column::Boolean(_) | Column::Text(_) => Box::new(std::iter::empty()),
    };

    let mut bits = Bits::new();
    let mut encoder = ValueEncoder::new();
    for pattern in patterns {
        encoder.encode(pattern, &mut bits);
    }
    finish(bits, out);
}

pub(crate) fn decode_values(data_type: DataType, buf: &mut &[u8], count: usize) -> Result<Column> {
    let patterns = decode_patterns(buf, count)?;
    let column = match data_type {
        DataType::Int32 => Column::Int32(patterns.into_iter().map(|p| p as u32 as i32).collect()),
        DataType::Int64 => Column::Int64(patterns.into_iter().map(|p| p as i64).collect()),
        DataType::Float => {
            Column::Float(patterns.into_iter().map(|p| f32::from_bits(p as u32)).collect())
        }
        DataType::Double => Column::Double(patterns.into_iter().map(f64::from_bits).collect()),
        DataType::Boolean | DataType::Text => {
            return Err(TsFileError::EncodingTypeMismatch {
                data_type,
                encoding: Encoding::Gorilla,
            })
        }
    };
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times_roundtrip(timestamps: &[i64]) -> usize {
        let mut out = Vec::new();
        encode_times(timestamps, &mut out);
        let len = out.len();

        let mut cursor = out.as_slice();
        let decoded = decode_times(&mut cursor, timestamps.len()).expect("should decode");
        assert_eq!(decoded, timestamps);
        assert!(cursor.is_empty());
        len
    }

    fn doubles_roundtrip(values: &[f64]) -> usize {
        let mut out = Vec::new();
        encode_values(&Column::Double(values.to_vec()), &mut out);
        let len = out.len();

        let mut cursor = out.as_slice();
        let decoded = decode_values(DataType::Double, &mut cursor, values.len()).unwrap();
        let Column::Double(decoded) = decoded else {
            panic!("expected double column");
        };
        for (expected, actual) in values.iter().zip(decoded.iter()) {
            assert_eq!(expected.to_bits(), actual.to_bits());
        }
        len
    }

    #[test]
    fn test_timestamp_encoder_zero_delta() {
        // First: 64 bits, second: '10' + 7 bits, rest: 1 bit each
        let timestamps = vec![1000_i64, 1010, 1020, 1030, 1040];
        let len = times_roundtrip(&timestamps);
        assert_eq!(len, (64 + 9 + 3usize).div_ceil(8));
    }

    #[test]
    fn test_timestamp_encoder_each_bucket() {
        // Delta-of-delta: 5, 150, 2000, 1_000_000
        let timestamps = vec![0_i64, 10, 25, 190, 2355, 1_004_520];
        times_roundtrip(&timestamps);
    }

    #[test]
    fn test_timestamp_encoder_bucket_edges() {
        let mut timestamps = vec![0_i64, 0];
        for dod in [-63_i64, 64, -255, 256, -2047, 2048, -2048, 2049] {
            let last = timestamps[timestamps.len() - 1];
            let prev = timestamps[timestamps.len() - 2];
            timestamps.push(last + (last - prev) + dod);
        }
        times_roundtrip(&timestamps);
    }

    #[test]
    fn test_timestamp_full_range() {
        let timestamps = vec![i64::MIN, -1, i64::MAX, 0, i64::MIN + 1];
        times_roundtrip(&timestamps);
    }

    #[test]
    fn test_value_encoder_identical() {
        // First value: 64 bits, subsequent: 1 bit each
        let len = doubles_roundtrip(&[42.5_f64; 10]);
        assert_eq!(len, (64 + 9usize).div_ceil(8));
    }

    #[test]
    fn test_value_encoder_varying() {
        doubles_roundtrip(&[1.0_f64, 1.5, 2.0, 2.5, 3.0, 100.0, -50.0, 0.0]);
        doubles_roundtrip(&[1.0_f64, 1.0000001, 1.0000002, 1.0000003]);
    }

    #[test]
    fn test_special_floats() {
        doubles_roundtrip(&[
            0.0_f64,
            -0.0,
            f64::MIN,
            f64::MAX,
            f64::MIN_POSITIVE,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NAN,
        ]);
    }

    #[test]
    fn test_full_width_xor() {
        // 0 ^ u64::MAX has no leading or trailing zeros
        let values = vec![0_i64, -1, 0, i64::MIN, 1];
        let mut out = Vec::new();
        encode_values(&Column::Int64(values.clone()), &mut out);
        let mut cursor = out.as_slice();
        assert_eq!(
            decode_values(DataType::Int64, &mut cursor, values.len()).unwrap(),
            Column::Int64(values)
        );
    }

    #[test]
    fn test_narrow_types_widen_by_bits() {
        let ints = vec![i32::MIN, -1, 0, 1, i32::MAX];
        let mut out = Vec::new();
        encode_values(&Column::Int32(ints.clone()), &mut out);
        let mut cursor = out.as_slice();
        assert_eq!(
            decode_values(DataType::Int32, &mut cursor, ints.len()).unwrap(),
            Column::Int32(ints)
        );

        let floats = vec![-1.5_f32, f32::MAX, f32::MIN_POSITIVE, 0.1];
        let mut out = Vec::new();
        encode_values(&Column::Float(floats.clone()), &mut out);
        let mut cursor = out.as_slice();
        assert_eq!(
            decode_values(DataType::Float, &mut cursor, floats.len()).unwrap(),
            Column::Float(floats)
        );
    }

    #[test]
    fn test_truncated_stream() {
        let mut out = Vec::new();
        encode_times(&[1, 2, 3_000_000], &mut out);
        out.truncate(9);
        let mut cursor = out.as_slice();
        assert!(matches!(
            decode_times(&mut cursor, 3),
            Err(TsFileError::Corrupted(_))
        ));
    }
}
