//! PLAIN encoding: fixed-width little-endian values, no transform.
//!
//! Booleans take one byte (0 or 1). Text values are a varint byte length
//! followed by the UTF-8 bytes.

use super::varint::{decode_varint_u64, encode_varint_u64};
use super::ensure_remaining;
use crate::error::{Result, TsFileError};
use crate::types::{Column, DataType};
use bytes::{Buf, BufMut};

pub(crate) fn encode_times(timestamps: &[i64], out: &mut Vec<u8>) {
    out.reserve(timestamps.len() * 8);
    for &ts in timestamps {
        out.put_i64_le(ts);
    }
}

pub(crate) fn decode_times(buf: &mut &[u8], count: usize) -> Result<Vec<i64>> {
    ensure_remaining(buf, count * 8, "plain timestamps")?;
    Ok((0..count).map(|_| buf.get_i64_le()).collect())
}

pub(crate) fn encode_values(values: &Column, out: &mut Vec<u8>) {
    match values {
        Column::Boolean(v) => {
            out.extend(v.iter().map(|&b| b as u8));
        }
        Column::Int32(v) => v.iter().for_each(|&x| out.put_i32_le(x)),
        Column::Int64(v) => v.iter().for_each(|&x| out.put_i64_le(x)),
        Column::Float(v) => v.iter().for_each(|&x| out.put_f32_le(x)),
        Column::Double(v) => v.iter().for_each(|&x| out.put_f64_le(x)),
        Column::Text(v) => {
            for s in v {
                encode_varint_u64(out, s.len() as u64);
                out.put_slice(s.as_bytes());
            }
        }
    }
}

pub(crate) fn decode_values(data_type: DataType, buf: &mut &[u8], count: usize) -> Result<Column> {
    if let Some(width) = data_type.fixed_width() {
        ensure_remaining(buf, count * width, "plain values")?;
    }

    let column = match data_type {
        DataType::Boolean => {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(match buf.get_u8() {
                    0 => false,
                    1 => true,
                    other => {
                        return Err(TsFileError::Corrupted(format!(
                            "invalid boolean byte {other}"
                        )))
                    }
                });
            }
            Column::Boolean(out)
        }
        DataType::Int32 => Column::Int32((0..count).map(|_| buf.get_i32_le()).collect()),
        DataType::Int64 => Column::Int64((0..count).map(|_| buf.get_i64_le()).collect()),
        DataType::Float => Column::Float((0..count).map(|_| buf.get_f32_le()).collect()),
        DataType::Double => Column::Double((0..count).map(|_| buf.get_f64_le()).collect()),
        DataType::Text => {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                let len = decode_varint_u64(buf)? as usize;
                ensure_remaining(buf, len, "plain text")?;
                let s = std::str::from_utf8(&buf[..len])
                    .map_err(|e| TsFileError::Corrupted(format!("invalid UTF-8 text: {e}")))?
                    .to_string();
                buf.advance(len);
                out.push(s);
            }
            Column::Text(out)
        }
    };

    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int32_little_endian_layout() {
        let mut out = Vec::new();
        encode_values(&Column::Int32(vec![1, -1]), &mut out);
        assert_eq!(out, vec![1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_text_roundtrip() {
        let values = Column::Text(vec!["".into(), "héllo".into(), "x".repeat(300)]);
        let mut out = Vec::new();
        encode_values(&values, &mut out);

        let mut cursor = out.as_slice();
        let decoded = decode_values(DataType::Text, &mut cursor, 3).unwrap();
        assert_eq!(decoded, values);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_times_roundtrip() {
        let ts = vec![i64::MIN, -1, 0, i64::MAX];
        let mut out = Vec::new();
        encode_times(&ts, &mut out);
        assert_eq!(out.len(), 32);

        let mut cursor = out.as_slice();
        assert_eq!(decode_times(&mut cursor, 4).unwrap(), ts);
    }

    #[test]
    fn test_truncated_values() {
        let bytes = [0u8; 7];
        let mut cursor: &[u8] = &bytes;
        let result = decode_values(DataType::Int64, &mut cursor, 1);
        assert!(matches!(result, Err(TsFileError::Corrupted(_))));
    }

    #[test]
    fn test_invalid_boolean_byte() {
        let bytes = [2u8];
        let mut cursor: &[u8] = &bytes;
        let result = decode_values(DataType::Boolean, &mut cursor, 1);
        assert!(matches!(result, Err(TsFileError::Corrupted(_))));
    }
}
