//! Value encoders.
//!
//! An encoded page holds both columns of a run of points:
//!
//! ```text
//! ┌──────────────────────────┬──────────────┬──────────────┐
//! │ time section len (varint)│ time section │ value section│
//! └──────────────────────────┴──────────────┴──────────────┘
//! ```
//!
//! The time column is encoded with the same family as the series:
//! fixed-width for [`Encoding::Plain`], zig-zag deltas for
//! [`Encoding::Ts2Diff`], delta-of-delta bits for [`Encoding::Gorilla`].
//! Encoding is deterministic: the same input always yields the same bytes.

mod gorilla;
mod plain;
mod ts2diff;
pub mod varint;

use crate::error::{Result, TsFileError};
use crate::types::{Column, DataType, Encoding, Point};
use varint::{decode_varint_u64, encode_varint_u64};

pub(crate) fn ensure_remaining(buf: &[u8], needed: usize, what: &str) -> Result<()> {
    if buf.len() < needed {
        return Err(TsFileError::Corrupted(format!(
            "{what}: need {needed} bytes, {} left",
            buf.len()
        )));
    }
    Ok(())
}

fn check_supported(data_type: DataType, encoding: Encoding) -> Result<()> {
    if encoding.supports(data_type) {
        Ok(())
    } else {
        Err(TsFileError::EncodingTypeMismatch {
            data_type,
            encoding,
        })
    }
}

/// Encodes parallel timestamp and value columns into one page.
///
/// # Errors
///
/// Returns `TsFileError::EncodingTypeMismatch` if `encoding` cannot encode the
/// column's data type, and `TsFileError::Corrupted` if the two columns differ
/// in length.
pub fn encode(encoding: Encoding, timestamps: &[i64], values: &Column) -> Result<Vec<u8>> {
    check_supported(values.data_type(), encoding)?;
    if timestamps.len() != values.len() {
        return Err(TsFileError::Corrupted(format!(
            "{} timestamps for {} values",
            timestamps.len(),
            values.len()
        )));
    }

    let mut times = Vec::new();
    match encoding {
        Encoding::Plain => plain::encode_times(timestamps, &mut times),
        Encoding::Ts2Diff => ts2diff::encode_i64(timestamps, &mut times),
        Encoding::Gorilla => gorilla::encode_times(timestamps, &mut times),
    }

    let mut out = Vec::with_capacity(times.len() + values.len() * 8 + 4);
    encode_varint_u64(&mut out, times.len() as u64);
    out.extend_from_slice(&times);

    match (encoding, values) {
        (Encoding::Plain, _) => plain::encode_values(values, &mut out),
        (Encoding::Ts2Diff, Column::Int32(v)) => ts2diff::encode_i32(v, &mut out),
        (Encoding::Ts2Diff, Column::Int64(v)) => ts2diff::encode_i64(v, &mut out),
        (Encoding::Ts2Diff, other) => {
            return Err(TsFileError::EncodingTypeMismatch {
                data_type: other.data_type(),
                encoding,
            })
        }
        (Encoding::Gorilla, _) => gorilla::encode_values(values, &mut out),
    }

    Ok(out)
}

/// Encodes a run of points that all carry `data_type`.
///
/// # Errors
///
/// Returns `TsFileError::TypeMismatch` if any point carries a different type,
/// plus everything [`encode`] returns.
pub fn encode_points(data_type: DataType, encoding: Encoding, points: &[Point]) -> Result<Vec<u8>> {
    check_supported(data_type, encoding)?;
    let mut timestamps = Vec::with_capacity(points.len());
    let mut values = Column::new(data_type);
    for point in points {
        timestamps.push(point.timestamp);
        values
            .push(point.value.clone())
            .map_err(|v| TsFileError::TypeMismatch {
                expected: data_type,
                actual: v.data_type(),
            })?;
    }
    encode(encoding, &timestamps, &values)
}

/// Decodes a page of `count` points back into timestamp and value columns.
///
/// # Errors
///
/// Returns `TsFileError::Corrupted` if the page is truncated or carries
/// trailing bytes.
pub fn decode(
    data_type: DataType,
    encoding: Encoding,
    bytes: &[u8],
    count: usize,
) -> Result<(Vec<i64>, Column)> {
    check_supported(data_type, encoding)?;
    let mut buf = bytes;
    let times_len = decode_varint_u64(&mut buf)? as usize;
    ensure_remaining(buf, times_len, "time section")?;
    let (mut times, mut rest) = buf.split_at(times_len);

    let timestamps = match encoding {
        Encoding::Plain => plain::decode_times(&mut times, count)?,
        Encoding::Ts2Diff => ts2diff::decode_i64(&mut times, count)?,
        Encoding::Gorilla => gorilla::decode_times(&mut times, count)?,
    };

    let values = match (encoding, data_type) {
        (Encoding::Plain, _) => plain::decode_values(data_type, &mut rest, count)?,
        (Encoding::Ts2Diff, DataType::Int32) => Column::Int32(ts2diff::decode_i32(&mut rest, count)?),
        (Encoding::Ts2Diff, _) => Column::Int64(ts2diff::decode_i64(&mut rest, count)?),
        (Encoding::Gorilla, _) => gorilla::decode_values(data_type, &mut rest, count)?,
    };

    if !times.is_empty() || !rest.is_empty() {
        return Err(TsFileError::Corrupted(format!(
            "{} trailing bytes after {count} points",
            times.len() + rest.len()
        )));
    }

    Ok((timestamps, values))
}

/// Decodes a page into points.
pub fn decode_points(
    data_type: DataType,
    encoding: Encoding,
    bytes: &[u8],
    count: usize,
) -> Result<Vec<Point>> {
    let (timestamps, values) = decode(data_type, encoding, bytes, count)?;
    Ok(timestamps
        .into_iter()
        .enumerate()
        .filter_map(|(i, ts)| values.get(i).map(|value| Point::new(ts, value)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_page_layout() {
        let bytes = encode(Encoding::Plain, &[1, 2], &Column::Int32(vec![7, 8])).unwrap();
        // varint(16) + 2 * i64 + 2 * i32
        assert_eq!(bytes.len(), 1 + 16 + 8);
        assert_eq!(bytes[0], 16);
        assert_eq!(&bytes[1..9], &1i64.to_le_bytes());
        assert_eq!(&bytes[17..21], &7i32.to_le_bytes());
    }

    #[test]
    fn test_encoding_type_mismatch() {
        let result = encode(Encoding::Ts2Diff, &[1], &Column::Double(vec![1.0]));
        assert!(matches!(
            result,
            Err(TsFileError::EncodingTypeMismatch {
                data_type: DataType::Double,
                encoding: Encoding::Ts2Diff,
            })
        ));

        let result = encode(Encoding::Gorilla, &[1], &Column::Text(vec!["a".into()]));
        assert!(matches!(result, Err(TsFileError::EncodingTypeMismatch { .. })));
    }

    #[test]
    fn test_encode_points_type_mismatch() {
        let points = vec![Point::new(1, 1i32), Point::new(2, 2i64)];
        let result = encode_points(DataType::Int32, Encoding::Plain, &points);
        assert!(matches!(
            result,
            Err(TsFileError::TypeMismatch {
                expected: DataType::Int32,
                actual: DataType::Int64,
            })
        ));
    }

    #[test]
    fn test_every_combination_roundtrips() {
        let timestamps: Vec<i64> = vec![-5, 0, 1, 2, 10, 1_000_000, 1_000_001];
        let columns = vec![
            Column::Boolean(vec![true, false, false, true, true, false, true]),
            Column::Int32(vec![i32::MIN, -1, 0, 0, 1, 1000, i32::MAX]),
            Column::Int64(vec![i64::MIN, -1, 0, 0, 1, 1000, i64::MAX]),
            Column::Float(vec![-1.5, 0.0, 0.0, 3.25, f32::MAX, f32::MIN, 1e-7]),
            Column::Double(vec![-1.5, 0.0, 0.0, 3.25, f64::MAX, f64::MIN, 1e-300]),
            Column::Text(vec![
                "a".into(),
                "".into(),
                "bb".into(),
                "bb".into(),
                "ünï".into(),
                "x".into(),
                "y".into(),
            ]),
        ];

        for column in &columns {
            for encoding in [Encoding::Plain, Encoding::Ts2Diff, Encoding::Gorilla] {
                if !encoding.supports(column.data_type()) {
                    continue;
                }
                let bytes = encode(encoding, &timestamps, column).unwrap();
                let again = encode(encoding, &timestamps, column).unwrap();
                assert_eq!(bytes, again, "{:?} must be deterministic", encoding);

                let (ts, values) =
                    decode(column.data_type(), encoding, &bytes, timestamps.len()).unwrap();
                assert_eq!(ts, timestamps, "{:?}/{:?}", column.data_type(), encoding);
                assert_eq!(&values, column, "{:?}/{:?}", column.data_type(), encoding);
            }
        }
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = encode(Encoding::Plain, &[1], &Column::Int64(vec![1])).unwrap();
        bytes.push(0);
        let result = decode(DataType::Int64, Encoding::Plain, &bytes, 1);
        assert!(matches!(result, Err(TsFileError::Corrupted(_))));
    }

    #[test]
    fn test_decode_points() {
        let points = vec![Point::new(1, 1.5f64), Point::new(3, -2.0f64)];
        let bytes = encode_points(DataType::Double, Encoding::Gorilla, &points).unwrap();
        let decoded = decode_points(DataType::Double, Encoding::Gorilla, &bytes, 2).unwrap();
        assert_eq!(decoded, points);
    }
}
