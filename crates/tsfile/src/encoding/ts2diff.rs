//! TS_2DIFF encoding: the first value verbatim, then first-order differences.
//!
//! Differences are zig-zag varints (see [`super::varint`]), so runs with small
//! positive, zero or negative steps stay one or two bytes per value.
//! 64-bit differences wrap, which keeps `i64::MIN` next to `i64::MAX` lossless.

use super::ensure_remaining;
use super::varint::{decode_varint, encode_varint};
use crate::error::{Result, TsFileError};
use bytes::{Buf, BufMut};

pub(crate) fn encode_i64(values: &[i64], out: &mut Vec<u8>) {
    let Some((&first, rest)) = values.split_first() else {
        return;
    };
    out.put_i64_le(first);

    let mut prev = first;
    for &v in rest {
        encode_varint(out, v.wrapping_sub(prev));
        prev = v;
    }
}

pub(crate) fn decode_i64(buf: &mut &[u8], count: usize) -> Result<Vec<i64>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    ensure_remaining(buf, 8, "ts2diff first value")?;

    let mut out = Vec::with_capacity(count);
    let mut prev = buf.get_i64_le();
    out.push(prev);
    for _ in 1..count {
        prev = prev.wrapping_add(decode_varint(buf)?);
        out.push(prev);
    }
    Ok(out)
}

pub(crate) fn encode_i32(values: &[i32], out: &mut Vec<u8>) {
    let Some((&first, rest)) = values.split_first() else {
        return;
    };
    out.put_i32_le(first);

    let mut prev = first as i64;
    for &v in rest {
        let v = v as i64;
        encode_varint(out, v - prev);
        prev = v;
    }
}

pub(crate) fn decode_i32(buf: &mut &[u8], count: usize) -> Result<Vec<i32>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    ensure_remaining(buf, 4, "ts2diff first value")?;

    let mut out = Vec::with_capacity(count);
    let mut prev = buf.get_i32_le();
    out.push(prev);
    for _ in 1..count {
        let delta = decode_varint(buf)?;
        prev = (prev as i64)
            .checked_add(delta)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| TsFileError::Corrupted(format!("int32 delta {delta} out of range")))?;
        out.push(prev);
    }
    Ok(out)
}
