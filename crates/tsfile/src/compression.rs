//! Compression adapters for encoded chunk payloads.
//!
//! Every kind is lossless and deterministic for a given crate version, so
//! files written twice from the same points are byte-identical.

use crate::error::{Result, TsFileError};
use crate::types::Compression;
use std::io::{Read, Write};

/// Zstd level used for [`Compression::Zstd`].
pub const ZSTD_LEVEL: i32 = 3;

/// Compresses `data` with `kind`.
///
/// # Errors
///
/// Returns `TsFileError::CompressionFailure` if the codec reports an error.
pub fn compress(kind: Compression, data: &[u8]) -> Result<Vec<u8>> {
    match kind {
        Compression::Uncompressed => Ok(data.to_vec()),
        Compression::Snappy => snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| TsFileError::CompressionFailure(e.to_string())),
        Compression::Gzip => {
            use flate2::write::GzEncoder;
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(data)
                .and_then(|_| encoder.finish())
                .map_err(|e| TsFileError::CompressionFailure(e.to_string()))
        }
        Compression::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
        Compression::Zstd => zstd::encode_all(data, ZSTD_LEVEL)
            .map_err(|e| TsFileError::CompressionFailure(e.to_string())),
    }
}

/// Decompresses `data` and checks the result is exactly `expected_len` bytes.
///
/// # Errors
///
/// Returns `TsFileError::CompressionFailure` if the codec rejects the input or
/// the output length differs from `expected_len`.
pub fn decompress(kind: Compression, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let out = match kind {
        Compression::Uncompressed => data.to_vec(),
        Compression::Snappy => snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| TsFileError::CompressionFailure(e.to_string()))?,
        Compression::Gzip => {
            use flate2::read::GzDecoder;
            let mut decoder = GzDecoder::new(data);
            let mut decompressed = Vec::with_capacity(expected_len);
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| TsFileError::CompressionFailure(e.to_string()))?;
            decompressed
        }
        Compression::Lz4 => lz4_flex::decompress_size_prepended(data)
            .map_err(|e| TsFileError::CompressionFailure(e.to_string()))?,
        Compression::Zstd => {
            zstd::decode_all(data).map_err(|e| TsFileError::CompressionFailure(e.to_string()))?
        }
    };

    if out.len() != expected_len {
        return Err(TsFileError::CompressionFailure(format!(
            "{kind:?} produced {} bytes, expected {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}
