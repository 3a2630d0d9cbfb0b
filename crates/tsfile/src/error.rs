//! Error and Result types for TsFile write operations.

use crate::types::{DataType, Encoding};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A convenience `Result` type for TsFile operations.
pub type Result<T> = std::result::Result<T, TsFileError>;

/// Broad failure families a caller can branch on without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Series definition and lookup failures.
    Schema,
    /// Rejected points and use of a finished writer.
    Write,
    /// Encoder rejected the data type.
    Encoding,
    /// Storage or compression failures.
    Io,
    /// Handle lifecycle violations.
    Lifecycle,
    /// Malformed bytes found while decoding a file or chunk.
    Format,
}

/// The error type for TsFile operations.
#[derive(Debug, Error)]
pub enum TsFileError {
    /// The (device, measurement) pair is already defined.
    #[error("Series {device}.{measurement} is already defined")]
    DuplicateSeries {
        /// Device identifier.
        device: String,
        /// Measurement identifier.
        measurement: String,
    },

    /// The encoding cannot be used with the data type.
    #[error("Encoding {encoding:?} is not supported for data type {data_type:?}")]
    UnsupportedCombination {
        /// Declared data type.
        data_type: DataType,
        /// Declared encoding.
        encoding: Encoding,
    },

    /// No schema is registered for the (device, measurement) pair.
    #[error("Series {device}.{measurement} is not registered")]
    UnknownSeries {
        /// Device identifier.
        device: String,
        /// Measurement identifier.
        measurement: String,
    },

    /// The value does not match the declared data type of the series.
    #[error("Type mismatch: series declared {expected:?}, got {actual:?}")]
    TypeMismatch {
        /// Declared data type.
        expected: DataType,
        /// Data type of the supplied value.
        actual: DataType,
    },

    /// Timestamp is not strictly greater than the last accepted one.
    #[error("Out of order timestamp: {got} is not after {last}")]
    OutOfOrderTimestamp {
        /// Last accepted timestamp for the series.
        last: i64,
        /// Rejected timestamp.
        got: i64,
    },

    /// The writer or handle is closed, aborted or released.
    #[error("Handle is closed")]
    HandleClosed,

    /// The encoder was asked to encode a data type it does not support.
    #[error("Encoding {encoding:?} cannot encode data type {data_type:?}")]
    EncodingTypeMismatch {
        /// Data type of the column.
        data_type: DataType,
        /// Requested encoding.
        encoding: Encoding,
    },

    /// The target file could not be created or truncated.
    #[error("Cannot create file {path}: {source}")]
    CannotCreateFile {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Underlying I/O error while writing.
    #[error("Write failure: {0}")]
    WriteFailure(#[from] io::Error),

    /// Compression or decompression failed.
    #[error("Compression failure: {0}")]
    CompressionFailure(String),

    /// `close` was called on an already closed writer.
    #[error("Writer is already closed")]
    AlreadyClosed,

    /// The schema handle was already released.
    #[error("Schema handle {0} was already released")]
    DoubleRelease(u64),

    /// Invalid magic bytes at the start or end of a file.
    #[error("Invalid magic bytes: {0:?}")]
    InvalidMagic(Vec<u8>),

    /// File format version is newer than this crate understands.
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),

    /// A type, encoding, compression or marker tag is not recognized.
    #[error("Unknown {kind} tag: {tag}")]
    UnknownTag {
        /// Which tag family was being decoded.
        kind: &'static str,
        /// Raw tag value.
        tag: u8,
    },

    /// Checksum does not match the stored value.
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Stored CRC32 checksum.
        expected: u32,
        /// Computed CRC32 checksum.
        actual: u32,
    },

    /// Encoded bytes are truncated or structurally invalid.
    #[error("Corrupted data: {0}")]
    Corrupted(String),
}

impl TsFileError {
    /// Returns the failure family of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicateSeries { .. }
            | Self::UnsupportedCombination { .. }
            | Self::UnknownSeries { .. } => ErrorCategory::Schema,
            Self::TypeMismatch { .. } | Self::OutOfOrderTimestamp { .. } | Self::HandleClosed => {
                ErrorCategory::Write
            }
            Self::EncodingTypeMismatch { .. } => ErrorCategory::Encoding,
            Self::CannotCreateFile { .. } | Self::WriteFailure(_) | Self::CompressionFailure(_) => {
                ErrorCategory::Io
            }
            Self::AlreadyClosed | Self::DoubleRelease(_) => ErrorCategory::Lifecycle,
            Self::InvalidMagic(_)
            | Self::UnsupportedVersion(_)
            | Self::UnknownTag { .. }
            | Self::ChecksumMismatch { .. }
            | Self::Corrupted(_) => ErrorCategory::Format,
        }
    }

    pub(crate) fn unknown_series(device: &str, measurement: &str) -> Self {
        Self::UnknownSeries {
            device: device.to_string(),
            measurement: measurement.to_string(),
        }
    }
}
