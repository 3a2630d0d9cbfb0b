//! TsFile writer - columnar time series file write path
//!
//! This crate writes self-describing, append-only time series files: points are
//! grouped per series into encoded and compressed chunks, chunks are grouped per
//! device, and a footer indexes every chunk by (device, measurement).
//!
//! # Components
//!
//! - [`SchemaRegistry`]: declared data type, encoding and compression per series
//! - [`encoding`]: PLAIN, TS_2DIFF and GORILLA page encoders
//! - [`compression`]: SNAPPY, GZIP, LZ4 and ZSTD payload compression
//! - [`ChunkBuffer`] / [`ChunkWriter`]: per-series accumulation and chunk serialization
//! - [`FileWriter`]: routing, flushing, memory bounds, footer and sealing
//! - [`Session`]: handle table for wrapper layers
//!
//! # Example
//!
//! ```rust,no_run
//! use tsfile::{
//!     Compression, DataType, DeviceSchemaBuilder, Encoding, FileWriter, SchemaRegistry,
//!     WriterConfig,
//! };
//!
//! let registry = SchemaRegistry::builder()
//!     .device(
//!         "d1",
//!         DeviceSchemaBuilder::new()
//!             .measurement("s1", DataType::Int32, Encoding::Plain, Compression::Uncompressed),
//!     )
//!     .build()?;
//!
//! let mut writer = FileWriter::open("d1.tsfile", registry, WriterConfig::default())?;
//! for t in 1..=3 {
//!     writer.write("d1", "s1", t, t as i32)?;
//! }
//! writer.close()?;
//! # Ok::<(), tsfile::TsFileError>(())
//! ```

#![deny(missing_docs)]

pub mod binding;
pub mod chunk;
pub mod compression;
pub mod config;
pub mod encoding;
pub mod error;
pub mod format;
pub mod index;
pub mod io;
pub mod schema;
pub mod statistics;
pub mod types;
pub mod writer;

pub use binding::{SchemaHandle, Session, WriterHandle};
pub use chunk::{BufferState, Chunk, ChunkBuffer, ChunkHeader, ChunkWriter};
pub use config::{PressurePolicy, WriterConfig};
pub use error::{ErrorCategory, Result, TsFileError};
pub use index::{BloomFilter, ChunkIndexEntry, FileFooter, SeriesIndexEntry};
pub use schema::{DeviceSchemaBuilder, MeasurementSchema, SchemaBuilder, SchemaRegistry, SeriesKey};
pub use statistics::{ChunkStatistics, NumericSummary, ValueStatistics};
pub use types::{Column, Compression, DataType, Encoding, Point, Value};
pub use writer::{FileWriter, WriterState, WriterStats};
