//! Chunk serialization.
//!
//! ## Chunk Layout
//!
//! ```text
//! Field            Size    Description
//! ------           ----    -----------
//! marker           1       0x01
//! measurement      var     varint length + UTF-8
//! data_type        1       data type tag
//! encoding         1       encoding tag
//! compression      1       compression tag
//! point_count      4       u32 LE
//! raw_len          4       u32 LE, encoded page size
//! compressed_len   4       u32 LE, payload size
//! payload_crc32    4       u32 LE, CRC32 of payload
//! statistics       var     see ChunkStatistics::write_to
//! payload          N       compressed_len bytes
//! ```

use crate::compression::{compress, decompress};
use crate::encoding;
use crate::error::{Result, TsFileError};
use crate::format::{read_str, read_u32, read_u8, write_str, CHUNK_MARKER};
use crate::index::ChunkIndexEntry;
use crate::io::PositionedWriter;
use crate::schema::{read_data_type, MeasurementSchema};
use crate::statistics::ChunkStatistics;
use crate::types::{Column, Compression, DataType, Encoding};
use std::io::{self, Read, Write};
use tracing::debug;

/// Header preceding every chunk payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHeader {
    /// Measurement within the enclosing chunk group's device.
    pub measurement: String,
    /// Data type of the values.
    pub data_type: DataType,
    /// Encoding of the page.
    pub encoding: Encoding,
    /// Compression of the payload.
    pub compression: Compression,
    /// Number of points.
    pub point_count: u32,
    /// Size of the encoded page before compression.
    pub raw_len: u32,
    /// Size of the payload.
    pub compressed_len: u32,
    /// CRC32 of the payload.
    pub payload_crc32: u32,
    /// Chunk statistics.
    pub statistics: ChunkStatistics,
}

impl ChunkHeader {
    /// Writes the header, without the leading marker.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_str(writer, &self.measurement)?;
        // Tags (3 bytes)
        writer.write_all(&[
            self.data_type as u8,
            self.encoding as u8,
            self.compression as u8,
        ])?;
        // Point count (4 bytes)
        writer.write_all(&self.point_count.to_le_bytes())?;
        // Raw length (4 bytes)
        writer.write_all(&self.raw_len.to_le_bytes())?;
        // Compressed length (4 bytes)
        writer.write_all(&self.compressed_len.to_le_bytes())?;
        // Payload CRC32 (4 bytes)
        writer.write_all(&self.payload_crc32.to_le_bytes())?;
        self.statistics.write_to(writer)
    }

    /// Reads a header whose marker has already been consumed.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let measurement = read_str(reader)?;
        let data_type = read_data_type(reader)?;
        let tag = read_u8(reader)?;
        let encoding = Encoding::from_u8(tag).ok_or(TsFileError::UnknownTag {
            kind: "encoding",
            tag,
        })?;
        let tag = read_u8(reader)?;
        let compression = Compression::from_u8(tag).ok_or(TsFileError::UnknownTag {
            kind: "compression",
            tag,
        })?;
        let point_count = read_u32(reader)?;
        let raw_len = read_u32(reader)?;
        let compressed_len = read_u32(reader)?;
        let payload_crc32 = read_u32(reader)?;
        let statistics = ChunkStatistics::read_from(reader, data_type)?;

        Ok(Self {
            measurement,
            data_type,
            encoding,
            compression,
            point_count,
            raw_len,
            compressed_len,
            payload_crc32,
            statistics,
        })
    }
}

/// A chunk read back from a file.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk header.
    pub header: ChunkHeader,
    /// Compressed payload.
    pub payload: Vec<u8>,
}

impl Chunk {
    /// Reads a chunk whose marker has already been consumed and verifies its CRC.
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::ChecksumMismatch` if the payload is corrupted.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let header = ChunkHeader::read_from(reader)?;
        let mut payload = vec![0u8; header.compressed_len as usize];
        reader.read_exact(&mut payload)?;

        let actual = crc32fast::hash(&payload);
        if actual != header.payload_crc32 {
            return Err(TsFileError::ChecksumMismatch {
                expected: header.payload_crc32,
                actual,
            });
        }
        Ok(Self { header, payload })
    }

    /// Decompresses and decodes the payload.
    pub fn decode(&self) -> Result<(Vec<i64>, Column)> {
        let page = decompress(
            self.header.compression,
            &self.payload,
            self.header.raw_len as usize,
        )?;
        encoding::decode(
            self.header.data_type,
            self.header.encoding,
            &page,
            self.header.point_count as usize,
        )
    }
}

fn to_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        TsFileError::WriteFailure(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} of {len} does not fit in a chunk header"),
        ))
    })
}

/// Serializes flushed runs onto the output stream.
pub struct ChunkWriter<'a, W: Write> {
    out: &'a mut PositionedWriter<W>,
}

impl<'a, W: Write> ChunkWriter<'a, W> {
    /// Borrows the output stream for one or more chunk writes.
    pub fn new(out: &'a mut PositionedWriter<W>) -> Self {
        Self { out }
    }

    /// Encodes, compresses and appends one chunk.
    ///
    /// Returns the chunk's offset and statistics for the footer index, or
    /// `None` for an empty run (nothing is written).
    ///
    /// # Errors
    ///
    /// Encoding and compression happen before the first byte is written, so
    /// their errors leave the stream untouched. I/O errors may leave a
    /// partial chunk behind.
    pub fn write(
        &mut self,
        measurement: &str,
        schema: &MeasurementSchema,
        timestamps: &[i64],
        values: &Column,
    ) -> Result<Option<ChunkIndexEntry>> {
        let Some(statistics) = ChunkStatistics::from_columns(timestamps, values) else {
            return Ok(None);
        };

        let page = encoding::encode(schema.encoding, timestamps, values)?;
        let payload = compress(schema.compression, &page)?;

        let header = ChunkHeader {
            measurement: measurement.to_string(),
            data_type: schema.data_type,
            encoding: schema.encoding,
            compression: schema.compression,
            point_count: to_u32(timestamps.len(), "point count")?,
            raw_len: to_u32(page.len(), "raw length")?,
            compressed_len: to_u32(payload.len(), "compressed length")?,
            payload_crc32: crc32fast::hash(&payload),
            statistics,
        };

        let mut head = Vec::with_capacity(64 + measurement.len());
        head.push(CHUNK_MARKER);
        header.write_to(&mut head)?;

        let offset = self.out.position();
        self.out.write_all(&head)?;
        self.out.write_all(&payload)?;

        debug!(
            measurement,
            points = header.point_count,
            raw_len = header.raw_len,
            compressed_len = header.compressed_len,
            offset,
            "Wrote chunk"
        );

        Ok(Some(ChunkIndexEntry {
            offset,
            statistics: header.statistics,
        }))
    }
}
