//! Footer index: where every chunk of every series lives.
//!
//! ```text
//! 0x02 marker
//! schema list      u32 count, then (device, measurement, tags) per series
//! series index     u32 count, then per series in (device, measurement) order:
//!                    device, measurement, data type (u8),
//!                    merged statistics, u32 chunk count,
//!                    (chunk offset u64, chunk statistics) per chunk
//! bloom filter     u32 words, u8 hash count + 3 reserved, words (u64 each)
//! ```

use crate::error::{Result, TsFileError};
use crate::format::{read_str, read_u32, read_u64, read_u8, write_str, FOOTER_MARKER};
use crate::schema::{read_data_type, SchemaRegistry};
use crate::statistics::ChunkStatistics;
use crate::types::DataType;
use std::io::{Read, Write};

/// Number of hash functions for the Bloom filter.
const BLOOM_FILTER_HASH_COUNT: u8 = 3;

/// Bloom filter over series paths (`device.measurement`).
///
/// Uses xxhash64 with k=3 hash functions using different seeds:
/// `h_i(x) = xxhash64(x, seed=i) % size_bits`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u64>,
    hash_count: u8,
}

impl BloomFilter {
    /// Creates a filter sized for `expected_items` at false-positive rate `error_rate`.
    pub fn new(expected_items: usize, error_rate: f64) -> Self {
        let error_rate = error_rate.clamp(1e-9, 0.5);
        // m = -n ln(p) / ln(2)^2
        let ln2 = std::f64::consts::LN_2;
        let num_bits = (-(expected_items as f64) * error_rate.ln() / (ln2 * ln2)).ceil() as usize;
        let num_words = num_bits.max(64).div_ceil(64);

        Self {
            bits: vec![0u64; num_words],
            hash_count: BLOOM_FILTER_HASH_COUNT,
        }
    }

    fn bit_positions<'a>(&'a self, device: &'a str, measurement: &'a str) -> impl Iterator<Item = (usize, u64)> + 'a {
        let num_bits = (self.bits.len() * 64) as u64;
        (0..self.hash_count).map(move |seed| {
            let mut hasher = xxhash_rust::xxh64::Xxh64::new(seed as u64);
            hasher.update(device.as_bytes());
            hasher.update(b".");
            hasher.update(measurement.as_bytes());
            let bit_idx = hasher.digest() % num_bits;
            ((bit_idx / 64) as usize, 1u64 << (bit_idx % 64))
        })
    }

    /// Adds a series path to the filter.
    pub fn insert(&mut self, device: &str, measurement: &str) {
        let positions: Vec<_> = self.bit_positions(device, measurement).collect();
        for (word, mask) in positions {
            self.bits[word] |= mask;
        }
    }

    /// Returns `false` if the series is definitely absent.
    pub fn maybe_contains(&self, device: &str, measurement: &str) -> bool {
        self.bit_positions(device, measurement)
            .all(|(word, mask)| self.bits[word] & mask != 0)
    }

    /// Writes the filter.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        // Number of words (4 bytes)
        writer.write_all(&(self.bits.len() as u32).to_le_bytes())?;
        // Hash count (1 byte) + 3 bytes reserved
        writer.write_all(&[self.hash_count, 0, 0, 0])?;
        for word in &self.bits {
            writer.write_all(&word.to_le_bytes())?;
        }
        Ok(())
    }

    /// Reads a filter written by [`BloomFilter::write_to`].
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let num_words = read_u32(reader)? as usize;
        let hash_count = read_u8(reader)?;
        let mut reserved = [0u8; 3];
        reader.read_exact(&mut reserved)?;
        if num_words == 0 {
            return Err(TsFileError::Corrupted("empty bloom filter".into()));
        }

        let mut bits = Vec::with_capacity(num_words);
        for _ in 0..num_words {
            bits.push(read_u64(reader)?);
        }
        Ok(Self { bits, hash_count })
    }
}

/// Location and statistics of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkIndexEntry {
    /// File offset of the chunk marker.
    pub offset: u64,
    /// Statistics of the chunk.
    pub statistics: ChunkStatistics,
}

/// Every chunk of one series, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesIndexEntry {
    /// Device identifier.
    pub device: String,
    /// Measurement identifier.
    pub measurement: String,
    /// Data type of the series.
    pub data_type: DataType,
    /// Statistics merged over all chunks.
    pub statistics: ChunkStatistics,
    /// Chunk locations.
    pub chunks: Vec<ChunkIndexEntry>,
}

impl SeriesIndexEntry {
    /// Starts an entry from the first chunk of a series.
    pub fn new(device: &str, measurement: &str, first: ChunkIndexEntry) -> Self {
        Self {
            device: device.to_string(),
            measurement: measurement.to_string(),
            data_type: first.statistics.data_type(),
            statistics: first.statistics.clone(),
            chunks: vec![first],
        }
    }

    /// Appends a later chunk and folds its statistics in.
    pub fn push(&mut self, chunk: ChunkIndexEntry) -> Result<()> {
        self.statistics.merge(&chunk.statistics)?;
        self.chunks.push(chunk);
        Ok(())
    }

    /// Total number of points across chunks.
    pub fn point_count(&self) -> u64 {
        self.statistics.count
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_str(writer, &self.device)?;
        write_str(writer, &self.measurement)?;
        writer.write_all(&[self.data_type as u8])?;
        self.statistics.write_to(writer)?;
        writer.write_all(&(self.chunks.len() as u32).to_le_bytes())?;
        for chunk in &self.chunks {
            writer.write_all(&chunk.offset.to_le_bytes())?;
            chunk.statistics.write_to(writer)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let device = read_str(reader)?;
        let measurement = read_str(reader)?;
        let data_type = read_data_type(reader)?;
        let statistics = ChunkStatistics::read_from(reader, data_type)?;
        let chunk_count = read_u32(reader)?;
        let mut chunks = Vec::with_capacity(chunk_count.min(1 << 16) as usize);
        for _ in 0..chunk_count {
            let offset = read_u64(reader)?;
            let statistics = ChunkStatistics::read_from(reader, data_type)?;
            chunks.push(ChunkIndexEntry { offset, statistics });
        }
        Ok(Self {
            device,
            measurement,
            data_type,
            statistics,
            chunks,
        })
    }
}

/// The footer: schema list, series index and Bloom filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FileFooter {
    /// Every series the file was opened with, written or not.
    pub schemas: SchemaRegistry,
    /// Series with at least one chunk, ordered by (device, measurement).
    pub series: Vec<SeriesIndexEntry>,
    /// Filter over the paths in `series`.
    pub bloom: BloomFilter,
}

impl FileFooter {
    /// Finds the index entry of a series.
    pub fn find(&self, device: &str, measurement: &str) -> Option<&SeriesIndexEntry> {
        if !self.bloom.maybe_contains(device, measurement) {
            return None;
        }
        self.series
            .binary_search_by(|e| {
                (e.device.as_str(), e.measurement.as_str()).cmp(&(device, measurement))
            })
            .ok()
            .map(|i| &self.series[i])
    }

    /// Total number of chunks in the file.
    pub fn chunk_count(&self) -> usize {
        self.series.iter().map(|s| s.chunks.len()).sum()
    }

    /// Writes the footer, marker included.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[FOOTER_MARKER])?;
        self.schemas.write_to(writer)?;
        writer.write_all(&(self.series.len() as u32).to_le_bytes())?;
        for entry in &self.series {
            entry.write_to(writer)?;
        }
        self.bloom.write_to(writer)
    }

    /// Reads a footer written by [`FileFooter::write_to`].
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::UnknownTag` if the footer marker is missing.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let marker = read_u8(reader)?;
        if marker != FOOTER_MARKER {
            return Err(TsFileError::UnknownTag {
                kind: "footer marker",
                tag: marker,
            });
        }
        let schemas = SchemaRegistry::read_from(reader)?;
        let count = read_u32(reader)?;
        let mut series = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            series.push(SeriesIndexEntry::read_from(reader)?);
        }
        let bloom = BloomFilter::read_from(reader)?;
        Ok(Self {
            schemas,
            series,
            bloom,
        })
    }
}
