//! Per-series accumulator of pending points.

use crate::chunk::ChunkWriter;
use crate::config::WriterConfig;
use crate::error::{Result, TsFileError};
use crate::index::ChunkIndexEntry;
use crate::schema::MeasurementSchema;
use crate::types::{Column, Value};
use std::io::Write;

/// Raw bytes one timestamp occupies in a buffer.
const TIMESTAMP_SIZE: usize = std::mem::size_of::<i64>();

/// Lifecycle of a [`ChunkBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// No pending points.
    Empty,
    /// At least one pending point.
    Accumulating,
    /// The pending run is being handed to the chunk writer.
    Flushing,
}

/// Pending points of one series, stored column-wise.
///
/// The last accepted timestamp outlives flushes, so strict ordering holds for
/// the whole file rather than per chunk.
#[derive(Debug)]
pub struct ChunkBuffer {
    schema: MeasurementSchema,
    timestamps: Vec<i64>,
    values: Column,
    raw_bytes: usize,
    last_timestamp: Option<i64>,
    state: BufferState,
}

impl ChunkBuffer {
    /// Creates an empty buffer for a series.
    pub fn new(schema: MeasurementSchema) -> Self {
        Self {
            values: Column::new(schema.data_type),
            schema,
            timestamps: Vec::new(),
            raw_bytes: 0,
            last_timestamp: None,
            state: BufferState::Empty,
        }
    }

    /// Current state.
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Schema of the series.
    pub fn schema(&self) -> &MeasurementSchema {
        &self.schema
    }

    /// Number of pending points.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns true if no points are pending.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Raw size of the pending points.
    pub fn raw_bytes(&self) -> usize {
        self.raw_bytes
    }

    /// Last accepted timestamp, flushed or not.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    /// Checks that a point would be accepted, without buffering it.
    ///
    /// # Errors
    ///
    /// - `TsFileError::TypeMismatch` if the value's type differs from the schema.
    /// - `TsFileError::OutOfOrderTimestamp` if `timestamp` is not after the
    ///   last accepted one.
    pub fn check(&self, timestamp: i64, value: &Value) -> Result<()> {
        let actual = value.data_type();
        if actual != self.schema.data_type {
            return Err(TsFileError::TypeMismatch {
                expected: self.schema.data_type,
                actual,
            });
        }
        match self.last_timestamp {
            Some(last) if timestamp <= last => Err(TsFileError::OutOfOrderTimestamp {
                last,
                got: timestamp,
            }),
            _ => Ok(()),
        }
    }

    /// Buffers a point.
    ///
    /// Returns the number of raw bytes added. Nothing is buffered on error.
    pub fn append(&mut self, timestamp: i64, value: Value) -> Result<usize> {
        self.check(timestamp, &value)?;

        let added = TIMESTAMP_SIZE + value.raw_size();
        self.values
            .push(value)
            .map_err(|v| TsFileError::TypeMismatch {
                expected: self.schema.data_type,
                actual: v.data_type(),
            })?;
        self.timestamps.push(timestamp);
        self.raw_bytes += added;
        self.last_timestamp = Some(timestamp);
        self.state = BufferState::Accumulating;
        Ok(added)
    }

    /// Returns true once either chunk threshold of `config` is reached.
    pub fn is_full(&self, config: &WriterConfig) -> bool {
        self.timestamps.len() >= config.max_points_per_chunk
            || self.raw_bytes >= config.max_chunk_raw_bytes
    }

    /// Hands the pending run to `writer` as one chunk and empties the buffer.
    ///
    /// An empty buffer writes nothing and returns `None`. On error the pending
    /// points stay buffered.
    pub fn flush<W: Write>(
        &mut self,
        measurement: &str,
        writer: &mut ChunkWriter<'_, W>,
    ) -> Result<Option<ChunkIndexEntry>> {
        if self.is_empty() {
            return Ok(None);
        }

        self.state = BufferState::Flushing;
        match writer.write(measurement, &self.schema, &self.timestamps, &self.values) {
            Ok(entry) => {
                self.timestamps.clear();
                self.values = Column::new(self.schema.data_type);
                self.raw_bytes = 0;
                self.state = BufferState::Empty;
                Ok(entry)
            }
            Err(e) => {
                self.state = BufferState::Accumulating;
                Err(e)
            }
        }
    }
}
