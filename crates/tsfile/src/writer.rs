//! File writer: routes points to chunk buffers and seals the file on close.
//!
//! # Lifecycle
//!
//! ```text
//! OPEN ──close()──▶ CLOSING ──▶ CLOSED
//!   │                  │
//!   └──abort()/error───┴──────▶ ABORTED
//! ```
//!
//! Only a successful `close` writes the footer and the trailing magic, so a
//! file left by `abort`, an I/O error or a dropped writer is never mistaken for
//! a complete one.

use crate::chunk::{ChunkBuffer, ChunkWriter};
use crate::config::{PressurePolicy, WriterConfig};
use crate::error::{Result, TsFileError};
use crate::format::{write_head, write_str, Tail, CHUNK_GROUP_MARKER};
use crate::index::{BloomFilter, FileFooter, SeriesIndexEntry};
use crate::io::PositionedWriter;
use crate::schema::{SchemaRegistry, SeriesKey};
use crate::types::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// State of a [`FileWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting writes.
    Open,
    /// Flushing buffers and writing the footer.
    Closing,
    /// Sealed. Terminal.
    Closed,
    /// Abandoned without a footer. Terminal.
    Aborted,
}

impl WriterState {
    /// Returns true for `Closed` and `Aborted`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Aborted)
    }
}

/// Counters describing a writer's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Points accepted.
    pub points_written: u64,
    /// Chunks appended to the stream.
    pub chunks_flushed: u64,
    /// Bytes appended to the stream.
    pub bytes_written: u64,
    /// Raw bytes currently buffered across all series.
    pub buffered_bytes: usize,
}

/// Writes one TsFile.
///
/// A writer is single-owner: it takes the schema registry and the output sink
/// by value, and nothing else can touch either until it is closed.
pub struct FileWriter<W: Write> {
    out: Option<PositionedWriter<W>>,
    sync_handle: Option<File>,
    path: Option<PathBuf>,
    registry: SchemaRegistry,
    config: WriterConfig,
    buffers: BTreeMap<String, BTreeMap<String, ChunkBuffer>>,
    index: BTreeMap<SeriesKey, SeriesIndexEntry>,
    current_device: Option<String>,
    buffered_bytes: usize,
    points_written: u64,
    chunks_flushed: u64,
    state: WriterState,
}

impl FileWriter<BufWriter<File>> {
    /// Creates or truncates `path` and writes the file head.
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::CannotCreateFile` if the file cannot be created
    /// or the head cannot be written.
    pub fn open(
        path: impl AsRef<Path>,
        registry: SchemaRegistry,
        config: WriterConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let cannot_create = |source: io::Error| TsFileError::CannotCreateFile {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(cannot_create)?;
        let sync_handle = file.try_clone().map_err(cannot_create)?;

        let mut writer = Self::from_writer(BufWriter::new(file), registry, config)
            .map_err(|e| match e {
                TsFileError::WriteFailure(source) => cannot_create(source),
                other => other,
            })?;
        writer.sync_handle = Some(sync_handle);
        writer.path = Some(path.to_path_buf());

        debug!(path = %path.display(), series = writer.registry.len(), "Opened TsFile writer");
        Ok(writer)
    }
}

impl<W: Write> FileWriter<W> {
    /// Starts a file on an arbitrary sink and writes the file head.
    ///
    /// `close` cannot fsync a generic sink; `sync_on_close` only applies to
    /// writers created with [`FileWriter::open`].
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::WriteFailure` if the head cannot be written.
    pub fn from_writer(sink: W, registry: SchemaRegistry, config: WriterConfig) -> Result<Self> {
        let mut out = PositionedWriter::new(sink);
        write_head(&mut out)?;

        let mut buffers: BTreeMap<String, BTreeMap<String, ChunkBuffer>> = BTreeMap::new();
        for (device, measurement, schema) in registry.iter() {
            buffers
                .entry(device.to_string())
                .or_default()
                .insert(measurement.to_string(), ChunkBuffer::new(*schema));
        }

        Ok(Self {
            out: Some(out),
            sync_handle: None,
            path: None,
            registry,
            config,
            buffers,
            index: BTreeMap::new(),
            current_device: None,
            buffered_bytes: 0,
            points_written: 0,
            chunks_flushed: 0,
            state: WriterState::Open,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Schemas this writer was opened with.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Writer configuration.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Progress counters.
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            points_written: self.points_written,
            chunks_flushed: self.chunks_flushed,
            bytes_written: self.out.as_ref().map_or(0, PositionedWriter::position),
            buffered_bytes: self.buffered_bytes,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == WriterState::Open {
            Ok(())
        } else {
            Err(TsFileError::HandleClosed)
        }
    }

    fn buffer(&self, device: &str, measurement: &str) -> Result<&ChunkBuffer> {
        self.buffers
            .get(device)
            .and_then(|m| m.get(measurement))
            .ok_or_else(|| TsFileError::unknown_series(device, measurement))
    }

    /// Writes one point.
    ///
    /// May flush the series' chunk when it reaches a threshold, and other
    /// buffers when the global memory bound is exceeded.
    ///
    /// # Errors
    ///
    /// - `TsFileError::HandleClosed` unless the writer is open.
    /// - `TsFileError::UnknownSeries` if the series is not in the registry.
    /// - `TsFileError::TypeMismatch` if the value's type differs from the schema.
    /// - `TsFileError::OutOfOrderTimestamp` if `timestamp` is not after the
    ///   series' last accepted timestamp.
    ///
    /// None of the above modify the writer. An I/O error during a triggered
    /// flush aborts the writer.
    pub fn write(
        &mut self,
        device: &str,
        measurement: &str,
        timestamp: i64,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.ensure_open()?;

        let buffer = self
            .buffers
            .get_mut(device)
            .and_then(|m| m.get_mut(measurement))
            .ok_or_else(|| TsFileError::unknown_series(device, measurement))?;
        self.buffered_bytes += buffer.append(timestamp, value.into())?;
        self.points_written += 1;

        if buffer.is_full(&self.config) {
            self.flush_series(device, measurement)?;
        }
        self.relieve_pressure()
    }

    /// Writes several measurements of one device at the same timestamp.
    ///
    /// Every field is validated before any is buffered, so on error nothing
    /// has been written. Naming a measurement twice in one record fails with
    /// `TsFileError::OutOfOrderTimestamp`.
    ///
    /// # Errors
    ///
    /// Same as [`FileWriter::write`].
    pub fn write_record<'a, I, V>(&mut self, device: &str, timestamp: i64, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<Value>,
    {
        self.ensure_open()?;

        let fields: Vec<(&str, Value)> = fields
            .into_iter()
            .map(|(measurement, value)| (measurement, value.into()))
            .collect();
        for (i, (measurement, value)) in fields.iter().enumerate() {
            self.buffer(device, measurement)?.check(timestamp, value)?;
            if fields[..i].iter().any(|(m, _)| m == measurement) {
                return Err(TsFileError::OutOfOrderTimestamp {
                    last: timestamp,
                    got: timestamp,
                });
            }
        }

        let mut full = Vec::new();
        for (measurement, value) in fields {
            let buffer = self
                .buffers
                .get_mut(device)
                .and_then(|m| m.get_mut(measurement))
                .ok_or_else(|| TsFileError::unknown_series(device, measurement))?;
            self.buffered_bytes += buffer.append(timestamp, value)?;
            self.points_written += 1;
            if buffer.is_full(&self.config) {
                full.push(measurement);
            }
        }
        for measurement in full {
            self.flush_series(device, measurement)?;
        }
        self.relieve_pressure()
    }

    /// Flushes every non-empty buffer, by device then measurement, without
    /// sealing the file.
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::HandleClosed` unless the writer is open. An I/O
    /// error aborts the writer.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flush_all()
    }

    fn flush_all(&mut self) -> Result<()> {
        let pending: Vec<(String, String)> = self
            .buffers
            .iter()
            .flat_map(|(device, measurements)| {
                measurements
                    .iter()
                    .filter(|(_, b)| !b.is_empty())
                    .map(move |(measurement, _)| (device.clone(), measurement.clone()))
            })
            .collect();
        for (device, measurement) in pending {
            self.flush_series(&device, &measurement)?;
        }
        Ok(())
    }

    fn flush_series(&mut self, device: &str, measurement: &str) -> Result<()> {
        let result = self.write_chunk(device, measurement);
        if let Err(e) = &result {
            self.fail(e);
        }
        result
    }

    fn write_chunk(&mut self, device: &str, measurement: &str) -> Result<()> {
        let out = self.out.as_mut().ok_or(TsFileError::HandleClosed)?;
        let Some(buffer) = self
            .buffers
            .get_mut(device)
            .and_then(|m| m.get_mut(measurement))
        else {
            return Ok(());
        };
        if buffer.is_empty() {
            return Ok(());
        }

        if self.current_device.as_deref() != Some(device) {
            let mut marker = Vec::with_capacity(device.len() + 2);
            marker.push(CHUNK_GROUP_MARKER);
            write_str(&mut marker, device)?;
            out.write_all(&marker)?;
            self.current_device = Some(device.to_string());
        }

        let released = buffer.raw_bytes();
        let Some(entry) = buffer.flush(measurement, &mut ChunkWriter::new(out))? else {
            return Ok(());
        };
        self.buffered_bytes -= released;
        self.chunks_flushed += 1;

        debug!(
            device,
            measurement,
            points = entry.statistics.count,
            offset = entry.offset,
            "Flushed chunk"
        );

        let key = SeriesKey::new(device, measurement);
        match self.index.get_mut(&key) {
            Some(series) => series.push(entry)?,
            None => {
                let series = SeriesIndexEntry::new(device, measurement, entry);
                self.index.insert(key, series);
            }
        }
        Ok(())
    }

    fn largest_buffer(&self) -> Option<(String, String)> {
        let mut largest: Option<(&str, &str, usize)> = None;
        for (device, measurements) in &self.buffers {
            for (measurement, buffer) in measurements {
                let size = buffer.raw_bytes();
                if size > 0 && largest.map_or(true, |(_, _, s)| size > s) {
                    largest = Some((device.as_str(), measurement.as_str(), size));
                }
            }
        }
        largest.map(|(d, m, _)| (d.to_string(), m.to_string()))
    }

    fn relieve_pressure(&mut self) -> Result<()> {
        trace!(
            buffered = self.buffered_bytes,
            limit = self.config.max_buffered_bytes,
            "Memory check"
        );
        if self.buffered_bytes <= self.config.max_buffered_bytes {
            return Ok(());
        }

        warn!(
            buffered = self.buffered_bytes,
            limit = self.config.max_buffered_bytes,
            policy = ?self.config.pressure_policy,
            "Buffered bytes over limit, flushing"
        );
        match self.config.pressure_policy {
            PressurePolicy::FlushAll => self.flush_all(),
            PressurePolicy::FlushLargest => {
                while self.buffered_bytes > self.config.max_buffered_bytes {
                    let Some((device, measurement)) = self.largest_buffer() else {
                        break;
                    };
                    self.flush_series(&device, &measurement)?;
                }
                Ok(())
            }
        }
    }

    /// Flushes every buffer, writes the footer and seals the file.
    ///
    /// Buffers are flushed by device, then measurement, both lexicographic.
    ///
    /// # Errors
    ///
    /// - `TsFileError::AlreadyClosed` if the writer is already closed.
    /// - `TsFileError::HandleClosed` if the writer was aborted.
    /// - `TsFileError::WriteFailure` on I/O failure; the writer is aborted and
    ///   the file is left without its trailing magic.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            WriterState::Open => {}
            WriterState::Closed => return Err(TsFileError::AlreadyClosed),
            WriterState::Closing | WriterState::Aborted => return Err(TsFileError::HandleClosed),
        }

        self.state = WriterState::Closing;
        match self.seal() {
            Ok(()) => {
                self.state = WriterState::Closed;
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn build_footer(&mut self) -> FileFooter {
        let series: Vec<SeriesIndexEntry> = std::mem::take(&mut self.index).into_values().collect();
        let mut bloom = BloomFilter::new(series.len(), self.config.bloom_filter_error_rate);
        for entry in &series {
            bloom.insert(&entry.device, &entry.measurement);
        }
        FileFooter {
            schemas: self.registry.clone(),
            series,
            bloom,
        }
    }

    fn seal(&mut self) -> Result<()> {
        self.flush_all()?;

        let footer = self.build_footer();
        let mut body = Vec::new();
        footer.write_to(&mut body)?;
        let footer_len = u32::try_from(body.len()).map_err(|_| {
            TsFileError::WriteFailure(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("footer of {} bytes is too large", body.len()),
            ))
        })?;

        let out = self.out.as_mut().ok_or(TsFileError::HandleClosed)?;
        out.write_all(&body)?;

        // Checksum covers everything up to and including the footer
        let tail = Tail {
            file_crc32: out.checksum(),
            footer_len,
        };
        let mut tail_buf = Vec::with_capacity(crate::format::TAIL_SIZE);
        tail.write_to(&mut tail_buf)?;
        out.write_all(&tail_buf)?;
        out.flush()?;

        if self.config.sync_on_close {
            if let Some(file) = self.sync_handle.take() {
                file.sync_all()?;
            }
        }

        debug!(
            path = ?self.path,
            series = footer.series.len(),
            chunks = footer.chunk_count(),
            bytes = out.position(),
            "Sealed TsFile"
        );
        Ok(())
    }

    fn fail(&mut self, error: &TsFileError) {
        if self.state.is_terminal() {
            return;
        }
        warn!(path = ?self.path, error = %error, "TsFile writer aborted after error");
        self.release();
    }

    fn release(&mut self) {
        self.state = WriterState::Aborted;
        self.buffers.clear();
        self.index.clear();
        self.buffered_bytes = 0;
        self.sync_handle = None;
        if let Some(mut out) = self.out.take() {
            // Pending bytes are useless without a footer; errors are irrelevant.
            let _ = out.flush();
        }
    }

    /// Abandons the file without writing a footer.
    ///
    /// The sink is dropped and the file is left unsealed. Calling `abort` on a
    /// closed or aborted writer does nothing.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        warn!(path = ?self.path, buffered = self.buffered_bytes, "Aborting TsFile writer");
        self.release();
    }

    /// Returns the sink after a successful close.
    ///
    /// Returns `None` if the writer was aborted, which drops the sink.
    pub fn into_inner(mut self) -> Option<W> {
        self.out.take().map(PositionedWriter::into_inner)
    }
}

impl<W: Write> Drop for FileWriter<W> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            warn!(
                path = ?self.path,
                buffered = self.buffered_bytes,
                "TsFile writer dropped without close, file left unsealed"
            );
            self.state = WriterState::Aborted;
        }
    }
}
