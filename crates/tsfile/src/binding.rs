//! Handle-based surface for wrapper layers.
//!
//! Foreign callers cannot hold Rust references, so a [`Session`] hands out
//! opaque integer handles for schemas and writers. Ids come from one counter
//! and are never reused, which turns every use of a released, closed or
//! unknown handle into a checkable error.

use crate::config::WriterConfig;
use crate::error::{Result, TsFileError};
use crate::schema::{MeasurementSchema, SchemaRegistry, SeriesKey};
use crate::types::{Compression, DataType, Encoding, Value};
use crate::writer::FileWriter;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// Opaque handle to a series definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaHandle(u64);

/// Opaque handle to an open file writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriterHandle(u64);

impl SchemaHandle {
    /// Raw id, for passing across a foreign boundary.
    pub fn id(self) -> u64 {
        self.0
    }
}

impl WriterHandle {
    /// Raw id, for passing across a foreign boundary.
    pub fn id(self) -> u64 {
        self.0
    }
}

enum SchemaSlot {
    Live(SeriesKey, MeasurementSchema),
    Released,
}

enum WriterSlot {
    Live(Box<FileWriter<BufWriter<File>>>),
    Closed,
    Aborted,
}

/// Table of live schema and writer handles.
pub struct Session {
    next_id: u64,
    schemas: HashMap<u64, SchemaSlot>,
    writers: HashMap<u64, WriterSlot>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            schemas: HashMap::new(),
            writers: HashMap::new(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Defines a series.
    ///
    /// Duplicate pairs are detected when the handles are passed together to
    /// [`Session::open_writer`].
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::UnsupportedCombination` if `encoding` cannot
    /// encode `data_type`.
    pub fn create_schema(
        &mut self,
        device: &str,
        measurement: &str,
        data_type: DataType,
        encoding: Encoding,
        compression: Compression,
    ) -> Result<SchemaHandle> {
        let schema = MeasurementSchema::new(data_type, encoding, compression)?;
        let id = self.allocate_id();
        self.schemas
            .insert(id, SchemaSlot::Live(SeriesKey::new(device, measurement), schema));
        Ok(SchemaHandle(id))
    }

    /// Releases a schema handle.
    ///
    /// Writers already opened with the schema keep their own copy.
    ///
    /// # Errors
    ///
    /// - `TsFileError::DoubleRelease` if the handle was already released.
    /// - `TsFileError::HandleClosed` if the handle was never issued.
    pub fn release_schema(&mut self, handle: SchemaHandle) -> Result<()> {
        let slot = self
            .schemas
            .get_mut(&handle.0)
            .ok_or(TsFileError::HandleClosed)?;
        match slot {
            SchemaSlot::Live(..) => {
                *slot = SchemaSlot::Released;
                Ok(())
            }
            SchemaSlot::Released => Err(TsFileError::DoubleRelease(handle.0)),
        }
    }

    /// Opens a writer at `path` over the given schemas with default settings.
    ///
    /// # Errors
    ///
    /// See [`Session::open_writer_with_config`].
    pub fn open_writer(
        &mut self,
        path: impl AsRef<Path>,
        schemas: &[SchemaHandle],
    ) -> Result<WriterHandle> {
        self.open_writer_with_config(path, schemas, WriterConfig::default())
    }

    /// Opens a writer at `path` over the given schemas.
    ///
    /// # Errors
    ///
    /// - `TsFileError::HandleClosed` if a schema handle is released or unknown.
    /// - `TsFileError::DuplicateSeries` if two handles define the same series.
    /// - `TsFileError::CannotCreateFile` if the file cannot be created.
    pub fn open_writer_with_config(
        &mut self,
        path: impl AsRef<Path>,
        schemas: &[SchemaHandle],
        config: WriterConfig,
    ) -> Result<WriterHandle> {
        let mut registry = SchemaRegistry::new();
        for handle in schemas {
            match self.schemas.get(&handle.0) {
                Some(SchemaSlot::Live(key, schema)) => registry.insert(key.clone(), *schema)?,
                _ => return Err(TsFileError::HandleClosed),
            }
        }

        let writer = FileWriter::open(path, registry, config)?;
        let id = self.allocate_id();
        self.writers.insert(id, WriterSlot::Live(Box::new(writer)));
        debug!(writer = id, "Opened writer handle");
        Ok(WriterHandle(id))
    }

    fn live_writer(&mut self, handle: WriterHandle) -> Result<&mut FileWriter<BufWriter<File>>> {
        match self.writers.get_mut(&handle.0) {
            Some(WriterSlot::Live(writer)) => Ok(writer.as_mut()),
            _ => Err(TsFileError::HandleClosed),
        }
    }

    /// Writes one tagged value.
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::HandleClosed` for a closed, aborted or unknown
    /// writer, otherwise the errors of [`FileWriter::write`]. A write that
    /// aborts the underlying writer also retires the handle.
    pub fn write_point(
        &mut self,
        handle: WriterHandle,
        device: &str,
        measurement: &str,
        timestamp: i64,
        value: Value,
    ) -> Result<()> {
        let writer = self.live_writer(handle)?;
        let result = writer.write(device, measurement, timestamp, value);
        if writer.state().is_terminal() {
            self.writers.insert(handle.0, WriterSlot::Aborted);
        }
        result
    }

    /// Writes a BOOLEAN point.
    pub fn write_bool(
        &mut self,
        handle: WriterHandle,
        device: &str,
        measurement: &str,
        timestamp: i64,
        value: bool,
    ) -> Result<()> {
        self.write_point(handle, device, measurement, timestamp, Value::Boolean(value))
    }

    /// Writes an INT32 point.
    pub fn write_int32(
        &mut self,
        handle: WriterHandle,
        device: &str,
        measurement: &str,
        timestamp: i64,
        value: i32,
    ) -> Result<()> {
        self.write_point(handle, device, measurement, timestamp, Value::Int32(value))
    }

    /// Writes an INT64 point.
    pub fn write_int64(
        &mut self,
        handle: WriterHandle,
        device: &str,
        measurement: &str,
        timestamp: i64,
        value: i64,
    ) -> Result<()> {
        self.write_point(handle, device, measurement, timestamp, Value::Int64(value))
    }

    /// Writes a FLOAT point.
    pub fn write_float(
        &mut self,
        handle: WriterHandle,
        device: &str,
        measurement: &str,
        timestamp: i64,
        value: f32,
    ) -> Result<()> {
        self.write_point(handle, device, measurement, timestamp, Value::Float(value))
    }

    /// Writes a DOUBLE point.
    pub fn write_double(
        &mut self,
        handle: WriterHandle,
        device: &str,
        measurement: &str,
        timestamp: i64,
        value: f64,
    ) -> Result<()> {
        self.write_point(handle, device, measurement, timestamp, Value::Double(value))
    }

    /// Writes a TEXT point.
    pub fn write_text(
        &mut self,
        handle: WriterHandle,
        device: &str,
        measurement: &str,
        timestamp: i64,
        value: &str,
    ) -> Result<()> {
        self.write_point(handle, device, measurement, timestamp, Value::from(value))
    }

    /// Flushes and seals the file, then retires the handle.
    ///
    /// # Errors
    ///
    /// - `TsFileError::AlreadyClosed` if the handle was already closed.
    /// - `TsFileError::HandleClosed` if it was aborted or never issued.
    /// - `TsFileError::WriteFailure` on storage failure; the handle is then
    ///   aborted.
    pub fn close_writer(&mut self, handle: WriterHandle) -> Result<()> {
        let slot = self
            .writers
            .get_mut(&handle.0)
            .ok_or(TsFileError::HandleClosed)?;
        let WriterSlot::Live(writer) = slot else {
            return Err(match slot {
                WriterSlot::Closed => TsFileError::AlreadyClosed,
                _ => TsFileError::HandleClosed,
            });
        };

        let result = writer.close();
        *slot = if result.is_ok() {
            WriterSlot::Closed
        } else {
            WriterSlot::Aborted
        };
        debug!(writer = handle.0, ok = result.is_ok(), "Closed writer handle");
        result
    }

    /// Abandons the file and retires the handle. No-op on a retired handle.
    pub fn abort_writer(&mut self, handle: WriterHandle) {
        if let Some(slot) = self.writers.get_mut(&handle.0) {
            if let WriterSlot::Live(writer) = slot {
                writer.abort();
                *slot = WriterSlot::Aborted;
            }
        }
    }

    /// Number of writers not yet closed or aborted.
    pub fn live_writers(&self) -> usize {
        self.writers
            .values()
            .filter(|slot| matches!(slot, WriterSlot::Live(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_handles_are_never_reused() {
        let mut session = Session::new();
        let a = session
            .create_schema("d1", "s1", DataType::Int32, Encoding::Plain, Compression::Uncompressed)
            .unwrap();
        session.release_schema(a).unwrap();
        let b = session
            .create_schema("d1", "s1", DataType::Int32, Encoding::Plain, Compression::Uncompressed)
            .unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_release_twice() {
        let mut session = Session::new();
        let h = session
            .create_schema("d1", "s1", DataType::Int64, Encoding::Ts2Diff, Compression::Snappy)
            .unwrap();
        session.release_schema(h).unwrap();
        assert!(matches!(
            session.release_schema(h),
            Err(TsFileError::DoubleRelease(id)) if id == h.id()
        ));
    }

    #[test]
    fn test_unsupported_combination() {
        let mut session = Session::new();
        let result =
            session.create_schema("d1", "s1", DataType::Text, Encoding::Gorilla, Compression::Zstd);
        assert!(matches!(
            result,
            Err(TsFileError::UnsupportedCombination { .. })
        ));
    }

    #[test]
    fn test_released_schema_cannot_open() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        let h = session
            .create_schema("d1", "s1", DataType::Int32, Encoding::Plain, Compression::Uncompressed)
            .unwrap();
        session.release_schema(h).unwrap();
        let result = session.open_writer(dir.path().join("a.tsfile"), &[h]);
        assert!(matches!(result, Err(TsFileError::HandleClosed)));
    }

    #[test]
    fn test_duplicate_handles_rejected() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        let a = session
            .create_schema("d1", "s1", DataType::Int32, Encoding::Plain, Compression::Uncompressed)
            .unwrap();
        let b = session
            .create_schema("d1", "s1", DataType::Int64, Encoding::Plain, Compression::Uncompressed)
            .unwrap();
        let result = session.open_writer(dir.path().join("a.tsfile"), &[a, b]);
        assert!(matches!(result, Err(TsFileError::DuplicateSeries { .. })));
    }

    #[test]
    fn test_writer_lifecycle() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        let h = session
            .create_schema("d1", "s1", DataType::Int32, Encoding::Plain, Compression::Uncompressed)
            .unwrap();
        let w = session.open_writer(dir.path().join("a.tsfile"), &[h]).unwrap();
        session.release_schema(h).unwrap();
        assert_eq!(session.live_writers(), 1);

        session.write_int32(w, "d1", "s1", 1, 1).unwrap();
        assert!(matches!(
            session.write_int64(w, "d1", "s1", 2, 2),
            Err(TsFileError::TypeMismatch { .. })
        ));
        session.close_writer(w).unwrap();
        assert_eq!(session.live_writers(), 0);

        assert!(matches!(
            session.write_int32(w, "d1", "s1", 2, 2),
            Err(TsFileError::HandleClosed)
        ));
        assert!(matches!(
            session.close_writer(w),
            Err(TsFileError::AlreadyClosed)
        ));
    }

    #[test]
    fn test_abort_then_close() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        let h = session
            .create_schema("d1", "s1", DataType::Boolean, Encoding::Plain, Compression::Gzip)
            .unwrap();
        let w = session.open_writer(dir.path().join("a.tsfile"), &[h]).unwrap();
        session.write_bool(w, "d1", "s1", 1, true).unwrap();

        session.abort_writer(w);
        session.abort_writer(w);
        assert!(matches!(
            session.close_writer(w),
            Err(TsFileError::HandleClosed)
        ));
        assert!(matches!(
            session.write_bool(w, "d1", "s1", 2, false),
            Err(TsFileError::HandleClosed)
        ));
    }
}
