//! Schema registry: the declared type, encoding and compression of every series.
//!
//! A registry is built before a writer opens and is moved into it; from then
//! on it is read-only, so a series' schema cannot change while its file is
//! being written.

use crate::error::{Result, TsFileError};
use crate::format::{read_str, read_u8, write_str};
use crate::types::{Compression, DataType, Encoding};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};

/// Identity of a series: (device, measurement).
///
/// Ordering is lexicographic by device, then measurement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    /// Device identifier.
    pub device: String,
    /// Measurement identifier.
    pub measurement: String,
}

impl SeriesKey {
    /// Creates a new series key.
    pub fn new(device: impl Into<String>, measurement: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            measurement: measurement.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.device, self.measurement)
    }
}

/// Declared storage properties of one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeasurementSchema {
    /// Value data type.
    pub data_type: DataType,
    /// Value encoding.
    pub encoding: Encoding,
    /// Payload compression.
    pub compression: Compression,
}

impl MeasurementSchema {
    /// Creates a schema, checking that `encoding` supports `data_type`.
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::UnsupportedCombination` otherwise.
    pub fn new(data_type: DataType, encoding: Encoding, compression: Compression) -> Result<Self> {
        if !encoding.supports(data_type) {
            return Err(TsFileError::UnsupportedCombination {
                data_type,
                encoding,
            });
        }
        Ok(Self {
            data_type,
            encoding,
            compression,
        })
    }

    /// Writes the three tags (3 bytes).
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[
            self.data_type as u8,
            self.encoding as u8,
            self.compression as u8,
        ])?;
        Ok(())
    }

    /// Reads the three tags.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
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
        Ok(Self {
            data_type,
            encoding,
            compression,
        })
    }
}

pub(crate) fn read_data_type<R: Read>(reader: &mut R) -> Result<DataType> {
    let tag = read_u8(reader)?;
    DataType::from_u8(tag).ok_or(TsFileError::UnknownTag {
        kind: "data type",
        tag,
    })
}

/// Registry of every series a file may contain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRegistry {
    devices: BTreeMap<String, BTreeMap<String, MeasurementSchema>>,
    len: usize,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fluent builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Defines a series.
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::DuplicateSeries` if the pair is already defined and
    /// `TsFileError::UnsupportedCombination` if `encoding` cannot encode
    /// `data_type`. Neither leaves the registry modified.
    pub fn define(
        &mut self,
        device: impl Into<String>,
        measurement: impl Into<String>,
        data_type: DataType,
        encoding: Encoding,
        compression: Compression,
    ) -> Result<SeriesKey> {
        let key = SeriesKey::new(device, measurement);
        let schema = MeasurementSchema::new(data_type, encoding, compression)?;
        self.insert(key.clone(), schema)?;
        Ok(key)
    }

    /// Inserts an already validated schema.
    pub fn insert(&mut self, key: SeriesKey, schema: MeasurementSchema) -> Result<()> {
        if self.get(&key.device, &key.measurement).is_some() {
            return Err(TsFileError::DuplicateSeries {
                device: key.device,
                measurement: key.measurement,
            });
        }
        self.devices
            .entry(key.device)
            .or_default()
            .insert(key.measurement, schema);
        self.len += 1;
        Ok(())
    }

    /// Looks up the schema of a series.
    pub fn get(&self, device: &str, measurement: &str) -> Option<&MeasurementSchema> {
        self.devices.get(device)?.get(measurement)
    }

    /// Iterates every series in (device, measurement) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &MeasurementSchema)> + '_ {
        self.devices.iter().flat_map(|(device, measurements)| {
            measurements
                .iter()
                .map(move |(measurement, schema)| (device.as_str(), measurement.as_str(), schema))
        })
    }

    /// Iterates device ids in order.
    pub fn devices(&self) -> impl Iterator<Item = &str> + '_ {
        self.devices.keys().map(String::as_str)
    }

    /// Number of defined series.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no series is defined.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writes the schema list (count, then device, measurement and tags per series).
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&(self.len as u32).to_le_bytes())?;
        for (device, measurement, schema) in self.iter() {
            write_str(writer, device)?;
            write_str(writer, measurement)?;
            schema.write_to(writer)?;
        }
        Ok(())
    }

    /// Reads a schema list written by [`SchemaRegistry::write_to`].
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let count = crate::format::read_u32(reader)?;
        let mut registry = Self::new();
        for _ in 0..count {
            let device = read_str(reader)?;
            let measurement = read_str(reader)?;
            let schema = MeasurementSchema::read_from(reader)?;
            registry.insert(SeriesKey::new(device, measurement), schema)?;
        }
        Ok(registry)
    }
}

/// Fluent builder for a [`SchemaRegistry`], one device at a time.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    registry: SchemaRegistry,
    error: Option<TsFileError>,
}

impl SchemaBuilder {
    /// Adds every measurement of a device.
    pub fn device(mut self, device: impl Into<String>, measurements: DeviceSchemaBuilder) -> Self {
        if self.error.is_some() {
            return self;
        }
        let device = device.into();
        for (measurement, data_type, encoding, compression) in measurements.measurements {
            if let Err(e) =
                self.registry
                    .define(device.clone(), measurement, data_type, encoding, compression)
            {
                self.error = Some(e);
                break;
            }
        }
        self
    }

    /// Finishes the registry, reporting the first definition error.
    pub fn build(self) -> Result<SchemaRegistry> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.registry),
        }
    }
}

/// Collects the measurements of one device for [`SchemaBuilder::device`].
#[derive(Debug, Default)]
pub struct DeviceSchemaBuilder {
    measurements: Vec<(String, DataType, Encoding, Compression)>,
}

impl DeviceSchemaBuilder {
    /// Creates an empty device builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a measurement.
    pub fn measurement(
        mut self,
        measurement: impl Into<String>,
        data_type: DataType,
        encoding: Encoding,
        compression: Compression,
    ) -> Self {
        self.measurements
            .push((measurement.into(), data_type, encoding, compression));
        self
    }
}
