//! Per-chunk and per-series statistics.
//!
//! Statistics are computed when a chunk is flushed, stored in the chunk
//! header and again in the footer index, and merged per series so a reader
//! can prune whole series without touching chunk payloads.

use crate::error::{Result, TsFileError};
use crate::types::{Column, DataType, Value};
use std::fmt::Debug;
use std::io::{self, Read, Write};

/// Fixed-width little-endian serialization.
pub trait LeBytes: Sized {
    /// Writes the value in little-endian order.
    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()>;
    /// Reads a value in little-endian order.
    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self>;
}

macro_rules! impl_le_bytes {
    ($($t:ty),*) => {$(
        impl LeBytes for $t {
            fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
                writer.write_all(&self.to_le_bytes())
            }

            fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                reader.read_exact(&mut buf)?;
                Ok(<$t>::from_le_bytes(buf))
            }
        }
    )*};
}

impl_le_bytes!(i32, i64, u64, f32, f64);

/// A numeric type that can be summarized with min, max and sum.
pub trait SummaryValue: Copy + PartialEq + Debug + LeBytes {
    /// Accumulator type for the running sum.
    type Sum: Copy + PartialEq + Debug + Default + LeBytes + std::ops::Add<Output = Self::Sum>;

    /// Smaller of two values. Floats ignore a NaN operand.
    fn lesser(self, other: Self) -> Self;
    /// Larger of two values. Floats ignore a NaN operand.
    fn greater(self, other: Self) -> Self;
    /// Converts the value into the sum accumulator.
    fn widen(self) -> Self::Sum;
}

macro_rules! impl_summary_value {
    ($($t:ty => $s:ty),*) => {$(
        impl SummaryValue for $t {
            type Sum = $s;

            fn lesser(self, other: Self) -> Self {
                self.min(other)
            }

            fn greater(self, other: Self) -> Self {
                self.max(other)
            }

            fn widen(self) -> $s {
                self as $s
            }
        }
    )*};
}

impl_summary_value!(i32 => i64, i64 => f64, f32 => f64, f64 => f64);

/// Min, max, first, last and sum of a numeric run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericSummary<T: SummaryValue> {
    /// Smallest value.
    pub min: T,
    /// Largest value.
    pub max: T,
    /// Value at the earliest timestamp.
    pub first: T,
    /// Value at the latest timestamp.
    pub last: T,
    /// Sum of all values.
    pub sum: T::Sum,
}

impl<T: SummaryValue> NumericSummary<T> {
    fn from_slice(values: &[T]) -> Option<Self> {
        let (&first, rest) = values.split_first()?;
        let mut summary = Self {
            min: first,
            max: first,
            first,
            last: first,
            sum: first.widen(),
        };
        for &v in rest {
            summary.min = summary.min.lesser(v);
            summary.max = summary.max.greater(v);
            summary.sum = summary.sum + v.widen();
            summary.last = v;
        }
        Some(summary)
    }

    /// Folds in a summary whose points all come after this one's.
    fn append(&mut self, later: &Self) {
        self.min = self.min.lesser(later.min);
        self.max = self.max.greater(later.max);
        self.sum = self.sum + later.sum;
        self.last = later.last;
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.min.write_le(writer)?;
        self.max.write_le(writer)?;
        self.first.write_le(writer)?;
        self.last.write_le(writer)?;
        self.sum.write_le(writer)
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            min: T::read_le(reader)?,
            max: T::read_le(reader)?,
            first: T::read_le(reader)?,
            last: T::read_le(reader)?,
            sum: <T::Sum as LeBytes>::read_le(reader)?,
        })
    }
}

/// Typed value summary of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueStatistics {
    /// Boolean run.
    Boolean {
        /// Value at the earliest timestamp.
        first: bool,
        /// Value at the latest timestamp.
        last: bool,
        /// Number of `true` values.
        true_count: u64,
    },
    /// INT32 run.
    Int32(NumericSummary<i32>),
    /// INT64 run.
    Int64(NumericSummary<i64>),
    /// FLOAT run.
    Float(NumericSummary<f32>),
    /// DOUBLE run.
    Double(NumericSummary<f64>),
    /// TEXT run.
    Text {
        /// Value at the earliest timestamp.
        first: String,
        /// Value at the latest timestamp.
        last: String,
    },
}

impl ValueStatistics {
    fn from_column(values: &Column) -> Option<Self> {
        Some(match values {
            Column::Boolean(v) => Self::Boolean {
                first: *v.first()?,
                last: *v.last()?,
                true_count: v.iter().filter(|&&b| b).count() as u64,
            },
            Column::Int32(v) => Self::Int32(NumericSummary::from_slice(v)?),
            Column::Int64(v) => Self::Int64(NumericSummary::from_slice(v)?),
            Column::Float(v) => Self::Float(NumericSummary::from_slice(v)?),
            Column::Double(v) => Self::Double(NumericSummary::from_slice(v)?),
            Column::Text(v) => Self::Text {
                first: v.first()?.clone(),
                last: v.last()?.clone(),
            },
        })
    }

    /// Data type the summary describes.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean { .. } => DataType::Boolean,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::Text { .. } => DataType::Text,
        }
    }
}

/// Statistics of one chunk, or of every chunk of a series once merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkStatistics {
    /// Number of points.
    pub count: u64,
    /// Earliest timestamp.
    pub start_time: i64,
    /// Latest timestamp.
    pub end_time: i64,
    /// Typed value summary.
    pub values: ValueStatistics,
}

impl ChunkStatistics {
    /// Summarizes parallel, time-ordered timestamp and value columns.
    ///
    /// Returns `None` for an empty run.
    pub fn from_columns(timestamps: &[i64], values: &Column) -> Option<Self> {
        Some(Self {
            count: timestamps.len() as u64,
            start_time: *timestamps.first()?,
            end_time: *timestamps.last()?,
            values: ValueStatistics::from_column(values)?,
        })
    }

    /// Data type the statistics describe.
    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    /// Smallest value, if the type is ordered.
    pub fn min_value(&self) -> Option<Value> {
        match &self.values {
            ValueStatistics::Int32(s) => Some(Value::Int32(s.min)),
            ValueStatistics::Int64(s) => Some(Value::Int64(s.min)),
            ValueStatistics::Float(s) => Some(Value::Float(s.min)),
            ValueStatistics::Double(s) => Some(Value::Double(s.min)),
            ValueStatistics::Boolean { .. } | ValueStatistics::Text { .. } => None,
        }
    }

    /// Largest value, if the type is ordered.
    pub fn max_value(&self) -> Option<Value> {
        match &self.values {
            ValueStatistics::Int32(s) => Some(Value::Int32(s.max)),
            ValueStatistics::Int64(s) => Some(Value::Int64(s.max)),
            ValueStatistics::Float(s) => Some(Value::Float(s.max)),
            ValueStatistics::Double(s) => Some(Value::Double(s.max)),
            ValueStatistics::Boolean { .. } | ValueStatistics::Text { .. } => None,
        }
    }

    /// Merges the statistics of a chunk written after this one.
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::TypeMismatch` if the two describe different types.
    pub fn merge(&mut self, later: &ChunkStatistics) -> Result<()> {
        match (&mut self.values, &later.values) {
            (
                ValueStatistics::Boolean {
                    last, true_count, ..
                },
                ValueStatistics::Boolean {
                    last: later_last,
                    true_count: later_true,
                    ..
                },
            ) => {
                *last = *later_last;
                *true_count += later_true;
            }
            (ValueStatistics::Int32(a), ValueStatistics::Int32(b)) => a.append(b),
            (ValueStatistics::Int64(a), ValueStatistics::Int64(b)) => a.append(b),
            (ValueStatistics::Float(a), ValueStatistics::Float(b)) => a.append(b),
            (ValueStatistics::Double(a), ValueStatistics::Double(b)) => a.append(b),
            (ValueStatistics::Text { last, .. }, ValueStatistics::Text { last: later_last, .. }) => {
                last.clone_from(later_last);
            }
            (mine, theirs) => {
                return Err(TsFileError::TypeMismatch {
                    expected: mine.data_type(),
                    actual: theirs.data_type(),
                })
            }
        }
        self.count += later.count;
        self.end_time = later.end_time;
        Ok(())
    }

    /// Writes the statistics using little-endian byte order.
    ///
    /// The data type is not written; it is known from the enclosing header.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        // Count (8 bytes)
        self.count.write_le(writer)?;
        // Start time (8 bytes)
        self.start_time.write_le(writer)?;
        // End time (8 bytes)
        self.end_time.write_le(writer)?;

        match &self.values {
            ValueStatistics::Boolean {
                first,
                last,
                true_count,
            } => {
                writer.write_all(&[*first as u8, *last as u8])?;
                true_count.write_le(writer)?;
            }
            ValueStatistics::Int32(s) => s.write_to(writer)?,
            ValueStatistics::Int64(s) => s.write_to(writer)?,
            ValueStatistics::Float(s) => s.write_to(writer)?,
            ValueStatistics::Double(s) => s.write_to(writer)?,
            ValueStatistics::Text { first, last } => {
                crate::format::write_str(writer, first)?;
                crate::format::write_str(writer, last)?;
            }
        }
        Ok(())
    }

    /// Reads statistics of `data_type` written by [`ChunkStatistics::write_to`].
    pub fn read_from<R: Read>(reader: &mut R, data_type: DataType) -> Result<Self> {
        let count = u64::read_le(reader)?;
        let start_time = i64::read_le(reader)?;
        let end_time = i64::read_le(reader)?;

        let values = match data_type {
            DataType::Boolean => {
                let mut flags = [0u8; 2];
                reader.read_exact(&mut flags)?;
                ValueStatistics::Boolean {
                    first: flags[0] != 0,
                    last: flags[1] != 0,
                    true_count: u64::read_le(reader)?,
                }
            }
            DataType::Int32 => ValueStatistics::Int32(NumericSummary::read_from(reader)?),
            DataType::Int64 => ValueStatistics::Int64(NumericSummary::read_from(reader)?),
            DataType::Float => ValueStatistics::Float(NumericSummary::read_from(reader)?),
            DataType::Double => ValueStatistics::Double(NumericSummary::read_from(reader)?),
            DataType::Text => ValueStatistics::Text {
                first: crate::format::read_str(reader)?,
                last: crate::format::read_str(reader)?,
            },
        };

        Ok(Self {
            count,
            start_time,
            end_time,
            values,
        })
    }
}
