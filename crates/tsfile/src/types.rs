//! Core value and tag types shared by every stage of the write path.
//!
//! The integer codes of [`DataType`], [`Encoding`] and [`Compression`] are part
//! of the on-disk format and are never reused for a different meaning.

/// Data type of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DataType {
    /// `bool`
    Boolean = 0,
    /// `i32`
    Int32 = 1,
    /// `i64`
    Int64 = 2,
    /// `f32`
    Float = 3,
    /// `f64`
    Double = 4,
    /// UTF-8 string
    Text = 5,
}

impl DataType {
    /// Converts a u8 tag to a data type.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Boolean),
            1 => Some(Self::Int32),
            2 => Some(Self::Int64),
            3 => Some(Self::Float),
            4 => Some(Self::Double),
            5 => Some(Self::Text),
            _ => None,
        }
    }

    /// Fixed serialized width of one value, or `None` for variable-width text.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Boolean => Some(1),
            Self::Int32 | Self::Float => Some(4),
            Self::Int64 | Self::Double => Some(8),
            Self::Text => None,
        }
    }
}

/// Value encoding of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Encoding {
    /// Fixed-width values, no transform.
    #[default]
    Plain = 0,
    /// First value verbatim, then zig-zag varint differences.
    Ts2Diff = 4,
    /// Delta-of-delta times and XOR-compressed values.
    Gorilla = 8,
}

impl Encoding {
    /// Converts a u8 tag to an encoding.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Plain),
            4 => Some(Self::Ts2Diff),
            8 => Some(Self::Gorilla),
            _ => None,
        }
    }

    /// Returns true if this encoding can encode values of `data_type`.
    pub fn supports(self, data_type: DataType) -> bool {
        match self {
            Self::Plain => true,
            Self::Ts2Diff => matches!(data_type, DataType::Int32 | DataType::Int64),
            Self::Gorilla => matches!(
                data_type,
                DataType::Int32 | DataType::Int64 | DataType::Float | DataType::Double
            ),
        }
    }
}

/// Compression applied to an encoded chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Compression {
    /// Identity transform.
    #[default]
    Uncompressed = 0,
    /// Raw snappy.
    Snappy = 1,
    /// Gzip stream.
    Gzip = 2,
    /// LZ4 block with prepended size.
    Lz4 = 7,
    /// Zstandard.
    Zstd = 8,
}

impl Compression {
    /// Converts a u8 tag to a compression kind.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Uncompressed),
            1 => Some(Self::Snappy),
            2 => Some(Self::Gzip),
            7 => Some(Self::Lz4),
            8 => Some(Self::Zstd),
            _ => None,
        }
    }
}

/// A single typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value.
    Boolean(bool),
    /// 32-bit integer value.
    Int32(i32),
    /// 64-bit integer value.
    Int64(i64),
    /// 32-bit float value.
    Float(f32),
    /// 64-bit float value.
    Double(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Returns the data type carried by this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::Text(_) => DataType::Text,
        }
    }

    /// Bytes this value occupies in an unencoded column.
    pub fn raw_size(&self) -> usize {
        match self {
            Self::Text(s) => s.len() + 4,
            other => other.data_type().fixed_width().unwrap_or(0),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A (timestamp, value) pair belonging to one series.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Timestamp of the point.
    pub timestamp: i64,
    /// Typed value of the point.
    pub value: Value,
}

impl Point {
    /// Creates a new point.
    pub fn new(timestamp: i64, value: impl Into<Value>) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }
}

/// A homogeneous run of values in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Boolean values.
    Boolean(Vec<bool>),
    /// 32-bit integer values.
    Int32(Vec<i32>),
    /// 64-bit integer values.
    Int64(Vec<i64>),
    /// 32-bit float values.
    Float(Vec<f32>),
    /// 64-bit float values.
    Double(Vec<f64>),
    /// Text values.
    Text(Vec<String>),
}

impl Column {
    /// Creates an empty column for `data_type`.
    pub fn new(data_type: DataType) -> Self {
        match data_type {
            DataType::Boolean => Self::Boolean(Vec::new()),
            DataType::Int32 => Self::Int32(Vec::new()),
            DataType::Int64 => Self::Int64(Vec::new()),
            DataType::Float => Self::Float(Vec::new()),
            DataType::Double => Self::Double(Vec::new()),
            DataType::Text => Self::Text(Vec::new()),
        }
    }

    /// Data type of the column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::Text(_) => DataType::Text,
        }
    }

    /// Number of values in the column.
    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    /// Returns true if the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value at `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Self::Boolean(v) => v.get(index).map(|&x| Value::Boolean(x)),
            Self::Int32(v) => v.get(index).map(|&x| Value::Int32(x)),
            Self::Int64(v) => v.get(index).map(|&x| Value::Int64(x)),
            Self::Float(v) => v.get(index).map(|&x| Value::Float(x)),
            Self::Double(v) => v.get(index).map(|&x| Value::Double(x)),
            Self::Text(v) => v.get(index).map(|x| Value::Text(x.clone())),
        }
    }

    /// Appends a value. Returns the value back if its type does not match.
    pub fn push(&mut self, value: Value) -> std::result::Result<(), Value> {
        match (self, value) {
            (Self::Boolean(v), Value::Boolean(x)) => v.push(x),
            (Self::Int32(v), Value::Int32(x)) => v.push(x),
            (Self::Int64(v), Value::Int64(x)) => v.push(x),
            (Self::Float(v), Value::Float(x)) => v.push(x),
            (Self::Double(v), Value::Double(x)) => v.push(x),
            (Self::Text(v), Value::Text(x)) => v.push(x),
            (_, other) => return Err(other),
        }
        Ok(())
    }

    /// Moves the contents out, leaving an empty column of the same type.
    pub fn take(&mut self) -> Self {
        let data_type = self.data_type();
        std::mem::replace(self, Self::new(data_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_codes_are_stable() {
        assert_eq!(DataType::Boolean as u8, 0);
        assert_eq!(DataType::Text as u8, 5);
        assert_eq!(Encoding::Ts2Diff as u8, 4);
        assert_eq!(Encoding::Gorilla as u8, 8);
        assert_eq!(Compression::Lz4 as u8, 7);
        assert_eq!(Compression::Zstd as u8, 8);
    }

    #[test]
    fn test_from_u8() {
        for t in 0..=5u8 {
            assert_eq!(DataType::from_u8(t).map(|d| d as u8), Some(t));
        }
        assert_eq!(DataType::from_u8(6), None);
        assert_eq!(Encoding::from_u8(1), None);
        assert_eq!(Compression::from_u8(3), None);
        assert_eq!(Compression::from_u8(1), Some(Compression::Snappy));
    }

    #[test]
    fn test_encoding_support() {
        assert!(Encoding::Plain.supports(DataType::Text));
        assert!(Encoding::Ts2Diff.supports(DataType::Int32));
        assert!(!Encoding::Ts2Diff.supports(DataType::Double));
        assert!(Encoding::Gorilla.supports(DataType::Float));
        assert!(!Encoding::Gorilla.supports(DataType::Boolean));
    }

    #[test]
    fn test_column_push_rejects_wrong_type() {
        let mut col = Column::new(DataType::Int32);
        assert!(col.push(Value::Int32(1)).is_ok());
        assert_eq!(col.push(Value::Int64(2)), Err(Value::Int64(2)));
        assert_eq!(col.len(), 1);
        assert_eq!(col.get(0), Some(Value::Int32(1)));

        let taken = col.take();
        assert_eq!(taken.len(), 1);
        assert!(col.is_empty());
        assert_eq!(col.data_type(), DataType::Int32);
    }
}
