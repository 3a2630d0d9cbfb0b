//! Every valid (data type, encoding, compression) combination through a file
//! and back.

mod common;

use common::parse;
use tsfile::compression::{compress, decompress};
use tsfile::encoding::{decode_points, encode_points};
use tsfile::{
    Compression, DataType, DeviceSchemaBuilder, Encoding, FileWriter, Point, SchemaRegistry,
    TsFileError, Value, WriterConfig,
};

const DATA_TYPES: [DataType; 6] = [
    DataType::Boolean,
    DataType::Int32,
    DataType::Int64,
    DataType::Float,
    DataType::Double,
    DataType::Text,
];

const ENCODINGS: [Encoding; 3] = [Encoding::Plain, Encoding::Ts2Diff, Encoding::Gorilla];

const COMPRESSIONS: [Compression; 5] = [
    Compression::Uncompressed,
    Compression::Snappy,
    Compression::Gzip,
    Compression::Lz4,
    Compression::Zstd,
];

/// Helper function to generate points with irregular intervals, negative
/// deltas in the values, and repeated values.
fn generate_points(data_type: DataType, count: usize) -> Vec<Point> {
    let mut ts = -5_000i64;
    (0..count)
        .map(|i| {
            ts += 1 + (i as i64 * 7919) % 13;
            let n = (i as i64 * 37) % 101 - 50;
            let value = match data_type {
                DataType::Boolean => Value::Boolean(i % 3 == 0),
                DataType::Int32 => Value::Int32(if i == 7 { i32::MIN } else { n as i32 * 1000 }),
                DataType::Int64 => Value::Int64(if i == 7 { i64::MAX } else { n * 1_000_000 }),
                DataType::Float => Value::Float(n as f32 / 3.0),
                DataType::Double => Value::Double((i as f64 * 0.1).sin() * 100.0),
                DataType::Text => Value::Text(format!("v{}", n.abs())),
            };
            Point { timestamp: ts, value }
        })
        .collect()
}

#[test]
fn test_every_combination_through_codecs() {
    let mut checked = 0;
    for data_type in DATA_TYPES {
        for encoding in ENCODINGS {
            if !encoding.supports(data_type) {
                let err = encode_points(data_type, encoding, &generate_points(data_type, 4));
                assert!(matches!(err, Err(TsFileError::EncodingTypeMismatch { .. })));
                continue;
            }
            for compression in COMPRESSIONS {
                let points = generate_points(data_type, 300);
                let page = encode_points(data_type, encoding, &points).unwrap();
                let packed = compress(compression, &page).unwrap();
                let unpacked = decompress(compression, &packed, page.len()).unwrap();
                assert_eq!(unpacked, page, "{data_type:?}/{encoding:?}/{compression:?}");

                let decoded = decode_points(data_type, encoding, &unpacked, points.len()).unwrap();
                assert_eq!(decoded, points, "{data_type:?}/{encoding:?}/{compression:?}");
                checked += 1;
            }
        }
    }
    // 6 types with PLAIN, 2 with TS_2DIFF, 4 with GORILLA
    assert_eq!(checked, 12 * COMPRESSIONS.len());
}

#[test]
fn test_every_combination_through_file() {
    let mut builder = DeviceSchemaBuilder::new();
    let mut series = Vec::new();
    for data_type in DATA_TYPES {
        for encoding in ENCODINGS {
            if !encoding.supports(data_type) {
                continue;
            }
            for compression in COMPRESSIONS {
                let name = format!("{data_type:?}_{encoding:?}_{compression:?}");
                builder = builder.measurement(name.clone(), data_type, encoding, compression);
                series.push((name, data_type));
            }
        }
    }
    let registry = SchemaRegistry::builder().device("dev", builder).build().unwrap();

    let config = WriterConfig::default().with_max_points_per_chunk(128);
    let mut writer = FileWriter::from_writer(Vec::new(), registry, config).unwrap();
    for (name, data_type) in &series {
        for point in generate_points(*data_type, 300) {
            writer.write("dev", name, point.timestamp, point.value).unwrap();
        }
    }
    writer.close().unwrap();

    let parsed = parse(&writer.into_inner().unwrap()).unwrap();
    for (name, data_type) in &series {
        let entry = parsed.footer.find("dev", name).unwrap();
        assert_eq!(entry.chunks.len(), 3, "{name}");
        assert_eq!(parsed.points("dev", name), generate_points(*data_type, 300), "{name}");
    }
}

#[test]
fn test_unsupported_combinations_rejected_at_definition() {
    let mut registry = SchemaRegistry::new();
    for data_type in DATA_TYPES {
        for encoding in ENCODINGS {
            let result = registry.define(
                format!("{data_type:?}"),
                format!("{encoding:?}"),
                data_type,
                encoding,
                Compression::Uncompressed,
            );
            if encoding.supports(data_type) {
                assert!(result.is_ok());
            } else {
                assert!(matches!(
                    result,
                    Err(TsFileError::UnsupportedCombination { .. })
                ));
            }
        }
    }
    assert_eq!(registry.len(), 12);
}
