//! Benchmarks for the TsFile write path.
//!
//! Run with: cargo bench --package tsfile-writer
//!
//! ## Benchmark Categories
//!
//! - **Encoding**: PLAIN, TS_2DIFF and GORILLA page encoding
//! - **Compression**: payload compression per codec
//! - **File Writer**: in-memory and on-disk write throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;
use tsfile::compression::compress;
use tsfile::encoding::encode;
use tsfile::{
    Column, Compression, DataType, DeviceSchemaBuilder, Encoding, FileWriter, SchemaRegistry,
    WriterConfig,
};

/// Generate typical sensor data (regular intervals, slowly varying values).
fn generate_typical_timeseries(count: usize) -> (Vec<i64>, Vec<f64>) {
    let start_ts = 1_000_000_000_i64;
    let interval = 1_000_i64;

    let mut timestamps = Vec::with_capacity(count);
    let mut values = Vec::with_capacity(count);
    let mut value = 50.0;
    for i in 0..count {
        value += (i as f64 * 0.1).sin() * 0.1;
        timestamps.push(start_ts + (i as i64) * interval);
        values.push(value);
    }
    (timestamps, values)
}

fn registry(encoding: Encoding, compression: Compression) -> SchemaRegistry {
    SchemaRegistry::builder()
        .device(
            "root.bench.d1",
            DeviceSchemaBuilder::new()
                .measurement("temp", DataType::Double, encoding, compression)
                .measurement("count", DataType::Int64, Encoding::Ts2Diff, compression),
        )
        .build()
        .expect("valid schema")
}

fn bench_encode(c: &mut Criterion) {
    let (timestamps, values) = generate_typical_timeseries(10_000);
    let doubles = Column::Double(values);
    let longs = Column::Int64((0..10_000).collect());

    let mut group = c.benchmark_group("encode_10k");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("plain_double", |b| {
        b.iter(|| encode(Encoding::Plain, black_box(&timestamps), black_box(&doubles)))
    });
    group.bench_function("gorilla_double", |b| {
        b.iter(|| encode(Encoding::Gorilla, black_box(&timestamps), black_box(&doubles)))
    });
    group.bench_function("ts2diff_int64", |b| {
        b.iter(|| encode(Encoding::Ts2Diff, black_box(&timestamps), black_box(&longs)))
    });
    group.finish();
}

fn bench_compress(c: &mut Criterion) {
    let (timestamps, values) = generate_typical_timeseries(10_000);
    let page = encode(Encoding::Plain, &timestamps, &Column::Double(values)).expect("encode");

    let mut group = c.benchmark_group("compress_page");
    group.throughput(Throughput::Bytes(page.len() as u64));
    for kind in [
        Compression::Snappy,
        Compression::Gzip,
        Compression::Lz4,
        Compression::Zstd,
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{kind:?}")), &page, |b, page| {
            b.iter(|| compress(kind, black_box(page)))
        });
    }
    group.finish();
}

fn bench_write_in_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_in_memory");
    for size in [1_000usize, 10_000, 100_000].iter() {
        let (timestamps, values) = generate_typical_timeseries(*size);
        group.throughput(Throughput::Elements(*size as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut writer = FileWriter::from_writer(
                    Vec::new(),
                    registry(Encoding::Gorilla, Compression::Snappy),
                    WriterConfig::default(),
                )
                .expect("open");
                for (i, (ts, value)) in timestamps.iter().zip(&values).enumerate() {
                    writer.write("root.bench.d1", "temp", *ts, *value).expect("write");
                    writer.write("root.bench.d1", "count", *ts, i as i64).expect("write");
                }
                writer.close().expect("close");
                writer.into_inner()
            })
        });
    }
    group.finish();
}

fn bench_write_file(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("bench.tsfile");
    let (timestamps, values) = generate_typical_timeseries(100_000);

    let mut group = c.benchmark_group("write_file");
    group.throughput(Throughput::Elements(100_000));
    group.sample_size(20);
    group.bench_function("gorilla_lz4_100k", |b| {
        b.iter(|| {
            let config = WriterConfig::default()
                .with_max_points_per_chunk(8192)
                .with_sync_on_close(false);
            let mut writer = FileWriter::open(&path, registry(Encoding::Gorilla, Compression::Lz4), config)
                .expect("open");
            for (ts, value) in timestamps.iter().zip(&values) {
                writer.write("root.bench.d1", "temp", *ts, *value).expect("write");
            }
            writer.close().expect("close");
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    // Encoding
    bench_encode,
    // Compression
    bench_compress,
    // File Writer
    bench_write_in_memory,
    bench_write_file,
);
criterion_main!(benches);
