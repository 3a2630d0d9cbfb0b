//! Writer configuration.

/// Default maximum number of points in one chunk.
pub const DEFAULT_MAX_POINTS_PER_CHUNK: usize = 1024 * 1024;

/// Default maximum raw (unencoded) size of one chunk (64 MB).
pub const DEFAULT_MAX_CHUNK_RAW_BYTES: usize = 64 * 1024 * 1024;

/// Default bound on raw bytes buffered across all series (128 MB).
pub const DEFAULT_MAX_BUFFERED_BYTES: usize = 128 * 1024 * 1024;

/// Default false-positive rate of the footer Bloom filter.
pub const DEFAULT_BLOOM_FILTER_ERROR_RATE: f64 = 0.05;

/// What to flush when buffered bytes exceed [`WriterConfig::max_buffered_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressurePolicy {
    /// Flush the largest buffers until usage is back under the bound.
    #[default]
    FlushLargest,
    /// Flush every non-empty buffer.
    FlushAll,
}

/// Configuration for a [`crate::FileWriter`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    /// A chunk is flushed once it holds this many points.
    pub max_points_per_chunk: usize,
    /// A chunk is flushed once its raw size reaches this many bytes.
    pub max_chunk_raw_bytes: usize,
    /// Bound on raw bytes buffered across every series.
    pub max_buffered_bytes: usize,
    /// Flush strategy when `max_buffered_bytes` is exceeded.
    pub pressure_policy: PressurePolicy,
    /// Whether `close` fsyncs the file.
    pub sync_on_close: bool,
    /// False-positive rate of the footer Bloom filter.
    pub bloom_filter_error_rate: f64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_points_per_chunk: DEFAULT_MAX_POINTS_PER_CHUNK,
            max_chunk_raw_bytes: DEFAULT_MAX_CHUNK_RAW_BYTES,
            max_buffered_bytes: DEFAULT_MAX_BUFFERED_BYTES,
            pressure_policy: PressurePolicy::default(),
            sync_on_close: true,
            bloom_filter_error_rate: DEFAULT_BLOOM_FILTER_ERROR_RATE,
        }
    }
}

impl WriterConfig {
    /// Sets the maximum number of points per chunk (at least 1).
    pub fn with_max_points_per_chunk(mut self, points: usize) -> Self {
        self.max_points_per_chunk = points.max(1);
        self
    }

    /// Sets the maximum raw size of a chunk (at least 1 byte).
    pub fn with_max_chunk_raw_bytes(mut self, bytes: usize) -> Self {
        self.max_chunk_raw_bytes = bytes.max(1);
        self
    }

    /// Sets the global bound on buffered bytes.
    pub fn with_max_buffered_bytes(mut self, bytes: usize) -> Self {
        self.max_buffered_bytes = bytes;
        self
    }

    /// Sets the memory pressure policy.
    pub fn with_pressure_policy(mut self, policy: PressurePolicy) -> Self {
        self.pressure_policy = policy;
        self
    }

    /// Sets whether `close` fsyncs the file.
    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    /// Sets the Bloom filter false-positive rate.
    pub fn with_bloom_filter_error_rate(mut self, rate: f64) -> Self {
        self.bloom_filter_error_rate = rate;
        self
    }
}
