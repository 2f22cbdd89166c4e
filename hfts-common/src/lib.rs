use std::time::Duration;

pub mod clock;
pub mod column;
pub mod common_config;
pub mod error;
pub mod format;
pub mod layout;
pub mod ledger;
pub mod point;
mod zstd_check;

pub use clock::{Clock, FixedClock, SystemClock};
pub use column::{decode_column, encode_column, ColumnValue};
pub use common_config::{ConfigSource, HfConfig, CONFIG, MIN_CHUNK_CAPACITY};
pub use error::{HfError, Result};
pub use format::{format_named, format_positional, ChunkNaming};
pub use layout::SessionLayout;
pub use ledger::{IndexRange, LedgerRecord, RangeLedger};
pub use point::{Point, PointBatch};
pub use zstd_check::{check_zstd, zstd_error_name};

/// Running performance counters of an ingest session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub batches: u64,
    pub points: u64,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub chunks: u64,
    pub compress_time: Duration,
}

impl IngestReport {
    /// Compressed size as a percentage of the raw column bytes.
    pub fn compression_ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        self.output_bytes as f64 * 100.0 / self.input_bytes as f64
    }

    /// Raw input MiB compressed per second of compression time.
    pub fn throughput_mib_s(&self) -> f64 {
        let secs = self.compress_time.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.input_bytes as f64 / (1024.0 * 1024.0) / secs
    }

    pub fn mean_batch_latency(&self) -> Duration {
        if self.batches == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.compress_time.as_secs_f64() / self.batches as f64)
    }
}
