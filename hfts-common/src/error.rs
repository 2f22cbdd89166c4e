use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HfError>;

#[derive(Debug, Error)]
pub enum HfError {
    /// zstd could not allocate or configure a context.
    #[error("cannot create zstd {0} context")]
    CodecInit(&'static str),

    #[error("zstd stream error: {0}")]
    CodecStream(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("schema mismatch: {timestamps} timestamps vs {values} values")]
    SchemaMismatch { timestamps: usize, values: usize },

    /// Session operation called in the wrong state.
    #[error("{op} is not allowed while the session is {state}")]
    Sequence { op: &'static str, state: &'static str },

    #[error("column buffer of {len} bytes is not a multiple of {width}")]
    ColumnLength { len: usize, width: usize },

    #[error("batch mixes series names: expected {expected:?}, found {found:?}")]
    MixedBatch { expected: String, found: String },

    #[error("invalid index range [{start}, {end})")]
    InvalidRange { start: u64, end: u64 },

    #[error("range [{start}, {end}) for {prefix:?} lies before the last recorded range [{last_start}, {last_end})")]
    RangeOrder {
        prefix: String,
        start: u64,
        end: u64,
        last_start: u64,
        last_end: u64,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("ledger record error: {0}")]
    Record(#[from] serde_json::Error),
}

impl HfError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HfError::Io {
            path: path.into(),
            source,
        }
    }
}
