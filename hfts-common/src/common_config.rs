use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::str::FromStr;

use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{HfError, Result};

/// Smallest chunk capacity that always leaves room for a frame header,
/// the end-of-frame epilogue and at least one input byte.
pub const MIN_CHUNK_CAPACITY: usize = 256;

pub const MAX_COMPRESSION_LEVEL: i32 = 22;

/// Key-value lookup the configuration is read from.
pub trait ConfigSource {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HfConfig {
    pub compression_level: i32,
    pub output_buffer_size: usize,
    pub max_chunk_file_size: usize,
    pub data_dir: PathBuf,
    pub meta_dir: PathBuf,
    pub file_name_format: String,
    pub timestamps_prefix: String,
    pub values_prefix: String,
    pub index_width: usize,
    pub time_unit: String,
    /// Delete the chunk files of a failed compress call instead of leaving them for inspection.
    pub remove_partial_chunks: bool,
    /// Compress the timestamp and value columns on two rayon tasks.
    pub parallel_columns: bool,
}

impl Default for HfConfig {
    fn default() -> Self {
        HfConfig {
            compression_level: 3,
            output_buffer_size: 1024 * 1024,
            max_chunk_file_size: 1024 * 1024,
            data_dir: PathBuf::from("data"),
            meta_dir: PathBuf::from("meta"),
            file_name_format: "{prefix}_{index}.zst".to_string(),
            timestamps_prefix: "timestamps".to_string(),
            values_prefix: "values".to_string(),
            index_width: 10,
            time_unit: "ns".to_string(),
            remove_partial_chunks: false,
            parallel_columns: false,
        }
    }
}

pub static CONFIG: Lazy<HfConfig> = Lazy::new(HfConfig::default);

impl HfConfig {
    /// Overlays every key found in `source` on the defaults.
    pub fn from_source(source: &impl ConfigSource) -> Result<Self> {
        let mut config = HfConfig::default();

        if let Some(v) = parsed(source, "hf_compress.compressionLevel")? {
            config.compression_level = v;
        }
        if let Some(v) = parsed(source, "hf_compress.bufferSize")? {
            config.output_buffer_size = v;
        }
        if let Some(v) = parsed(source, "hf_compress.parallelColumns")? {
            config.parallel_columns = v;
        }
        if let Some(v) = parsed(source, "hf.zstFileMaxSize")? {
            config.max_chunk_file_size = v;
        }
        if let Some(v) = source.lookup("hf.dataDir") {
            config.data_dir = PathBuf::from(v);
        }
        if let Some(v) = source.lookup("hf.metaDir") {
            config.meta_dir = PathBuf::from(v);
        }
        if let Some(v) = source.lookup("hf.fileNameFormat") {
            config.file_name_format = v;
        }
        if let Some(v) = source.lookup("hf.timestampsFileNamePrefix") {
            config.timestamps_prefix = v;
        }
        if let Some(v) = source.lookup("hf.valuesFileNamePrefix") {
            config.values_prefix = v;
        }
        if let Some(v) = parsed(source, "hf.indexWidth")? {
            config.index_width = v;
        }
        if let Some(v) = source.lookup("hf.timeUnit") {
            config.time_unit = v;
        }
        if let Some(v) = parsed(source, "hf.removePartialChunks")? {
            config.remove_partial_chunks = v;
        }

        config.validate()?;
        debug!("[hf_config] {:?}", config);
        Ok(config)
    }

    /// Largest size a single chunk file may reach.
    pub fn chunk_capacity(&self) -> usize {
        self.output_buffer_size.min(self.max_chunk_file_size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_capacity() < MIN_CHUNK_CAPACITY {
            return Err(HfError::Config(format!(
                "chunk capacity {} is below the minimum of {} bytes",
                self.chunk_capacity(),
                MIN_CHUNK_CAPACITY
            )));
        }
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(HfError::Config(format!(
                "compression level {} exceeds {}",
                self.compression_level, MAX_COMPRESSION_LEVEL
            )));
        }
        if !self.file_name_format.contains("{index}") {
            return Err(HfError::Config(format!(
                "file name format {:?} has no {{index}} placeholder",
                self.file_name_format
            )));
        }
        if self.timestamps_prefix.is_empty() || self.values_prefix.is_empty() {
            return Err(HfError::Config("column prefixes must not be empty".into()));
        }
        if self.timestamps_prefix == self.values_prefix {
            return Err(HfError::Config(format!(
                "timestamps and values share the prefix {:?}",
                self.timestamps_prefix
            )));
        }
        Ok(())
    }
}

fn parsed<T: FromStr>(source: &impl ConfigSource, key: &str) -> Result<Option<T>> {
    match source.lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| HfError::Config(format!("{} = {:?} cannot be parsed", key, raw))),
    }
}
