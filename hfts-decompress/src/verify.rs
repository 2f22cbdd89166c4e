use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use hfts_common::{ChunkNaming, HfConfig, HfError, IndexRange, LedgerRecord, Result, SessionLayout};

use crate::chunk_reader::decompress_chunk_file;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct VerifyReport {
    pub total_chunks: u64,
    pub verified_chunks: u64,
    pub corrupt_chunks: u64,
    /// On-disk size of all chunk files that exist.
    pub compressed_bytes: u64,
    /// Decoded size of the chunks that verified.
    pub verified_bytes: u64,
    pub corrupt: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.corrupt_chunks == 0
    }

    pub fn merge(&mut self, other: VerifyReport) {
        self.total_chunks += other.total_chunks;
        self.verified_chunks += other.verified_chunks;
        self.corrupt_chunks += other.corrupt_chunks;
        self.compressed_bytes += other.compressed_bytes;
        self.verified_bytes += other.verified_bytes;
        self.corrupt.extend(other.corrupt);
    }
}

/// Decodes each chunk on its own and counts the ones that fail, without stopping.
pub fn verify_chunks(target_dir: &Path, naming: &ChunkNaming, ranges: &[IndexRange]) -> VerifyReport {
    let mut report = VerifyReport::default();
    for index in ranges.iter().flat_map(IndexRange::iter) {
        let path = naming.path(target_dir, index);
        report.total_chunks += 1;
        if let Ok(meta) = fs::metadata(&path) {
            report.compressed_bytes += meta.len();
        }
        match decompress_chunk_file(&path) {
            Ok(bytes) => {
                report.verified_chunks += 1;
                report.verified_bytes += bytes.len() as u64;
            }
            Err(e) => {
                warn!("[verify] {}", e);
                report.corrupt_chunks += 1;
                report.corrupt.push(path);
            }
        }
    }
    report
}

/// Verifies every prefix recorded in a session's ledger.
pub fn verify_session(config: &HfConfig, ledger_path: &Path) -> Result<VerifyReport> {
    let record = LedgerRecord::read(ledger_path)?;
    let layout = SessionLayout::from_ledger_path(config, ledger_path)
        .ok_or_else(|| HfError::Config(format!("ledger path {} has no usable file stem", ledger_path.display())))?;
    let target_dir = layout.target_dir();

    let mut report = VerifyReport::default();
    for (prefix, ranges) in &record.ranges {
        let naming = ChunkNaming::new(&config.file_name_format, prefix, config.index_width);
        report.merge(verify_chunks(&target_dir, &naming, ranges));
    }
    Ok(report)
}
