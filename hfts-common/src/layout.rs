use std::io;
use std::path::{Path, PathBuf};

use crate::common_config::HfConfig;
use crate::error::{HfError, Result};

/// Where one session's chunk files and ledger record live.
///
/// Both are keyed by the same stem: series name followed by the creation stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    pub data_dir: PathBuf,
    pub meta_dir: PathBuf,
    pub stem: String,
}

impl SessionLayout {
    pub fn new(config: &HfConfig, name: &str, stamp: &str) -> Self {
        SessionLayout {
            data_dir: config.data_dir.clone(),
            meta_dir: config.meta_dir.clone(),
            stem: format!("{}{}", name, stamp),
        }
    }

    /// Recovers the layout of a persisted session from its ledger path.
    pub fn from_ledger_path(config: &HfConfig, ledger_path: &Path) -> Option<Self> {
        let stem = ledger_path.file_stem()?.to_str()?.to_string();
        let meta_dir = ledger_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.meta_dir.clone());
        Some(SessionLayout {
            data_dir: config.data_dir.clone(),
            meta_dir,
            stem,
        })
    }

    pub fn target_dir(&self) -> PathBuf {
        self.data_dir.join(&self.stem)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.meta_dir.join(format!("{}.json", self.stem))
    }

    /// Fails with `AlreadyExists` if another session already wrote under this stem.
    pub fn ensure_unclaimed(&self) -> Result<()> {
        for path in [self.target_dir(), self.ledger_path()] {
            if path.exists() {
                return Err(HfError::io(
                    &path,
                    io::Error::new(io::ErrorKind::AlreadyExists, "session output already exists"),
                ));
            }
        }
        Ok(())
    }
}
