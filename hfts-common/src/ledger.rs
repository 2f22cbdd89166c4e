//! Per-session record of which chunk indices exist for each column prefix.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{HfError, Result};

/// Half-open interval `[start, end)` of chunk indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: u64,
    pub end: u64,
}

impl IndexRange {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(HfError::InvalidRange { start, end });
        }
        Ok(IndexRange { start, end })
    }

    pub fn empty(at: u64) -> Self {
        IndexRange { start: at, end: at }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// True when the ranges overlap or share an endpoint.
    pub fn touches(&self, other: &IndexRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn iter(&self) -> std::ops::Range<u64> {
        self.start..self.end
    }
}

/// Sorted, disjoint, non-adjacent ranges per prefix.
///
/// Appends are expected in non-decreasing start order; only the last range of
/// a prefix is ever merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeLedger {
    ranges: BTreeMap<String, Vec<IndexRange>>,
}

impl RangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_range(&mut self, prefix: &str, range: IndexRange) -> Result<()> {
        if range.is_empty() {
            return Ok(());
        }

        let entries = self.ranges.entry(prefix.to_string()).or_default();
        let Some(last) = entries.last_mut() else {
            entries.push(range);
            return Ok(());
        };

        if last.touches(&range) {
            if range.start < last.start {
                warn!(
                    "[ledger] {} range [{}, {}) starts before [{}, {}), merging to bounding interval",
                    prefix, range.start, range.end, last.start, last.end
                );
            }
            last.start = last.start.min(range.start);
            last.end = last.end.max(range.end);
            return Ok(());
        }

        if range.start < last.start {
            return Err(HfError::RangeOrder {
                prefix: prefix.to_string(),
                start: range.start,
                end: range.end,
                last_start: last.start,
                last_end: last.end,
            });
        }

        entries.push(range);
        Ok(())
    }

    pub fn ranges(&self, prefix: &str) -> &[IndexRange] {
        self.ranges.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First chunk index not yet claimed for `prefix`.
    pub fn next_index(&self, prefix: &str) -> u64 {
        self.ranges(prefix).last().map_or(0, |r| r.end)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.ranges.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.values().all(Vec::is_empty)
    }

    pub fn to_record(&self, session_ordinal: u64, timestamp_offset: i64, time_unit: &str) -> LedgerRecord {
        LedgerRecord {
            session_ordinal,
            timestamp_offset,
            time_unit: time_unit.to_string(),
            ranges: self.ranges.clone(),
        }
    }

    /// Rebuilds a ledger, re-merging the stored ranges.
    pub fn from_record(record: &LedgerRecord) -> Result<Self> {
        let mut ledger = RangeLedger::new();
        for (prefix, ranges) in &record.ranges {
            for r in ranges {
                ledger.add_range(prefix, IndexRange::new(r.start, r.end)?)?;
            }
        }
        Ok(ledger)
    }
}

/// Serialized form of a closed session's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub session_ordinal: u64,
    pub timestamp_offset: i64,
    pub time_unit: String,
    pub ranges: BTreeMap<String, Vec<IndexRange>>,
}

impl LedgerRecord {
    pub fn ranges(&self, prefix: &str) -> &[IndexRange] {
        self.ranges.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Writes through a temp file and renames it into place.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| HfError::io(parent, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(self)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| HfError::io(&tmp, e))?;
        file.write_all(&data).map_err(|e| HfError::io(&tmp, e))?;
        file.sync_all().map_err(|e| HfError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| HfError::io(path, e))?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| HfError::io(path, e))?;
        Ok(serde_json::from_slice(&data)?)
    }
}
