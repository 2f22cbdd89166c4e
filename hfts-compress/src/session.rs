use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use log::info;

use hfts_common::{
    encode_column, ChunkNaming, Clock, HfConfig, HfError, IndexRange, IngestReport, LedgerRecord, Point, PointBatch, RangeLedger,
    Result, SessionLayout, SystemClock,
};

use crate::chunk_writer::{ChunkWriteReport, ChunkWriter};

/// Name used for the files of a session that never received a batch.
pub const UNNAMED_SESSION: &str = "session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Active,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertReport {
    pub timestamps: ChunkWriteReport,
    pub values: ChunkWriteReport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub ordinal: u64,
    pub layout: SessionLayout,
    pub ledger_path: PathBuf,
    pub record: LedgerRecord,
    pub report: IngestReport,
}

struct ActiveSession {
    ordinal: u64,
    stamp: String,
    name: Option<Arc<str>>,
    timestamp_offset: i64,
    /// Stem this session has checked and started writing under.
    claimed: Option<String>,
    ledger: RangeLedger,
    report: IngestReport,
}

impl ActiveSession {
    fn layout(&self, config: &HfConfig) -> SessionLayout {
        let name = self.name.as_deref().unwrap_or(UNNAMED_SESSION);
        SessionLayout::new(config, name, &self.stamp)
    }
}

/// One ingestion lifecycle: `initialize`, any number of `insert`s, `close`.
///
/// The session can be re-initialized after `close`; each initialization gets
/// the next ordinal and a fresh ledger.
pub struct IngestSession<C: Clock = SystemClock> {
    config: HfConfig,
    clock: C,
    writer: ChunkWriter,
    timestamps: ChunkNaming,
    values: ChunkNaming,
    state: SessionState,
    next_ordinal: u64,
    active: Option<ActiveSession>,
}

impl IngestSession<SystemClock> {
    pub fn new(config: HfConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> IngestSession<C> {
    pub fn with_clock(config: HfConfig, clock: C) -> Result<Self> {
        let writer = ChunkWriter::new(&config)?;
        Ok(IngestSession {
            timestamps: ChunkNaming::timestamps(&config),
            values: ChunkNaming::values(&config),
            config,
            clock,
            writer,
            state: SessionState::Uninitialized,
            next_ordinal: 0,
            active: None,
        })
    }

    /// Ordinal given to the next `initialize`; use it to continue numbering across restarts.
    pub fn starting_at(mut self, ordinal: u64) -> Self {
        self.next_ordinal = ordinal;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &HfConfig {
        &self.config
    }

    pub fn ordinal(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.ordinal)
    }

    pub fn ledger(&self) -> Option<&RangeLedger> {
        self.active.as_ref().map(|a| &a.ledger)
    }

    pub fn report(&self) -> Option<&IngestReport> {
        self.active.as_ref().map(|a| &a.report)
    }

    pub fn layout(&self) -> Option<SessionLayout> {
        self.active.as_ref().map(|a| a.layout(&self.config))
    }

    pub fn initialize(&mut self) -> Result<()> {
        if self.state == SessionState::Active {
            return Err(self.sequence_error("initialize"));
        }

        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        let stamp = self.clock.datetime_stamp();
        info!("[session] #{} initialized at {}", ordinal, stamp);

        self.active = Some(ActiveSession {
            ordinal,
            stamp,
            name: None,
            timestamp_offset: 0,
            claimed: None,
            ledger: RangeLedger::new(),
            report: IngestReport::default(),
        });
        self.state = SessionState::Active;
        Ok(())
    }

    /// Compresses a same-named batch of points into the session's chunk files.
    pub fn insert(&mut self, points: &[Point]) -> Result<InsertReport> {
        if self.state != SessionState::Active {
            return Err(self.sequence_error("insert"));
        }
        match PointBatch::from_points(points)? {
            Some(batch) => self.insert_batch(&batch),
            None => Ok(self.empty_insert()),
        }
    }

    pub fn insert_batch(&mut self, batch: &PointBatch) -> Result<InsertReport> {
        if self.state != SessionState::Active {
            return Err(self.sequence_error("insert"));
        }
        if batch.timestamps.len() != batch.values.len() {
            return Err(HfError::SchemaMismatch {
                timestamps: batch.timestamps.len(),
                values: batch.values.len(),
            });
        }
        if batch.is_empty() {
            return Ok(self.empty_insert());
        }

        let Self {
            config,
            writer,
            timestamps,
            values,
            active,
            ..
        } = self;
        let (config, writer, timestamps, values) = (&*config, &*writer, &*timestamps, &*values);
        let Some(active) = active.as_mut() else {
            return Err(HfError::Sequence {
                op: "insert",
                state: SessionState::Uninitialized.as_str(),
            });
        };

        let name = match &active.name {
            Some(name) if name != &batch.name => {
                return Err(HfError::MixedBatch {
                    expected: name.to_string(),
                    found: batch.name.to_string(),
                });
            }
            Some(name) => Arc::clone(name),
            None => Arc::clone(&batch.name),
        };

        let layout = SessionLayout::new(config, &name, &active.stamp);
        if active.claimed.as_deref() != Some(layout.stem.as_str()) {
            layout.ensure_unclaimed()?;
            active.claimed = Some(layout.stem.clone());
        }

        let target_dir = layout.target_dir();
        let ts_bytes = encode_column(&batch.timestamps);
        let val_bytes = encode_column(&batch.values);
        let ts_start = active.ledger.next_index(&timestamps.prefix);
        let val_start = active.ledger.next_index(&values.prefix);

        let started = Instant::now();
        let (ts_report, val_report) = if config.parallel_columns {
            let (ts, vals) = rayon::join(
                || writer.compress(&ts_bytes, &target_dir, timestamps, ts_start),
                || writer.compress(&val_bytes, &target_dir, values, val_start),
            );
            (ts?, vals?)
        } else {
            let ts = writer.compress(&ts_bytes, &target_dir, timestamps, ts_start)?;
            let vals = writer.compress(&val_bytes, &target_dir, values, val_start)?;
            (ts, vals)
        };
        let elapsed = started.elapsed();

        if active.name.is_none() {
            active.name = Some(name);
            active.timestamp_offset = batch.timestamps[0];
        }
        active.ledger.add_range(&timestamps.prefix, ts_report.range)?;
        active.ledger.add_range(&values.prefix, val_report.range)?;

        let report = &mut active.report;
        report.batches += 1;
        report.points += batch.len() as u64;
        report.input_bytes += ts_report.input_bytes + val_report.input_bytes;
        report.output_bytes += ts_report.output_bytes + val_report.output_bytes;
        report.chunks += ts_report.range.len() + val_report.range.len();
        report.compress_time += elapsed;

        Ok(InsertReport {
            timestamps: ts_report,
            values: val_report,
        })
    }

    /// Persists the ledger record and ends the session.
    pub fn close(&mut self) -> Result<SessionSummary> {
        if self.state != SessionState::Active {
            return Err(self.sequence_error("close"));
        }
        let Some(active) = self.active.as_ref() else {
            return Err(self.sequence_error("close"));
        };

        let layout = active.layout(&self.config);
        if active.claimed.as_deref() != Some(layout.stem.as_str()) {
            layout.ensure_unclaimed()?;
        }
        let ledger_path = layout.ledger_path();
        let record = active
            .ledger
            .to_record(active.ordinal, active.timestamp_offset, &self.config.time_unit);
        record.write(&ledger_path)?;

        let report = active.report.clone();
        info!(
            "[session] #{} {} closed: {} batches, {} points, {} -> {} bytes ({:.2}%), {} chunks, {:.1} MiB/s, mean batch latency {:?}",
            active.ordinal,
            layout.stem,
            report.batches,
            report.points,
            report.input_bytes,
            report.output_bytes,
            report.compression_ratio(),
            report.chunks,
            report.throughput_mib_s(),
            report.mean_batch_latency()
        );

        let summary = SessionSummary {
            ordinal: active.ordinal,
            layout,
            ledger_path,
            record,
            report,
        };
        self.active = None;
        self.state = SessionState::Closed;
        Ok(summary)
    }

    fn empty_insert(&self) -> InsertReport {
        let empty = |naming: &ChunkNaming| ChunkWriteReport {
            range: IndexRange::empty(self.ledger().map_or(0, |l| l.next_index(&naming.prefix))),
            input_bytes: 0,
            output_bytes: 0,
            elapsed: Default::default(),
        };
        InsertReport {
            timestamps: empty(&self.timestamps),
            values: empty(&self.values),
        }
    }

    fn sequence_error(&self, op: &'static str) -> HfError {
        HfError::Sequence {
            op,
            state: self.state.as_str(),
        }
    }
}
