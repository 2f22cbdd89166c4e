use std::path::Path;

use log::{error, info};

use hfts_common::{
    decode_column, ChunkNaming, ColumnValue, HfConfig, HfError, IndexRange, LedgerRecord, Point, PointBatch, Result,
    SessionLayout,
};

use crate::chunk_reader::ChunkReader;

pub fn read_column<T: ColumnValue>(
    reader: &ChunkReader,
    target_dir: &Path,
    naming: &ChunkNaming,
    ranges: &[IndexRange],
) -> Result<Vec<T>> {
    decode_column(&reader.decompress_ranges(target_dir, naming, ranges)?)
}

/// Reads both columns of a persisted session.
///
/// Fails with `SchemaMismatch` when the columns decode to different lengths.
pub fn read_columns(reader: &ChunkReader, config: &HfConfig, ledger_path: &Path) -> Result<(Vec<i64>, Vec<f64>)> {
    let record = LedgerRecord::read(ledger_path)?;
    let layout = SessionLayout::from_ledger_path(config, ledger_path)
        .ok_or_else(|| HfError::Config(format!("ledger path {} has no usable file stem", ledger_path.display())))?;
    let target_dir = layout.target_dir();

    let timestamps: Vec<i64> = read_column(
        reader,
        &target_dir,
        &ChunkNaming::timestamps(config),
        record.ranges(&config.timestamps_prefix),
    )?;
    let values: Vec<f64> = read_column(
        reader,
        &target_dir,
        &ChunkNaming::values(config),
        record.ranges(&config.values_prefix),
    )?;

    if timestamps.len() != values.len() {
        return Err(HfError::SchemaMismatch {
            timestamps: timestamps.len(),
            values: values.len(),
        });
    }

    info!(
        "[unpacker] session #{} {}: {} points",
        record.session_ordinal,
        layout.stem,
        timestamps.len()
    );
    Ok((timestamps, values))
}

/// Rebuilds the points of a persisted session under the series `name`.
///
/// Columns of different lengths yield an empty vector rather than an error.
pub fn extract_points(reader: &ChunkReader, config: &HfConfig, ledger_path: &Path, name: &str) -> Result<Vec<Point>> {
    let (timestamps, values) = match read_columns(reader, config, ledger_path) {
        Err(HfError::SchemaMismatch { timestamps, values }) => {
            error!(
                "[unpacker] {}: mismatched column lengths ({} timestamps, {} values)",
                ledger_path.display(),
                timestamps,
                values
            );
            return Ok(Vec::new());
        }
        other => other?,
    };
    Ok(PointBatch::new(name, timestamps, values)?.into_points())
}
