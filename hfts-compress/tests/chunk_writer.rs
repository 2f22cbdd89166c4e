use std::fs;
use std::path::Path;

use hfts_common::{encode_column, ChunkNaming, HfError, IndexRange};
use hfts_compress::ChunkWriter;
use hfts_decompress::ChunkReader;
use tempfile::TempDir;

fn noise(len: usize, mut seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        out.extend_from_slice(&seed.to_le_bytes());
    }
    out.truncate(len);
    out
}

fn chunk_sizes(dir: &Path, naming: &ChunkNaming, range: IndexRange) -> Vec<u64> {
    range
        .iter()
        .map(|i| fs::metadata(naming.path(dir, i)).expect("chunk file").len())
        .collect()
}

#[test]
fn test_compress_bytes_to_files_round_trip() {
    let dir = TempDir::new().unwrap();
    let naming = ChunkNaming::new("{prefix}_{index}.zst", "timestamps", 10);
    let writer = ChunkWriter::with_capacity(3, 4096).unwrap();

    let t0 = 1_700_000_000_000_000_000i64;
    let timestamps: Vec<i64> = (0..100_000).map(|i| t0 + i * 1_000 + (i % 7)).collect();
    let input = encode_column(&timestamps);

    let report = writer.compress(&input, dir.path(), &naming, 0).unwrap();
    assert_eq!(report.range.start, 0);
    assert!(report.range.len() >= 2, "expected several chunks, got {:?}", report.range);
    assert_eq!(report.input_bytes, input.len() as u64);

    let sizes = chunk_sizes(dir.path(), &naming, report.range);
    assert!(sizes.iter().all(|&s| s <= 4096), "chunk over capacity: {:?}", sizes);
    assert_eq!(sizes.iter().sum::<u64>(), report.output_bytes);
    assert!(!naming.path(dir.path(), report.range.end).exists());

    let restored = ChunkReader::default().decompress(dir.path(), &naming, report.range).unwrap();
    assert_eq!(restored, input);
}

#[test]
fn test_chunk_count_tracks_compressed_size() {
    let dir = TempDir::new().unwrap();
    let naming = ChunkNaming::new("{prefix}{index}", "noise", 4);
    let capacity = 64 * 1024;
    let writer = ChunkWriter::with_capacity(1, capacity).unwrap();

    let input = noise(1024 * 1024, 0x9e37_79b9_7f4a_7c15);
    let report = writer.compress(&input, dir.path(), &naming, 0).unwrap();

    let sizes = chunk_sizes(dir.path(), &naming, report.range);
    assert!(sizes.iter().all(|&s| s <= capacity as u64));

    let lower = report.output_bytes.div_ceil(capacity as u64);
    let count = report.range.len();
    assert!(
        count >= lower && count <= lower + 1,
        "{} chunks for {} compressed bytes at capacity {}",
        count,
        report.output_bytes,
        capacity
    );

    let restored = ChunkReader::new(true).decompress(dir.path(), &naming, report.range).unwrap();
    assert_eq!(restored, input);
}

#[test]
fn test_compressible_column_fills_chunks() {
    let t0 = 1_700_000_000_000_000_000i64;
    let timestamps: Vec<i64> = (0..200_000).map(|i| t0 + i * 1_000 + (i % 7)).collect();
    let input = encode_column(&timestamps);

    for capacity in [4096usize, 65536] {
        let dir = TempDir::new().unwrap();
        let naming = ChunkNaming::new("{prefix}_{index}.zst", "timestamps", 10);
        let writer = ChunkWriter::with_capacity(3, capacity).unwrap();
        let report = writer.compress(&input, dir.path(), &naming, 0).unwrap();

        let sizes = chunk_sizes(dir.path(), &naming, report.range);
        assert!(sizes.iter().all(|&s| s <= capacity as u64));

        let lower = report.output_bytes.div_ceil(capacity as u64);
        let count = report.range.len();
        assert!(
            count <= lower + 1,
            "{} chunks for {} compressed bytes at capacity {}",
            count,
            report.output_bytes,
            capacity
        );

        let restored = ChunkReader::default().decompress(dir.path(), &naming, report.range).unwrap();
        assert_eq!(restored, input);
    }
}

#[test]
fn test_every_capacity_respects_bound() {
    let input = noise(20_000, 42);
    for capacity in [256usize, 300, 1024, 5000] {
        let dir = TempDir::new().unwrap();
        let naming = ChunkNaming::new("{prefix}_{index}", "c", 6);
        let writer = ChunkWriter::with_capacity(3, capacity).unwrap();

        let report = writer.compress(&input, dir.path(), &naming, 10).unwrap();
        assert_eq!(report.range.start, 10);
        for size in chunk_sizes(dir.path(), &naming, report.range) {
            assert!(size <= capacity as u64, "chunk of {} bytes at capacity {}", size, capacity);
        }
        let restored = ChunkReader::default().decompress(dir.path(), &naming, report.range).unwrap();
        assert_eq!(restored, input, "capacity {}", capacity);
    }
}

#[test]
fn test_empty_input_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("session");
    let naming = ChunkNaming::new("{prefix}_{index}.zst", "values", 10);
    let writer = ChunkWriter::with_capacity(3, 1024).unwrap();

    let report = writer.compress(&[], &target, &naming, 5).unwrap();
    assert_eq!(report.range, IndexRange::empty(5));
    assert!(report.range.is_empty());
    assert_eq!(report.output_bytes, 0);
    assert!(!target.exists() || fs::read_dir(&target).unwrap().next().is_none());
}

#[test]
fn test_successive_calls_are_contiguous() {
    let dir = TempDir::new().unwrap();
    let naming = ChunkNaming::new("{prefix}_{index}.zst", "values", 10);
    let writer = ChunkWriter::with_capacity(3, 512).unwrap();

    let mut next = 0;
    let mut ranges = Vec::new();
    let mut expected = Vec::new();
    for batch in 0..4 {
        let values: Vec<f64> = (0..500).map(|i| (batch * 500 + i) as f64 * 0.25).collect();
        let bytes = encode_column(&values);
        let report = writer.compress(&bytes, dir.path(), &naming, next).unwrap();
        assert_eq!(report.range.start, next);
        assert!(report.range.end > report.range.start);
        next = report.range.end;
        ranges.push(report.range);
        expected.extend_from_slice(&bytes);
    }

    let restored = ChunkReader::default().decompress_ranges(dir.path(), &naming, &ranges).unwrap();
    assert_eq!(restored, expected);
}

#[test]
fn test_failed_compress_leaves_or_removes_partial_chunks() {
    let input = noise(4096, 7);
    let naming = ChunkNaming::new("{prefix}_{index}", "ts", 3);

    for remove in [false, true] {
        let dir = TempDir::new().unwrap();
        // A directory where the second chunk file should go makes that write fail.
        fs::create_dir_all(naming.path(dir.path(), 1)).unwrap();

        let writer = ChunkWriter::with_capacity(3, 1024).unwrap().remove_partial_chunks(remove);
        let err = writer.compress(&input, dir.path(), &naming, 0).unwrap_err();
        assert!(matches!(err, HfError::Io { .. }), "unexpected error {:?}", err);

        assert_eq!(naming.path(dir.path(), 0).exists(), !remove);
    }
}
