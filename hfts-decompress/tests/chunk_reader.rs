use std::fs;
use std::os::raw::c_void;
use std::path::Path;

use hfts_common::{encode_column, ChunkNaming, HfError, IndexRange};
use hfts_decompress::{decompress_chunk_file, read_column, verify_chunks, ChunkReader};
use tempfile::TempDir;
use zstd_sys::{ZSTD_compress, ZSTD_compressBound, ZSTD_isError};

fn zstd_frame(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; unsafe { ZSTD_compressBound(data.len()) }];
    let n = unsafe {
        ZSTD_compress(
            out.as_mut_ptr() as *mut c_void,
            out.len(),
            data.as_ptr() as *const c_void,
            data.len(),
            3,
        )
    };
    assert_eq!(unsafe { ZSTD_isError(n) }, 0);
    out.truncate(n);
    out
}

/// Writes `pieces` as consecutive chunks starting at `start`.
fn write_chunks(dir: &Path, naming: &ChunkNaming, start: u64, pieces: &[&[u8]]) -> IndexRange {
    for (i, piece) in pieces.iter().enumerate() {
        fs::write(naming.path(dir, start + i as u64), zstd_frame(piece)).unwrap();
    }
    IndexRange::new(start, start + pieces.len() as u64).unwrap()
}

fn naming() -> ChunkNaming {
    ChunkNaming::new("{prefix}_{index}.zst", "values", 10)
}

#[test]
fn test_chunks_concatenate_in_index_order() {
    let dir = TempDir::new().unwrap();
    let naming = naming();
    let range = write_chunks(dir.path(), &naming, 0, &[b"alpha-", b"beta-", b"gamma"]);

    for parallel in [false, true] {
        let out = ChunkReader::new(parallel).decompress(dir.path(), &naming, range).unwrap();
        assert_eq!(out, b"alpha-beta-gamma");
    }
}

#[test]
fn test_multiple_ranges_skip_gaps() {
    let dir = TempDir::new().unwrap();
    let naming = naming();
    let a = write_chunks(dir.path(), &naming, 0, &[b"0", b"1"]);
    write_chunks(dir.path(), &naming, 2, &[b"not part of any range"]);
    let b = write_chunks(dir.path(), &naming, 5, &[b"5", b"6"]);

    let out = ChunkReader::default().decompress_ranges(dir.path(), &naming, &[a, b]).unwrap();
    assert_eq!(out, b"0156");
}

#[test]
fn test_file_with_two_frames_decodes_both() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("two.zst");
    let mut bytes = zstd_frame(b"first ");
    bytes.extend(zstd_frame(b"second"));
    fs::write(&path, bytes).unwrap();

    assert_eq!(decompress_chunk_file(&path).unwrap(), b"first second");
}

#[test]
fn test_large_chunk_spans_many_reads() {
    let dir = TempDir::new().unwrap();
    let naming = naming();
    let values: Vec<f64> = (0..500_000).map(|i| (i as f64 * 0.001).cos()).collect();
    let bytes = encode_column(&values);
    let range = write_chunks(dir.path(), &naming, 0, &[&bytes]);

    let back: Vec<f64> = read_column(&ChunkReader::default(), dir.path(), &naming, &[range]).unwrap();
    assert_eq!(back, values);
}

#[test]
fn test_missing_chunk_is_io_error() {
    let dir = TempDir::new().unwrap();
    let naming = naming();
    let range = write_chunks(dir.path(), &naming, 0, &[b"only one"]);
    let wider = IndexRange::new(range.start, range.end + 1).unwrap();

    let err = ChunkReader::default().decompress(dir.path(), &naming, wider).unwrap_err();
    assert!(matches!(err, HfError::Io { .. }), "{:?}", err);
}

#[test]
fn test_truncated_and_empty_chunks_are_codec_errors() {
    let dir = TempDir::new().unwrap();
    let naming = naming();
    let payload = vec![7u8; 10_000];
    let range = write_chunks(dir.path(), &naming, 0, &[&payload]);

    let path = naming.path(dir.path(), 0);
    let frame = fs::read(&path).unwrap();
    fs::write(&path, &frame[..frame.len() - 4]).unwrap();
    let err = ChunkReader::default().decompress(dir.path(), &naming, range).unwrap_err();
    assert!(matches!(err, HfError::CodecStream(_)), "{:?}", err);

    fs::write(&path, b"").unwrap();
    let err = decompress_chunk_file(&path).unwrap_err();
    assert!(matches!(err, HfError::CodecStream(_)), "{:?}", err);

    fs::write(&path, b"definitely not zstd").unwrap();
    assert!(matches!(decompress_chunk_file(&path), Err(HfError::CodecStream(_))));
}

#[test]
fn test_ragged_column_is_rejected() {
    let dir = TempDir::new().unwrap();
    let naming = naming();
    let range = write_chunks(dir.path(), &naming, 0, &[&[0u8; 12]]);

    let err = read_column::<i64>(&ChunkReader::default(), dir.path(), &naming, &[range]).unwrap_err();
    assert!(matches!(err, HfError::ColumnLength { len: 12, width: 8 }), "{:?}", err);
}

#[test]
fn test_verify_counts_bad_chunks_and_keeps_going() {
    let dir = TempDir::new().unwrap();
    let naming = naming();
    let range = write_chunks(dir.path(), &naming, 0, &[b"aaaa", b"bbbb", b"cccc", b"dddd"]);

    fs::write(naming.path(dir.path(), 1), b"garbage").unwrap();
    fs::remove_file(naming.path(dir.path(), 3)).unwrap();

    let report = verify_chunks(dir.path(), &naming, &[range]);
    assert_eq!(report.total_chunks, 4);
    assert_eq!(report.verified_chunks, 2);
    assert_eq!(report.corrupt_chunks, 2);
    assert_eq!(report.verified_bytes, 8);
    assert!(!report.is_clean());
    assert_eq!(
        report.corrupt,
        vec![naming.path(dir.path(), 1), naming.path(dir.path(), 3)]
    );
}
