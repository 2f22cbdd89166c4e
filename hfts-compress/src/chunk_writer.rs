use std::fs;
use std::os::raw::c_void;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, warn};
use zstd_sys::*;

use hfts_common::{check_zstd, ChunkNaming, HfConfig, HfError, IndexRange, Result, MIN_CHUNK_CAPACITY};

/// Space kept free below capacity when sizing the first, guaranteed-to-fit attempt.
const FRAME_RESERVE: usize = 32;

/// Input granularity at which the fit search stops, one column value.
const SEARCH_GRAIN: usize = 8;

/// Owned zstd compression context, freed on drop.
struct CompressContext(*mut ZSTD_CCtx);

impl CompressContext {
    fn new(level: i32) -> Result<Self> {
        let cctx = unsafe { ZSTD_createCCtx() };
        if cctx.is_null() {
            return Err(HfError::CodecInit("compression"));
        }
        let ctx = CompressContext(cctx);

        let rc = unsafe { ZSTD_CCtx_setParameter(ctx.0, ZSTD_cParameter::ZSTD_c_compressionLevel, level) };
        if unsafe { ZSTD_isError(rc) } != 0 {
            return Err(HfError::CodecInit("compression"));
        }
        let rc = unsafe { ZSTD_CCtx_setParameter(ctx.0, ZSTD_cParameter::ZSTD_c_checksumFlag, 1) };
        if unsafe { ZSTD_isError(rc) } != 0 {
            return Err(HfError::CodecInit("compression"));
        }
        Ok(ctx)
    }

    /// Compresses `input` as one complete frame into `out`, returning its length.
    /// Fails when the frame does not fit in `out`.
    fn frame(&mut self, input: &[u8], out: &mut [u8]) -> Result<usize> {
        let rc = unsafe {
            ZSTD_compress2(
                self.0,
                out.as_mut_ptr() as *mut c_void,
                out.len(),
                input.as_ptr() as *const c_void,
                input.len(),
            )
        };
        check_zstd(rc, "ZSTD_compress2")
    }
}

impl Drop for CompressContext {
    fn drop(&mut self) {
        unsafe {
            ZSTD_freeCCtx(self.0);
        }
    }
}

/// Largest input length whose worst-case compressed size fits in `budget`.
fn max_input_within(budget: usize) -> usize {
    let (mut lo, mut hi) = (0usize, budget);
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if unsafe { ZSTD_compressBound(mid) } <= budget {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkWriteReport {
    /// Chunk indices written, `[start_index, final_index)`.
    pub range: IndexRange,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub elapsed: Duration,
}

/// Compresses a byte stream into independently decodable zstd frames, one per
/// chunk file, none larger than the configured capacity.
#[derive(Debug, Clone)]
pub struct ChunkWriter {
    level: i32,
    capacity: usize,
    remove_partial: bool,
}

impl ChunkWriter {
    pub fn new(config: &HfConfig) -> Result<Self> {
        config.validate()?;
        Ok(ChunkWriter {
            level: config.compression_level,
            capacity: config.chunk_capacity(),
            remove_partial: config.remove_partial_chunks,
        })
    }

    pub fn with_capacity(level: i32, capacity: usize) -> Result<Self> {
        if capacity < MIN_CHUNK_CAPACITY {
            return Err(HfError::Config(format!(
                "chunk capacity {} is below the minimum of {} bytes",
                capacity, MIN_CHUNK_CAPACITY
            )));
        }
        Ok(ChunkWriter {
            level,
            capacity,
            remove_partial: false,
        })
    }

    pub fn remove_partial_chunks(mut self, remove: bool) -> Self {
        self.remove_partial = remove;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Writes `input` as chunk files `start_index..` under `target_dir`.
    ///
    /// Empty input writes nothing and returns an empty range at `start_index`.
    pub fn compress(&self, input: &[u8], target_dir: &Path, naming: &ChunkNaming, start_index: u64) -> Result<ChunkWriteReport> {
        let started = Instant::now();
        if input.is_empty() {
            return Ok(ChunkWriteReport {
                range: IndexRange::empty(start_index),
                input_bytes: 0,
                output_bytes: 0,
                elapsed: started.elapsed(),
            });
        }

        fs::create_dir_all(target_dir).map_err(|e| HfError::io(target_dir, e))?;

        let mut written = Vec::new();
        match self.write_chunks(input, target_dir, naming, start_index, &mut written) {
            Ok(output_bytes) => {
                let range = IndexRange::new(start_index, start_index + written.len() as u64)?;
                debug!(
                    "[chunk_writer] {}: {} bytes -> {} bytes in chunks [{}, {})",
                    naming.prefix, input.len(), output_bytes, range.start, range.end
                );
                Ok(ChunkWriteReport {
                    range,
                    input_bytes: input.len() as u64,
                    output_bytes,
                    elapsed: started.elapsed(),
                })
            }
            Err(err) => {
                if self.remove_partial {
                    for path in &written {
                        if let Err(e) = fs::remove_file(path) {
                            warn!("[chunk_writer] could not remove partial chunk {}: {}", path.display(), e);
                        }
                    }
                } else if !written.is_empty() {
                    warn!(
                        "[chunk_writer] {} chunk files of {} left on disk after failure: {}",
                        written.len(),
                        naming.prefix,
                        err
                    );
                }
                Err(err)
            }
        }
    }

    fn write_chunks(
        &self,
        input: &[u8],
        target_dir: &Path,
        naming: &ChunkNaming,
        start_index: u64,
        written: &mut Vec<PathBuf>,
    ) -> Result<u64> {
        let mut cctx = CompressContext::new(self.level)?;
        let mut out = vec![0u8; self.capacity];
        let mut scratch = vec![0u8; self.capacity];

        let mut consumed = 0usize;
        let mut output_bytes = 0u64;
        let mut index = start_index;
        let mut hint = 0usize;

        while consumed < input.len() {
            let (taken, len) = fill_chunk(&mut cctx, &input[consumed..], hint, &mut out, &mut scratch)?;

            let path = naming.path(target_dir, index);
            written.push(path.clone());
            fs::write(&path, &out[..len]).map_err(|e| HfError::io(&path, e))?;
            debug!("[chunk_writer] wrote {} ({} input bytes, {} bytes)", path.display(), taken, len);

            consumed += taken;
            output_bytes += len as u64;
            index += 1;
            hint = taken;
        }

        Ok(output_bytes)
    }
}

/// Compresses the longest prefix of `input` whose frame still fits in `out`
/// and leaves that frame at the start of `out`. Returns the input consumed
/// and the frame length.
///
/// The first attempt is sized by `ZSTD_compressBound`, so it always fits.
/// From there the search gallops upward from `hint` (the previous chunk's
/// input length) and bisects once an attempt overflows.
fn fill_chunk(
    cctx: &mut CompressContext,
    input: &[u8],
    hint: usize,
    out: &mut Vec<u8>,
    scratch: &mut Vec<u8>,
) -> Result<(usize, usize)> {
    let floor = max_input_within(out.len().saturating_sub(FRAME_RESERVE)).min(input.len());
    if floor == 0 {
        return Err(HfError::CodecStream(format!(
            "chunk capacity of {} bytes cannot hold any input",
            out.len()
        )));
    }

    let mut fit = floor;
    let mut fit_len = cctx.frame(&input[..floor], out)?;
    let mut miss: Option<usize> = None;
    let mut next = (hint - hint / 64).max(fit + SEARCH_GRAIN);
    let mut step = (next / 64).max(SEARCH_GRAIN);

    while fit < input.len() {
        let n = match miss {
            Some(m) if m - fit <= (fit / 1024).max(SEARCH_GRAIN) => break,
            Some(m) => fit + (m - fit) / 2,
            None => next.min(input.len()),
        };
        // Same parameters as the floor attempt, so a failure here means the frame overflowed.
        match cctx.frame(&input[..n], scratch) {
            Ok(len) => {
                fit = n;
                fit_len = len;
                std::mem::swap(out, scratch);
                next = n + step;
                step *= 2;
            }
            Err(_) => miss = Some(n),
        }
    }

    Ok((fit, fit_len))
}
