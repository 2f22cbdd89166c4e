use std::fs::File;
use std::io::{ErrorKind, Read};
use std::os::raw::c_void;
use std::path::{Path, PathBuf};

use log::debug;
use rayon::prelude::*;
use zstd_sys::*;

use hfts_common::{check_zstd, ChunkNaming, HfError, IndexRange, Result};

/// Owned zstd decompression context, freed on drop.
struct DecompressContext(*mut ZSTD_DCtx);

impl DecompressContext {
    fn new() -> Result<Self> {
        let dctx = unsafe { ZSTD_createDCtx() };
        if dctx.is_null() {
            return Err(HfError::CodecInit("decompression"));
        }
        Ok(DecompressContext(dctx))
    }

    fn step(&mut self, output: &mut ZSTD_outBuffer, input: &mut ZSTD_inBuffer) -> Result<usize> {
        let rc = unsafe { ZSTD_decompressStream(self.0, output, input) };
        check_zstd(rc, "ZSTD_decompressStream")
    }
}

impl Drop for DecompressContext {
    fn drop(&mut self) {
        unsafe {
            ZSTD_freeDCtx(self.0);
        }
    }
}

/// Decompresses every frame in one chunk file.
///
/// The file is fed through in `ZSTD_DStreamInSize()` pieces, so a frame may
/// span any number of reads. A frame left unfinished at end of file is an error.
pub fn decompress_chunk_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| HfError::io(path, e))?;
    let mut dctx = DecompressContext::new()?;

    let in_size = unsafe { ZSTD_DStreamInSize() };
    let out_size = unsafe { ZSTD_DStreamOutSize() };
    let mut in_chunk = vec![0u8; in_size];
    let mut out_chunk = vec![0u8; out_size];

    let mut output = Vec::new();
    let mut last = 0usize;
    let mut read_any = false;

    loop {
        let n = match file.read(&mut in_chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(HfError::io(path, e)),
        };
        read_any = true;

        let mut input = ZSTD_inBuffer {
            src: in_chunk.as_ptr() as *const c_void,
            size: n,
            pos: 0,
        };
        while input.pos < input.size {
            let mut out = ZSTD_outBuffer {
                dst: out_chunk.as_mut_ptr() as *mut c_void,
                size: out_size,
                pos: 0,
            };
            last = dctx
                .step(&mut out, &mut input)
                .map_err(|e| HfError::CodecStream(format!("{}: {}", path.display(), e)))?;
            output.extend_from_slice(&out_chunk[..out.pos]);
        }
    }

    if !read_any {
        return Err(HfError::CodecStream(format!("{}: empty chunk file", path.display())));
    }
    if last != 0 {
        return Err(HfError::CodecStream(format!(
            "{}: truncated frame, decoder expects {} more bytes",
            path.display(),
            last
        )));
    }

    debug!("[chunk_reader] {} -> {} bytes", path.display(), output.len());
    Ok(output)
}

/// Reassembles a column's byte stream from its chunk files, in index order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkReader {
    parallel: bool,
}

impl ChunkReader {
    /// With `parallel` the chunks are decoded on the rayon pool.
    pub fn new(parallel: bool) -> Self {
        ChunkReader { parallel }
    }

    pub fn decompress(&self, target_dir: &Path, naming: &ChunkNaming, range: IndexRange) -> Result<Vec<u8>> {
        self.decompress_ranges(target_dir, naming, std::slice::from_ref(&range))
    }

    pub fn decompress_ranges(&self, target_dir: &Path, naming: &ChunkNaming, ranges: &[IndexRange]) -> Result<Vec<u8>> {
        let paths: Vec<PathBuf> = ranges
            .iter()
            .flat_map(IndexRange::iter)
            .map(|index| naming.path(target_dir, index))
            .collect();

        let pieces: Vec<Vec<u8>> = if self.parallel {
            paths.par_iter().map(|p| decompress_chunk_file(p)).collect::<Result<_>>()?
        } else {
            paths.iter().map(|p| decompress_chunk_file(p)).collect::<Result<_>>()?
        };

        let total = pieces.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(total);
        for piece in &pieces {
            out.extend_from_slice(piece);
        }

        debug!(
            "[chunk_reader] {}: {} chunks -> {} bytes",
            naming.prefix,
            paths.len(),
            out.len()
        );
        Ok(out)
    }
}
