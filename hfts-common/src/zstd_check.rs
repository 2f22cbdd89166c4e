use std::ffi::CStr;

use zstd_sys::{ZSTD_getErrorName, ZSTD_isError};

use crate::error::{HfError, Result};

pub fn zstd_error_name(code: usize) -> String {
    unsafe {
        let name = ZSTD_getErrorName(code);
        if name.is_null() {
            return format!("zstd error {}", code);
        }
        CStr::from_ptr(name).to_string_lossy().into_owned()
    }
}

/// Maps a zstd return code to `CodecStream` when it encodes an error.
pub fn check_zstd(code: usize, op: &str) -> Result<usize> {
    if unsafe { ZSTD_isError(code) } != 0 {
        return Err(HfError::CodecStream(format!("{}: {}", op, zstd_error_name(code))));
    }
    Ok(code)
}
