//! Fixed-width, native-endian column encoding.
//!
//! A column is written as `count * WIDTH` raw bytes with no header or framing.
//! Compression happens one layer up, in the chunk writer.

use crate::error::{HfError, Result};

/// A numeric type that can be stored in a column buffer.
pub trait ColumnValue: Copy {
    const WIDTH: usize;

    fn put(self, out: &mut Vec<u8>);

    /// `bytes` is exactly `WIDTH` long.
    fn take(bytes: &[u8]) -> Self;
}

impl ColumnValue for i64 {
    const WIDTH: usize = 8;

    fn put(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }

    fn take(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        i64::from_ne_bytes(raw)
    }
}

impl ColumnValue for f64 {
    const WIDTH: usize = 8;

    fn put(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bits().to_ne_bytes());
    }

    fn take(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        f64::from_bits(u64::from_ne_bytes(raw))
    }
}

pub fn encode_column<T: ColumnValue>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::WIDTH);
    for v in values {
        v.put(&mut out);
    }
    out
}

/// Decodes a column buffer. Trailing bytes that do not form a whole value are rejected.
pub fn decode_column<T: ColumnValue>(bytes: &[u8]) -> Result<Vec<T>> {
    if bytes.len() % T::WIDTH != 0 {
        return Err(HfError::ColumnLength {
            len: bytes.len(),
            width: T::WIDTH,
        });
    }
    Ok(bytes.chunks_exact(T::WIDTH).map(T::take).collect())
}
