// hfts-decompress/src/lib.rs

pub mod chunk_reader;
pub mod unpacker;
pub mod verify;

pub use chunk_reader::{decompress_chunk_file, ChunkReader};
pub use unpacker::{extract_points, read_column, read_columns};
pub use verify::{verify_chunks, verify_session, VerifyReport};
