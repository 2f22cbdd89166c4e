// hfts-compress/src/lib.rs

pub mod chunk_writer;
pub mod session;

pub use chunk_writer::{ChunkWriteReport, ChunkWriter};
pub use session::{IngestSession, InsertReport, SessionState, SessionSummary, UNNAMED_SESSION};
