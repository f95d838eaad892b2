//! Ingest side of the engine: column inversion, the memory indexer, chunk
//! persistence, and the per-segment bookkeeping queries read from.

pub(crate) mod chunk;
mod column_index_reader;
mod column_inverter;
mod memory_indexer;
mod pool;
mod segment_entry;

pub use self::chunk::ChunkReader;
pub use self::column_index_reader::ColumnIndexReader;
pub use self::column_inverter::{ColumnInverter, ColumnLengths, PostingWriterProvider};
pub use self::memory_indexer::{ChunkMeta, MemoryIndexer};
pub use self::pool::ThreadPool;
pub use self::segment_entry::{ChunkIndexEntry, SegmentIndexEntry};
