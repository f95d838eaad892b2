//! Per-segment index state: finalized chunks plus an optional live indexer.

use crate::index::MemoryIndexer;
use crate::{Error, Result, RowId};

/// One finalized chunk registered on a segment.
#[derive(Debug, Clone)]
pub struct ChunkIndexEntry {
    /// Chunk name without extension; resolves to
    /// `<segment_id>/ft/<chunk_name>.idx`.
    pub chunk_name: String,
    /// Smallest row id any posting of the chunk contains.
    pub base_row_id: RowId,
    /// Number of rows the chunk covers.
    pub row_count: u32,
}

/// Index state of one storage segment: an ordered list of finalized chunks
/// and, while the segment is still being written, the active memory indexer.
pub struct SegmentIndexEntry {
    segment_id: u32,
    base_row_id: RowId,
    memory_indexer: Option<MemoryIndexer>,
    chunks: Vec<ChunkIndexEntry>,
}

impl SegmentIndexEntry {
    pub fn new(segment_id: u32, base_row_id: RowId) -> SegmentIndexEntry {
        SegmentIndexEntry {
            segment_id,
            base_row_id,
            memory_indexer: None,
            chunks: Vec::new(),
        }
    }

    pub fn segment_id(&self) -> u32 {
        self.segment_id
    }

    pub fn base_row_id(&self) -> RowId {
        self.base_row_id
    }

    /// Registers a dumped chunk. Chunks are queried in registration order.
    pub fn add_chunk(&mut self, chunk_name: &str, base_row_id: RowId, row_count: u32) {
        self.chunks.push(ChunkIndexEntry {
            chunk_name: chunk_name.to_string(),
            base_row_id,
            row_count,
        });
    }

    /// Transfers ownership of a still-growing indexer into the entry.
    ///
    /// Rejected with [`Error::Config`] if an active indexer is already
    /// present.
    pub fn set_memory_indexer(&mut self, indexer: MemoryIndexer) -> Result<()> {
        if self.memory_indexer.is_some() {
            return Err(Error::Config(format!(
                "segment {} already has an active memory indexer",
                self.segment_id
            )));
        }
        self.memory_indexer = Some(indexer);
        Ok(())
    }

    pub fn memory_indexer(&self) -> Option<&MemoryIndexer> {
        self.memory_indexer.as_ref()
    }

    pub fn chunks(&self) -> &[ChunkIndexEntry] {
        &self.chunks
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::SegmentIndexEntry;
    use crate::directory::RamDirectory;
    use crate::index::{MemoryIndexer, ThreadPool};
    use crate::{RecordOption, RowId};

    fn indexer() -> MemoryIndexer {
        MemoryIndexer::new(
            Arc::new(RamDirectory::default()),
            "chunk0",
            RowId::new(0, 0),
            RecordOption::ALL,
            "standard",
            Arc::new(ThreadPool::new(1).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_single_active_indexer() {
        let mut entry = SegmentIndexEntry::new(0, RowId::new(0, 0));
        assert!(entry.memory_indexer().is_none());
        entry.set_memory_indexer(indexer()).unwrap();
        assert!(entry.memory_indexer().is_some());
        assert!(entry.set_memory_indexer(indexer()).is_err());
    }

    #[test]
    fn test_chunks_keep_registration_order() {
        let mut entry = SegmentIndexEntry::new(0, RowId::new(0, 0));
        entry.add_chunk("chunk0", RowId::new(0, 0), 4);
        entry.add_chunk("chunk1", RowId::new(0, 4), 2);
        let names: Vec<&str> = entry
            .chunks()
            .iter()
            .map(|chunk| chunk.chunk_name.as_str())
            .collect();
        assert_eq!(names, vec!["chunk0", "chunk1"]);
    }
}
