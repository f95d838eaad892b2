//! Query-side façade over every segment of one column.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::directory::Directory;
use crate::index::chunk::ChunkReader;
use crate::index::SegmentIndexEntry;
use crate::postings::{PostingIterator, SegmentPosting};
use crate::{Error, RecordOption, Result, RowId};

/// Read view over all chunks and active memory indexers of one column.
///
/// Chunk files are opened and validated eagerly. A chunk failing format
/// validation is quarantined: it is logged, excluded from lookups, and the
/// reader keeps serving from the remaining chunks.
pub struct ColumnIndexReader {
    record_option: RecordOption,
    segments: BTreeMap<u32, SegmentIndexEntry>,
    chunk_readers: Vec<(RowId, ChunkReader)>,
    quarantined: Vec<PathBuf>,
}

impl ColumnIndexReader {
    /// Opens every registered chunk of every segment.
    pub fn open(
        record_option: RecordOption,
        directory: Arc<dyn Directory>,
        segments: BTreeMap<u32, SegmentIndexEntry>,
    ) -> Result<ColumnIndexReader> {
        let mut chunk_readers = Vec::new();
        let mut quarantined = Vec::new();
        for (segment_id, entry) in &segments {
            for chunk in entry.chunks() {
                let path = PathBuf::from(format!(
                    "{segment_id}/ft/{}.idx",
                    chunk.chunk_name
                ));
                match ChunkReader::open(&directory, &path) {
                    Ok(reader) => chunk_readers.push((chunk.base_row_id, reader)),
                    Err(err @ Error::Format { .. }) => {
                        error!("quarantining unreadable chunk {path:?}: {err}");
                        quarantined.push(path);
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(ColumnIndexReader {
            record_option,
            segments,
            chunk_readers,
            quarantined,
        })
    }

    /// Chunks excluded because they failed format validation.
    pub fn quarantined_chunks(&self) -> &[PathBuf] {
        &self.quarantined
    }

    /// Opens a posting iterator over every occurrence of `term`, or `None`
    /// if no segment contains it.
    pub fn lookup(&self, term: &str) -> Result<Option<PostingIterator>> {
        let mut postings: Vec<SegmentPosting> = Vec::new();
        for (base_row_id, reader) in &self.chunk_readers {
            if let Some(data) = reader.get(term) {
                postings.push(SegmentPosting::new(*base_row_id, data));
            }
        }
        for entry in self.segments.values() {
            if let Some(indexer) = entry.memory_indexer() {
                if let Some(posting) = indexer.lookup(term) {
                    postings.push(posting);
                }
            }
        }
        if postings.is_empty() {
            return Ok(None);
        }
        Ok(Some(PostingIterator::new(self.record_option, postings)))
    }
}
