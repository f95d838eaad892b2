#![doc(test(attr(allow(unused_variables), deny(warnings))))]
#![warn(missing_docs)]

//! # `textindex`
//!
//! textindex is the full-text indexing engine of a multi-modal database.
//! It turns textual column values into block-compressed posting lists,
//! persists those lists into immutable chunk files, and answers boolean and
//! phrase queries through a merging iterator tree.
//!
//! A minimal ingest-and-query round trip:
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! use textindex::directory::RamDirectory;
//! use textindex::index::{ColumnIndexReader, MemoryIndexer, SegmentIndexEntry, ThreadPool};
//! use textindex::{RecordOption, RowId, INVALID_ROWID};
//!
//! # fn main() -> textindex::Result<()> {
//! let dir = Arc::new(RamDirectory::default());
//! let pool = Arc::new(ThreadPool::new(4)?);
//! let column = Arc::new(vec![
//!     "the quick brown fox".to_string(),
//!     "the lazy dog".to_string(),
//! ]);
//!
//! let indexer = MemoryIndexer::new(
//!     dir.clone(),
//!     "chunk0",
//!     RowId::new(0, 0),
//!     RecordOption::ALL,
//!     "standard",
//!     pool,
//! )?;
//! indexer.insert(column, 0, 2)?;
//! indexer.commit_sync()?;
//! indexer.dump(false, false)?;
//!
//! let mut entry = SegmentIndexEntry::new(0, RowId::new(0, 0));
//! entry.add_chunk("chunk0", RowId::new(0, 0), 2);
//! let mut segments = BTreeMap::new();
//! segments.insert(0u32, entry);
//!
//! let reader = ColumnIndexReader::open(RecordOption::ALL, dir, segments)?;
//! let mut postings = reader.lookup("quick")?.unwrap();
//! assert_eq!(postings.seek_doc(RowId::new(0, 0)), RowId::new(0, 0));
//! assert_eq!(postings.seek_doc(RowId::new(0, 1)), INVALID_ROWID);
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod analyzer;
pub mod directory;
mod error;
pub mod index;
pub mod postings;
pub mod query;

use std::fmt;
use std::ops::Add;

pub use crate::error::Error;

/// `textindex`'s result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Document identifier local to one segment.
///
/// Posting lists store these; the segment id is re-applied by the
/// [`PostingIterator`](crate::postings::PostingIterator) when a document is
/// handed back to the caller as a [`RowId`].
pub type DocId = u32;

/// Sentinel `DocId` marking an exhausted posting cursor.
pub const TERMINATED: DocId = u32::MAX;

/// A token position within one document, counted in tokens from 0.
pub type Position = u32;

/// Sentinel returned by position seeks that ran past the last occurrence.
pub const INVALID_POSITION: Position = u32::MAX;

/// Global document identifier: `(segment_id, segment_offset)` packed in 64
/// bits. Row ids are assigned by ingest, are monotone within a segment and
/// are never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(u64);

/// Sentinel `RowId` returned when a document iterator is exhausted.
pub const INVALID_ROWID: RowId = RowId(u64::MAX);

impl RowId {
    /// Builds a row id from its segment id and offset within the segment.
    pub const fn new(segment_id: u32, segment_offset: u32) -> RowId {
        RowId(((segment_id as u64) << 32) | segment_offset as u64)
    }

    /// Reinterprets a packed 64-bit value as a row id.
    pub const fn from_u64(val: u64) -> RowId {
        RowId(val)
    }

    /// The packed 64-bit representation.
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    /// Segment this row belongs to.
    pub const fn segment_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Offset of the row within its segment.
    pub const fn segment_offset(self) -> u32 {
        self.0 as u32
    }

    /// The smallest row id strictly greater than `self`.
    pub const fn next(self) -> RowId {
        RowId(self.0 + 1)
    }
}

impl Add<u32> for RowId {
    type Output = RowId;

    fn add(self, rhs: u32) -> RowId {
        RowId(self.0 + rhs as u64)
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == INVALID_ROWID {
            write!(f, "RowId(INVALID)")
        } else {
            write!(f, "RowId({}:{})", self.segment_id(), self.segment_offset())
        }
    }
}

/// Which posting streams an index records.
///
/// The variants are strictly ordered: frequencies imply doc ids, positions
/// imply frequencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordOption {
    /// Only the documents containing the term are recorded.
    Basic,
    /// Doc ids and term frequencies.
    WithFreqs,
    /// Doc ids, term frequencies and token positions.
    WithFreqsAndPositions,
}

impl RecordOption {
    /// Everything the engine can record.
    pub const ALL: RecordOption = RecordOption::WithFreqsAndPositions;

    /// Returns true if term frequencies are recorded.
    pub fn has_freq(&self) -> bool {
        *self >= RecordOption::WithFreqs
    }

    /// Returns true if token positions are recorded.
    pub fn has_positions(&self) -> bool {
        *self == RecordOption::WithFreqsAndPositions
    }

    pub(crate) fn to_flags(self) -> u32 {
        match self {
            RecordOption::Basic => 0,
            RecordOption::WithFreqs => 1,
            RecordOption::WithFreqsAndPositions => 2,
        }
    }

    pub(crate) fn from_flags(flags: u32) -> Option<RecordOption> {
        match flags {
            0 => Some(RecordOption::Basic),
            1 => Some(RecordOption::WithFreqs),
            2 => Some(RecordOption::WithFreqsAndPositions),
            _ => None,
        }
    }
}
