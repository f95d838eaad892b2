use crate::postings::PostingIterator;
use crate::query::DocIterator;
use crate::{Position, RowId, INVALID_ROWID};

/// Leaf of the iterator tree: one term's postings as a [`DocIterator`],
/// with the term frequency and position cursor of the underlying posting
/// list exposed for phrase matching and scoring callers.
pub struct TermDocIterator {
    postings: PostingIterator,
    current: RowId,
}

impl TermDocIterator {
    pub fn new(mut postings: PostingIterator) -> TermDocIterator {
        let current = postings.seek_doc(RowId::from_u64(0));
        TermDocIterator { postings, current }
    }

    /// Term frequency within the current doc.
    pub fn current_tf(&self) -> u32 {
        self.postings.current_tf()
    }

    /// Smallest position >= `from` within the current doc.
    pub fn seek_position(&mut self, from: Position) -> Position {
        self.postings.seek_position(from)
    }

    /// Summed total term frequency over all segments.
    pub fn total_term_freq(&self) -> u64 {
        self.postings.total_term_freq()
    }
}

impl DocIterator for TermDocIterator {
    fn doc(&self) -> RowId {
        self.current
    }

    fn seek(&mut self, target: RowId) -> RowId {
        if self.current != INVALID_ROWID && target <= self.current {
            return self.current;
        }
        self.current = self.postings.seek_doc(target);
        self.current
    }

    fn doc_freq(&self) -> u32 {
        self.postings.doc_freq()
    }
}
