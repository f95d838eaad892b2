//! The iterator abstraction query trees are compiled into.

use crate::{RowId, INVALID_ROWID};

/// A forward-only cursor over a sorted set of row ids.
///
/// A fresh iterator is already positioned on its first document (or on
/// [`INVALID_ROWID`] if it is empty). `seek` never moves backwards: seeking
/// below the current doc returns the current doc.
pub trait DocIterator {
    /// The document the iterator points at; [`INVALID_ROWID`] once
    /// exhausted.
    fn doc(&self) -> RowId;

    /// Advances to the smallest doc >= `target` and returns it, or
    /// [`INVALID_ROWID`] if the set is exhausted.
    fn seek(&mut self, target: RowId) -> RowId;

    /// Upper bound on the number of documents this iterator yields.
    fn doc_freq(&self) -> u32;
}

impl DocIterator for Box<dyn DocIterator> {
    fn doc(&self) -> RowId {
        (**self).doc()
    }

    fn seek(&mut self, target: RowId) -> RowId {
        (**self).seek(target)
    }

    fn doc_freq(&self) -> u32 {
        (**self).doc_freq()
    }
}

/// Iterator over no documents at all.
pub struct EmptyDocIterator;

impl DocIterator for EmptyDocIterator {
    fn doc(&self) -> RowId {
        INVALID_ROWID
    }

    fn seek(&mut self, _target: RowId) -> RowId {
        INVALID_ROWID
    }

    fn doc_freq(&self) -> u32 {
        0u32
    }
}

/// Iterator over an explicit doc id vector. Used by unit tests of the
/// boolean operators.
pub struct VecDocIterator {
    docs: Vec<RowId>,
    cursor: usize,
}

impl VecDocIterator {
    pub fn new(docs: Vec<RowId>) -> VecDocIterator {
        debug_assert!(docs.windows(2).all(|pair| pair[0] < pair[1]));
        VecDocIterator { docs, cursor: 0 }
    }
}

impl From<Vec<u64>> for VecDocIterator {
    fn from(docs: Vec<u64>) -> VecDocIterator {
        VecDocIterator::new(docs.into_iter().map(RowId::from_u64).collect())
    }
}

impl DocIterator for VecDocIterator {
    fn doc(&self) -> RowId {
        self.docs.get(self.cursor).copied().unwrap_or(INVALID_ROWID)
    }

    fn seek(&mut self, target: RowId) -> RowId {
        while self.cursor < self.docs.len() && self.docs[self.cursor] < target {
            self.cursor += 1;
        }
        self.doc()
    }

    fn doc_freq(&self) -> u32 {
        self.docs.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::{DocIterator, EmptyDocIterator, VecDocIterator};
    use crate::{RowId, INVALID_ROWID};

    #[test]
    fn test_vec_doc_iterator() {
        let mut iter = VecDocIterator::from(vec![1u64, 3, 9]);
        assert_eq!(iter.doc(), RowId::from_u64(1));
        assert_eq!(iter.seek(RowId::from_u64(2)), RowId::from_u64(3));
        assert_eq!(iter.seek(RowId::from_u64(3)), RowId::from_u64(3));
        assert_eq!(iter.seek(RowId::from_u64(10)), INVALID_ROWID);
        assert_eq!(iter.doc(), INVALID_ROWID);
    }

    #[test]
    fn test_empty_doc_iterator() {
        let mut iter = EmptyDocIterator;
        assert_eq!(iter.doc(), INVALID_ROWID);
        assert_eq!(iter.seek(RowId::from_u64(0)), INVALID_ROWID);
        assert_eq!(iter.doc_freq(), 0);
    }
}
