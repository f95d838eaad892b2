//! Exclusion filtering, supporting the `AND NOT` shape of query trees.

use crate::query::DocIterator;
use crate::{RowId, INVALID_ROWID};

/// Yields the docs of `include` that do not appear in `exclude`.
pub struct ExcludeIterator {
    include: Box<dyn DocIterator>,
    exclude: Box<dyn DocIterator>,
    current: RowId,
}

impl ExcludeIterator {
    pub fn new(include: Box<dyn DocIterator>, exclude: Box<dyn DocIterator>) -> ExcludeIterator {
        let mut iterator = ExcludeIterator {
            include,
            exclude,
            current: INVALID_ROWID,
        };
        let first = iterator.include.doc();
        iterator.current = iterator.first_clear_doc(first);
        iterator
    }

    fn first_clear_doc(&mut self, mut doc: RowId) -> RowId {
        while doc != INVALID_ROWID && self.exclude.seek(doc) == doc {
            doc = self.include.seek(doc.next());
        }
        doc
    }
}

impl DocIterator for ExcludeIterator {
    fn doc(&self) -> RowId {
        self.current
    }

    fn seek(&mut self, target: RowId) -> RowId {
        if self.current == INVALID_ROWID || target <= self.current {
            return self.current;
        }
        let doc = self.include.seek(target);
        self.current = self.first_clear_doc(doc);
        self.current
    }

    fn doc_freq(&self) -> u32 {
        // upper bound; exclusions cannot grow the set
        self.include.doc_freq()
    }
}
