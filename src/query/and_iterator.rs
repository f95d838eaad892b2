//! Skip-based conjunction.

use crate::query::DocIterator;
use crate::{RowId, INVALID_ROWID};

/// Zig-zag intersection of its children.
///
/// Children are kept sorted ascending by `doc_freq`, so each candidate is
/// first tested against the rarest term and seeks on dense terms are kept to
/// a minimum.
pub struct AndIterator {
    children: Vec<Box<dyn DocIterator>>,
    current: RowId,
}

impl AndIterator {
    pub fn new(mut children: Vec<Box<dyn DocIterator>>) -> AndIterator {
        assert!(!children.is_empty(), "conjunction over no children");
        children.sort_by_key(|child| child.doc_freq());
        let mut iterator = AndIterator {
            children,
            current: INVALID_ROWID,
        };
        iterator.current = iterator.do_seek(RowId::from_u64(0));
        iterator
    }

    fn do_seek(&mut self, target: RowId) -> RowId {
        let mut candidate = target;
        let mut child_ord = 0usize;
        while child_ord < self.children.len() {
            let doc = self.children[child_ord].seek(candidate);
            if doc == INVALID_ROWID {
                return INVALID_ROWID;
            }
            if doc != candidate {
                // restart from the first iterator, it has the fewest docs
                candidate = doc;
                child_ord = 0;
            } else {
                child_ord += 1;
            }
        }
        candidate
    }
}

impl DocIterator for AndIterator {
    fn doc(&self) -> RowId {
        self.current
    }

    fn seek(&mut self, target: RowId) -> RowId {
        if self.current == INVALID_ROWID || target <= self.current {
            return self.current;
        }
        self.current = self.do_seek(target);
        self.current
    }

    fn doc_freq(&self) -> u32 {
        self.children
            .iter()
            .map(|child| child.doc_freq())
            .min()
            .unwrap_or(0u32)
    }
}
