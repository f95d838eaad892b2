//! Heap-based disjunction.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::query::DocIterator;
use crate::{RowId, INVALID_ROWID};

/// Union of its children, merged through a min-heap keyed by each child's
/// current doc.
pub struct OrIterator {
    children: Vec<Box<dyn DocIterator>>,
    heap: BinaryHeap<Reverse<(u64, usize)>>,
    current: RowId,
}

impl OrIterator {
    pub fn new(children: Vec<Box<dyn DocIterator>>) -> OrIterator {
        let heap = children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.doc() != INVALID_ROWID)
            .map(|(ord, child)| Reverse((child.doc().to_u64(), ord)))
            .collect::<BinaryHeap<_>>();
        let current = heap
            .peek()
            .map(|Reverse((doc, _))| RowId::from_u64(*doc))
            .unwrap_or(INVALID_ROWID);
        OrIterator {
            children,
            heap,
            current,
        }
    }
}

impl DocIterator for OrIterator {
    fn doc(&self) -> RowId {
        self.current
    }

    fn seek(&mut self, target: RowId) -> RowId {
        if self.current == INVALID_ROWID || target <= self.current {
            return self.current;
        }
        while let Some(&Reverse((doc, ord))) = self.heap.peek() {
            if RowId::from_u64(doc) >= target {
                break;
            }
            self.heap.pop();
            let doc = self.children[ord].seek(target);
            if doc != INVALID_ROWID {
                self.heap.push(Reverse((doc.to_u64(), ord)));
            }
        }
        self.current = self
            .heap
            .peek()
            .map(|Reverse((doc, _))| RowId::from_u64(*doc))
            .unwrap_or(INVALID_ROWID);
        self.current
    }

    fn doc_freq(&self) -> u32 {
        self.children
            .iter()
            .map(|child| child.doc_freq())
            .fold(0u32, u32::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::OrIterator;
    use crate::query::{DocIterator, VecDocIterator};
    use crate::{RowId, INVALID_ROWID};

    fn or_over(sets: Vec<Vec<u64>>) -> OrIterator {
        OrIterator::new(
            sets.into_iter()
                .map(|docs| Box::new(VecDocIterator::from(docs)) as Box<dyn DocIterator>)
                .collect(),
        )
    }

    fn drain(mut iterator: impl DocIterator) -> Vec<u64> {
        let mut docs = Vec::new();
        let mut doc = iterator.doc();
        while doc != INVALID_ROWID {
            docs.push(doc.to_u64());
            doc = iterator.seek(doc.next());
        }
        docs
    }

    #[test]
    fn test_or_is_set_union() {
        let iterator = or_over(vec![vec![1, 3, 9], vec![3, 4, 9, 18], vec![0, 5]]);
        assert_eq!(drain(iterator), vec![0, 1, 3, 4, 5, 9, 18]);
    }

    #[test]
    fn test_or_seek() {
        let mut iterator = or_over(vec![vec![1, 9], vec![4, 18]]);
        assert_eq!(iterator.doc(), RowId::from_u64(1));
        assert_eq!(iterator.seek(RowId::from_u64(5)), RowId::from_u64(9));
        assert_eq!(iterator.seek(RowId::from_u64(10)), RowId::from_u64(18));
        assert_eq!(iterator.seek(RowId::from_u64(19)), INVALID_ROWID);
    }

    #[test]
    fn test_or_with_empty_child() {
        let iterator = or_over(vec![vec![], vec![2, 4]]);
        assert_eq!(drain(iterator), vec![2, 4]);
    }

    #[test]
    fn test_or_doc_freq_is_sum() {
        let iterator = or_over(vec![vec![1, 3, 9], vec![3, 4]]);
        assert_eq!(iterator.doc_freq(), 5);
    }
}
