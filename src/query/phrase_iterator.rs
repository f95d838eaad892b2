//! Position-aware intersection.

use crate::query::term_iterator::TermDocIterator;
use crate::query::DocIterator;
use crate::{Position, RowId, INVALID_POSITION, INVALID_ROWID};

/// Emits the docs in which its children occur at consecutive positions
/// `p, p+1, ..., p+k-1` for some `p`.
///
/// Children are term iterators in phrase order; child `i` is expected at
/// position offset `i`.
pub struct PhraseIterator {
    children: Vec<TermDocIterator>,
    current: RowId,
}

impl PhraseIterator {
    pub fn new(children: Vec<TermDocIterator>) -> PhraseIterator {
        assert!(!children.is_empty(), "phrase over no terms");
        let mut iterator = PhraseIterator {
            children,
            current: INVALID_ROWID,
        };
        iterator.current = iterator.do_seek(RowId::from_u64(0));
        iterator
    }

    /// Conjunction on doc ids only, ignoring positions.
    fn conjunction_seek(&mut self, target: RowId) -> RowId {
        let mut candidate = target;
        let mut child_ord = 0usize;
        while child_ord < self.children.len() {
            let doc = self.children[child_ord].seek(candidate);
            if doc == INVALID_ROWID {
                return INVALID_ROWID;
            }
            if doc != candidate {
                candidate = doc;
                child_ord = 0;
            } else {
                child_ord += 1;
            }
        }
        candidate
    }

    /// True if the current doc contains at least one aligned sequence.
    fn phrase_match(&mut self) -> bool {
        let mut start: Position = match self.children[0].seek_position(0) {
            INVALID_POSITION => return false,
            pos => pos,
        };
        'candidate: loop {
            for child_ord in 1..self.children.len() {
                let expected = start + child_ord as u32;
                let found = self.children[child_ord].seek_position(expected);
                if found == INVALID_POSITION {
                    return false;
                }
                if found != expected {
                    // this child lags past the expected slot; the next
                    // possible start is found - child_ord
                    start = match self.children[0].seek_position(found - child_ord as u32) {
                        INVALID_POSITION => return false,
                        pos => pos,
                    };
                    continue 'candidate;
                }
            }
            return true;
        }
    }

    fn do_seek(&mut self, target: RowId) -> RowId {
        let mut candidate = target;
        loop {
            let doc = self.conjunction_seek(candidate);
            if doc == INVALID_ROWID {
                return INVALID_ROWID;
            }
            if self.phrase_match() {
                return doc;
            }
            candidate = doc.next();
        }
    }
}

impl DocIterator for PhraseIterator {
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
            .map(TermDocIterator::doc_freq)
            .min()
            .unwrap_or(0u32)
    }
}

#[cfg(test)]
mod tests {
    use super::PhraseIterator;
    use crate::postings::{PostingIterator, PostingWriter, SegmentPosting};
    use crate::query::term_iterator::TermDocIterator;
    use crate::query::DocIterator;
    use crate::{RecordOption, RowId, INVALID_ROWID};

    /// Builds one term iterator from `(doc, positions)` pairs.
    fn term(occurrences: &[(u32, &[u32])]) -> TermDocIterator {
        let mut writer = PostingWriter::new(RecordOption::ALL);
        for (doc, positions) in occurrences {
            for &pos in *positions {
                writer.add_position(*doc, pos);
            }
        }
        let posting = SegmentPosting::new(RowId::new(0, 0), writer.serialize());
        TermDocIterator::new(PostingIterator::new(RecordOption::ALL, vec![posting]))
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
    fn test_phrase_requires_consecutive_positions() {
        // doc 0: "a b" at (0,1) -> match; doc 1: "a .. b" -> no match
        let a = term(&[(0, &[0]), (1, &[0])]);
        let b = term(&[(0, &[1]), (1, &[2])]);
        assert_eq!(drain(PhraseIterator::new(vec![a, b])), vec![0]);
    }

    #[test]
    fn test_phrase_later_alignment() {
        // doc 0: a at {0, 7}, b at {3, 8}: only (7, 8) aligns
        let a = term(&[(0, &[0, 7])]);
        let b = term(&[(0, &[3, 8])]);
        assert_eq!(drain(PhraseIterator::new(vec![a, b])), vec![0]);
    }

    #[test]
    fn test_phrase_three_terms() {
        // "x y z" present in doc 2 only
        let x = term(&[(0, &[0]), (2, &[4, 10])]);
        let y = term(&[(0, &[2]), (2, &[5])]);
        let z = term(&[(0, &[3]), (2, &[6])]);
        assert_eq!(drain(PhraseIterator::new(vec![x, y, z])), vec![2]);
    }

    #[test]
    fn test_phrase_no_doc_overlap() {
        let a = term(&[(0, &[0])]);
        let b = term(&[(1, &[1])]);
        assert_eq!(drain(PhraseIterator::new(vec![a, b])), Vec::<u64>::new());
    }
}
