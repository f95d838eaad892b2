//! Property tests pitting the block/skip decoding path against a naive
//! reference implementation.

use proptest::prelude::*;

use textindex::postings::{PostingIterator, PostingWriter, SegmentPosting};
use textindex::{RecordOption, RowId, INVALID_ROWID};

fn build_iterator(docs: &[u32]) -> PostingIterator {
    let mut writer = PostingWriter::new(RecordOption::ALL);
    for &doc in docs {
        writer.add_position(doc, 0);
        if doc % 3 == 0 {
            writer.add_position(doc, doc + 1);
        }
    }
    let posting = SegmentPosting::new(RowId::new(0, 0), writer.serialize());
    PostingIterator::new(RecordOption::ALL, vec![posting])
}

/// Smallest doc >= target in a sorted vector, the obvious way.
fn reference_seek(docs: &[u32], target: u32) -> Option<u32> {
    docs.iter().copied().find(|&doc| doc >= target)
}

fn sorted_doc_ids() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::btree_set(0u32..10_000u32, 1..600usize)
        .prop_map(|set| set.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_seek_doc_matches_reference(docs in sorted_doc_ids(),
                                       targets in proptest::collection::vec(0u32..10_100u32, 1..40usize)) {
        let mut sorted_targets = targets;
        sorted_targets.sort_unstable();
        let mut iterator = build_iterator(&docs);
        let mut floor = 0u32;
        for target in sorted_targets {
            // the iterator is forward-only; clamp the reference accordingly
            let clamped = target.max(floor);
            let expected = reference_seek(&docs, clamped)
                .map(|doc| RowId::new(0, doc))
                .unwrap_or(INVALID_ROWID);
            let got = iterator.seek_doc(RowId::new(0, clamped));
            prop_assert_eq!(got, expected);
            if got != INVALID_ROWID {
                floor = got.segment_offset();
            }
        }
    }

    #[test]
    fn test_full_walk_matches_input(docs in sorted_doc_ids()) {
        let mut iterator = build_iterator(&docs);
        let mut walked = Vec::new();
        let mut cursor = RowId::new(0, 0);
        loop {
            let doc = iterator.seek_doc(cursor);
            if doc == INVALID_ROWID {
                break;
            }
            walked.push(doc.segment_offset());
            cursor = doc.next();
        }
        prop_assert_eq!(walked, docs);
    }
}
