use crate::postings::PostingData;
use crate::RowId;

/// Reader handle to one term's postings within one chunk or one live memory
/// indexer.
///
/// Doc ids inside [`PostingData`] are segment-relative; `base_row_id`
/// supplies the segment they re-base into.
#[derive(Clone, Debug)]
pub struct SegmentPosting {
    base_row_id: RowId,
    data: PostingData,
}

impl SegmentPosting {
    pub fn new(base_row_id: RowId, data: PostingData) -> SegmentPosting {
        SegmentPosting { base_row_id, data }
    }

    pub fn base_row_id(&self) -> RowId {
        self.base_row_id
    }

    pub fn doc_freq(&self) -> u32 {
        self.data.doc_freq
    }

    pub fn total_term_freq(&self) -> u64 {
        self.data.total_term_freq
    }

    pub(crate) fn data(&self) -> &PostingData {
        &self.data
    }
}
