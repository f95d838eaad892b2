//! Posting lists: their binary format, per-term writers and the multi-segment
//! reading path.
//!
//! A posting list is a sequence of fixed-size blocks of
//! [`BLOCK_SIZE`](compression::BLOCK_SIZE) records. Doc ids are
//! delta-encoded and bit-packed, term frequencies bit-packed, and positions
//! live in a separate stream of bit-packed delta blocks. A skip stream ahead
//! of the blocks carries `(last_doc, bit widths, tf_sum)` per block.

pub(crate) mod compression;
mod posting_iterator;
mod posting_writer;
mod segment_posting;
pub(crate) mod skip;

use crate::directory::OwnedBytes;
use crate::postings::compression::read_u32_vint;
use crate::RecordOption;

pub use self::posting_iterator::PostingIterator;
pub use self::posting_writer::PostingWriter;
pub use self::segment_posting::SegmentPosting;

/// The sealed, immutable bytes of one term's posting list, together with the
/// statistics stored next to it in the chunk dictionary.
#[derive(Clone, Debug)]
pub struct PostingData {
    /// Skip stream, doc/tf blocks and position blocks, length-prefixed.
    pub bytes: OwnedBytes,
    /// Number of documents containing the term.
    pub doc_freq: u32,
    /// Sum of term frequencies over all documents.
    pub total_term_freq: u64,
    /// Which streams `bytes` actually contains.
    pub record_option: RecordOption,
}

impl PostingData {
    /// Splits the posting bytes into its three streams:
    /// `(skip, doc/tf blocks, positions)`.
    pub(crate) fn streams(&self) -> (OwnedBytes, OwnedBytes, Option<OwnedBytes>) {
        let slice = self.bytes.as_slice();
        let mut cursor = slice;
        let skip_len = read_u32_vint(&mut cursor) as usize;
        let skip_start = slice.len() - cursor.len();
        let skip = self.bytes.slice(skip_start..skip_start + skip_len);
        cursor = &cursor[skip_len..];
        let doc_len = read_u32_vint(&mut cursor) as usize;
        let doc_start = slice.len() - cursor.len();
        let docs = self.bytes.slice(doc_start..doc_start + doc_len);
        cursor = &cursor[doc_len..];
        let positions = if self.record_option.has_positions() {
            let pos_len = read_u32_vint(&mut cursor) as usize;
            let pos_start = slice.len() - cursor.len();
            Some(self.bytes.slice(pos_start..pos_start + pos_len))
        } else {
            None
        };
        (skip, docs, positions)
    }
}
