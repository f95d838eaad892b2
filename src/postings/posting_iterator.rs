//! Decoding path: one term's postings across every segment it appears in.

use crate::directory::OwnedBytes;
use crate::postings::compression::{packed_block_size, BlockDecoder, BLOCK_SIZE};
use crate::postings::skip::{BlockInfo, SkipReader};
use crate::postings::SegmentPosting;
use crate::{DocId, Position, RecordOption, RowId, INVALID_POSITION, INVALID_ROWID};

/// Cursor over the bit-packed position stream of one posting list.
///
/// Offsets are in number of positions. Reads may go backwards (phrase
/// checks revisit a record); the reader then re-walks the block headers
/// from the start of the stream.
struct PositionReader {
    data: OwnedBytes,
    decoder: BlockDecoder,
    loaded_block: usize,
    anchor_block: usize,
    anchor_byte: usize,
}

const NO_BLOCK: usize = usize::MAX;

impl PositionReader {
    fn new(data: OwnedBytes) -> PositionReader {
        PositionReader {
            data,
            decoder: BlockDecoder::new(),
            loaded_block: NO_BLOCK,
            anchor_block: 0,
            anchor_byte: 0,
        }
    }

    fn load_block(&mut self, block_idx: usize) {
        if self.loaded_block == block_idx {
            return;
        }
        if block_idx < self.anchor_block {
            self.anchor_block = 0;
            self.anchor_byte = 0;
        }
        let data = self.data.as_slice();
        while self.anchor_block < block_idx {
            let num_bits = data[self.anchor_byte];
            self.anchor_byte += 1 + packed_block_size(num_bits);
            self.anchor_block += 1;
        }
        let num_bits = data[self.anchor_byte];
        self.decoder
            .uncompress_block_unsorted(&data[self.anchor_byte + 1..], num_bits);
        self.loaded_block = block_idx;
    }

    /// Fills `output` with the position deltas starting at `offset`.
    fn read(&mut self, offset: u64, output: &mut [u32]) {
        let mut offset = offset as usize;
        let mut written = 0usize;
        while written < output.len() {
            let block_idx = offset / BLOCK_SIZE;
            let within = offset % BLOCK_SIZE;
            self.load_block(block_idx);
            let take = (BLOCK_SIZE - within).min(output.len() - written);
            output[written..written + take]
                .copy_from_slice(&self.decoder.output_array()[within..within + take]);
            written += take;
            offset += take;
        }
    }
}

/// Decodes one term's postings within a single segment posting.
struct PostingDecoder {
    record_option: RecordOption,
    skip_reader: SkipReader,
    doc_data: OwnedBytes,
    position_reader: Option<PositionReader>,
    doc_decoder: BlockDecoder,
    tf_decoder: BlockDecoder,
    loaded_offset: usize,
    block_len: usize,
    idx: usize,
    exhausted: bool,
    // absolute positions of the record the cursor points at
    positions: Vec<Position>,
    positions_for: Option<(usize, usize)>,
}

impl PostingDecoder {
    fn new(posting: &SegmentPosting, requested: RecordOption) -> PostingDecoder {
        let data = posting.data();
        let record_option = data.record_option.min(requested);
        let (skip, docs, positions) = data.streams();
        let position_reader = if record_option.has_positions() {
            positions.map(PositionReader::new)
        } else {
            None
        };
        PostingDecoder {
            record_option: data.record_option,
            skip_reader: SkipReader::new(skip, data.doc_freq, data.record_option),
            doc_data: docs,
            position_reader,
            doc_decoder: BlockDecoder::new(),
            tf_decoder: BlockDecoder::new(),
            loaded_offset: NO_BLOCK,
            block_len: 0,
            idx: 0,
            exhausted: false,
            positions: Vec::new(),
            positions_for: None,
        }
    }

    fn load_block(&mut self) {
        let offset = self.skip_reader.byte_offset();
        if self.loaded_offset == offset {
            return;
        }
        let data = &self.doc_data.as_slice()[offset..];
        let prev_last_doc = self.skip_reader.last_doc_in_previous_block;
        match self.skip_reader.block_info() {
            BlockInfo::BitPacked {
                doc_num_bits,
                tf_num_bits,
                ..
            } => {
                let consumed = self
                    .doc_decoder
                    .uncompress_block_sorted(data, prev_last_doc, doc_num_bits);
                if self.record_option.has_freq() {
                    self.tf_decoder
                        .uncompress_block_unsorted(&data[consumed..], tf_num_bits);
                }
                self.block_len = BLOCK_SIZE;
            }
            BlockInfo::VInt { num_docs } => {
                let consumed =
                    self.doc_decoder
                        .uncompress_vint_sorted(data, prev_last_doc, num_docs as usize);
                if self.record_option.has_freq() {
                    self.tf_decoder
                        .uncompress_vint_unsorted(&data[consumed..], num_docs as usize);
                }
                self.block_len = num_docs as usize;
            }
        }
        self.loaded_offset = offset;
        self.idx = 0;
    }

    /// Positions the cursor on the smallest doc >= `target`, if any.
    ///
    /// The cursor only moves forward: seeking below the current doc returns
    /// the current doc.
    fn seek(&mut self, target: DocId) -> Option<DocId> {
        if self.exhausted {
            return None;
        }
        if self.loaded_offset != NO_BLOCK
            && self.idx < self.block_len
            && self.doc_decoder.output(self.idx) >= target
        {
            return Some(self.doc_decoder.output(self.idx));
        }
        self.skip_reader.seek(target);
        self.load_block();
        while self.idx < self.block_len && self.doc_decoder.output(self.idx) < target {
            self.idx += 1;
        }
        if self.idx == self.block_len {
            // only the trailing vint block can run out this way
            self.exhausted = true;
            return None;
        }
        Some(self.doc_decoder.output(self.idx))
    }

    fn current_tf(&self) -> u32 {
        if self.record_option.has_freq() {
            self.tf_decoder.output(self.idx)
        } else {
            1u32
        }
    }

    /// Number of positions spanned by the records before the cursor.
    fn position_offset(&self) -> u64 {
        let mut offset = self.skip_reader.position_offset();
        for record in 0..self.idx {
            offset += self.tf_decoder.output(record) as u64;
        }
        offset
    }

    fn load_positions(&mut self) {
        let key = (self.loaded_offset, self.idx);
        if self.positions_for == Some(key) {
            return;
        }
        let term_freq = self.current_tf() as usize;
        let offset = self.position_offset();
        let reader = self
            .position_reader
            .as_mut()
            .expect("position stream not recorded");
        let mut deltas = vec![0u32; term_freq];
        reader.read(offset, &mut deltas);
        self.positions.clear();
        let mut absolute = 0u32;
        for delta in deltas {
            absolute += delta;
            self.positions.push(absolute);
        }
        self.positions_for = Some(key);
    }

    fn seek_position(&mut self, from: Position) -> Position {
        if self.position_reader.is_none() {
            return INVALID_POSITION;
        }
        self.load_positions();
        let slot = self.positions.partition_point(|&pos| pos < from);
        self.positions
            .get(slot)
            .copied()
            .unwrap_or(INVALID_POSITION)
    }
}

/// Merging cursor over one term's postings in every segment it appears in.
///
/// Segment postings are visited in increasing `base_row_id` order; within a
/// segment the skip stream makes `seek_doc` logarithmic in the number of
/// blocks.
pub struct PostingIterator {
    segments: Vec<(u32, PostingDecoder)>,
    cursor: usize,
    current: RowId,
    doc_freq: u32,
    total_term_freq: u64,
}

impl PostingIterator {
    /// Builds an iterator over `postings`, which need not be sorted.
    pub fn new(requested: RecordOption, mut postings: Vec<SegmentPosting>) -> PostingIterator {
        postings.sort_by_key(SegmentPosting::base_row_id);
        let doc_freq = postings
            .iter()
            .map(SegmentPosting::doc_freq)
            .fold(0u32, u32::saturating_add);
        let total_term_freq = postings.iter().map(SegmentPosting::total_term_freq).sum();
        let segments = postings
            .iter()
            .map(|posting| {
                (
                    posting.base_row_id().segment_id(),
                    PostingDecoder::new(posting, requested),
                )
            })
            .collect();
        PostingIterator {
            segments,
            cursor: 0,
            current: INVALID_ROWID,
            doc_freq,
            total_term_freq,
        }
    }

    /// Advances to the smallest doc id >= `target`; [`INVALID_ROWID`] at the
    /// end. The iterator only moves forward.
    pub fn seek_doc(&mut self, target: RowId) -> RowId {
        while self.cursor < self.segments.len() {
            let (segment_id, decoder) = &mut self.segments[self.cursor];
            let local_target = if target.segment_id() < *segment_id {
                0u32
            } else if target.segment_id() == *segment_id {
                target.segment_offset()
            } else {
                // the whole segment lies before the target
                self.cursor += 1;
                continue;
            };
            match decoder.seek(local_target) {
                Some(doc) => {
                    self.current = RowId::new(*segment_id, doc);
                    return self.current;
                }
                None => {
                    self.cursor += 1;
                }
            }
        }
        self.current = INVALID_ROWID;
        INVALID_ROWID
    }

    /// Term frequency of the last doc returned by `seek_doc`.
    ///
    /// Undefined before the first successful seek.
    pub fn current_tf(&self) -> u32 {
        self.segments
            .get(self.cursor)
            .map(|(_, decoder)| decoder.current_tf())
            .unwrap_or(0u32)
    }

    /// Smallest position >= `from` within the current record, or
    /// [`INVALID_POSITION`] if none.
    pub fn seek_position(&mut self, from: Position) -> Position {
        match self.segments.get_mut(self.cursor) {
            Some((_, decoder)) => decoder.seek_position(from),
            None => INVALID_POSITION,
        }
    }

    /// Summed document frequency over all segment postings.
    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    /// Summed total term frequency over all segment postings.
    pub fn total_term_freq(&self) -> u64 {
        self.total_term_freq
    }

    /// The doc the iterator currently points at.
    pub fn doc(&self) -> RowId {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::PostingIterator;
    use crate::postings::{PostingWriter, SegmentPosting};
    use crate::{RecordOption, RowId, INVALID_POSITION, INVALID_ROWID};

    fn single_segment(writer: &PostingWriter) -> PostingIterator {
        let posting = SegmentPosting::new(RowId::new(0, 0), writer.serialize());
        PostingIterator::new(RecordOption::ALL, vec![posting])
    }

    #[test]
    fn test_seek_doc_small_list() {
        let mut writer = PostingWriter::new(RecordOption::ALL);
        for doc in [1u32, 3, 9, 17] {
            writer.add_position(doc, 0);
        }
        let mut iterator = single_segment(&writer);
        assert_eq!(iterator.seek_doc(RowId::new(0, 0)), RowId::new(0, 1));
        assert_eq!(iterator.seek_doc(RowId::new(0, 2)), RowId::new(0, 3));
        assert_eq!(iterator.seek_doc(RowId::new(0, 3)), RowId::new(0, 3));
        assert_eq!(iterator.seek_doc(RowId::new(0, 10)), RowId::new(0, 17));
        assert_eq!(iterator.seek_doc(RowId::new(0, 18)), INVALID_ROWID);
        // a terminated iterator stays terminated
        assert_eq!(iterator.seek_doc(RowId::new(0, 0)), INVALID_ROWID);
    }

    #[test]
    fn test_seek_doc_across_blocks() {
        let mut writer = PostingWriter::new(RecordOption::ALL);
        // 1000 docs: 7 full blocks plus a tail
        for doc in 0u32..1000u32 {
            let doc = doc * 3;
            writer.add_position(doc, 0);
            writer.add_position(doc, 5);
        }
        let mut iterator = single_segment(&writer);
        for target in [0u32, 1, 127 * 3, 128 * 3 - 1, 500 * 3 + 1, 999 * 3] {
            let expected = target.div_ceil(3) * 3;
            assert_eq!(
                iterator.seek_doc(RowId::new(0, target)),
                RowId::new(0, expected),
                "target {target}"
            );
            assert_eq!(iterator.current_tf(), 2);
        }
        assert_eq!(iterator.seek_doc(RowId::new(0, 999 * 3 + 1)), INVALID_ROWID);
    }

    #[test]
    fn test_walk_matches_reference() {
        let docs: Vec<u32> = (0u32..400u32).map(|i| i * 7 % 2048).collect();
        let mut sorted = docs.clone();
        sorted.sort_unstable();
        sorted.dedup();
        let mut writer = PostingWriter::new(RecordOption::ALL);
        for &doc in &sorted {
            writer.add_position(doc, 0);
        }
        let mut iterator = single_segment(&writer);
        let mut collected = Vec::new();
        let mut cursor = RowId::new(0, 0);
        loop {
            let doc = iterator.seek_doc(cursor);
            if doc == INVALID_ROWID {
                break;
            }
            collected.push(doc.segment_offset());
            cursor = doc.next();
        }
        assert_eq!(collected, sorted);
    }

    #[test]
    fn test_positions() {
        let mut writer = PostingWriter::new(RecordOption::ALL);
        for pos in [0u32, 3, 6, 9] {
            writer.add_position(4, pos);
        }
        writer.add_position(7, 2);
        let mut iterator = single_segment(&writer);
        assert_eq!(iterator.seek_doc(RowId::new(0, 0)), RowId::new(0, 4));
        assert_eq!(iterator.current_tf(), 4);
        assert_eq!(iterator.seek_position(0), 0);
        assert_eq!(iterator.seek_position(1), 3);
        assert_eq!(iterator.seek_position(3), 3);
        assert_eq!(iterator.seek_position(7), 9);
        assert_eq!(iterator.seek_position(10), INVALID_POSITION);
        // going backwards within the record is supported
        assert_eq!(iterator.seek_position(0), 0);
        assert_eq!(iterator.seek_doc(RowId::new(0, 5)), RowId::new(0, 7));
        assert_eq!(iterator.seek_position(0), 2);
        assert_eq!(iterator.seek_position(3), INVALID_POSITION);
    }

    #[test]
    fn test_multiple_segment_postings() {
        let mut first = PostingWriter::new(RecordOption::ALL);
        first.add_position(0, 0);
        first.add_position(2, 0);
        let mut second = PostingWriter::new(RecordOption::ALL);
        second.add_position(3, 0);
        second.add_position(4, 1);
        let mut iterator = PostingIterator::new(
            RecordOption::ALL,
            vec![
                SegmentPosting::new(RowId::new(0, 3), second.serialize()),
                SegmentPosting::new(RowId::new(0, 0), first.serialize()),
            ],
        );
        assert_eq!(iterator.doc_freq(), 4);
        let mut collected = Vec::new();
        let mut cursor = RowId::new(0, 0);
        loop {
            let doc = iterator.seek_doc(cursor);
            if doc == INVALID_ROWID {
                break;
            }
            collected.push(doc.segment_offset());
            cursor = doc.next();
        }
        assert_eq!(collected, vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_cross_segment_seek() {
        let mut first = PostingWriter::new(RecordOption::ALL);
        first.add_position(1, 0);
        let mut second = PostingWriter::new(RecordOption::ALL);
        second.add_position(8, 0);
        let mut iterator = PostingIterator::new(
            RecordOption::ALL,
            vec![
                SegmentPosting::new(RowId::new(0, 0), first.serialize()),
                SegmentPosting::new(RowId::new(2, 0), second.serialize()),
            ],
        );
        assert_eq!(iterator.seek_doc(RowId::new(0, 2)), RowId::new(2, 8));
        assert_eq!(iterator.seek_doc(RowId::new(2, 9)), INVALID_ROWID);
    }
}
