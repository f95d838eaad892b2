//! Per-block skip data enabling `seek_doc` in `O(log n + BLOCK_SIZE)`.
//!
//! For every full block the skip stream records the last doc id of the
//! block, the bit widths of the packed doc and tf streams, and the sum of
//! term frequencies of the block. The tf sum doubles as the number of
//! positions spanned by the block, which is what lets `seek_position` jump
//! over skipped blocks without touching the position stream.

use crate::directory::OwnedBytes;
use crate::postings::compression::{packed_block_size, read_u32_vint, write_u32_vint, BLOCK_SIZE};
use crate::{DocId, RecordOption, TERMINATED};

pub struct SkipSerializer {
    buffer: Vec<u8>,
    prev_doc: DocId,
    record_option: RecordOption,
}

impl SkipSerializer {
    pub fn new(record_option: RecordOption) -> SkipSerializer {
        SkipSerializer {
            buffer: Vec::new(),
            prev_doc: 0u32,
            record_option,
        }
    }

    /// Records one full block.
    pub fn write_block(&mut self, last_doc: DocId, doc_num_bits: u8, tf_num_bits: u8, tf_sum: u32) {
        assert!(
            self.buffer.is_empty() || last_doc > self.prev_doc,
            "write_block(...) called with non-increasing doc ids. \
             Did you forget to call clear maybe?"
        );
        let delta_doc = last_doc - self.prev_doc;
        self.prev_doc = last_doc;
        write_u32_vint(delta_doc, &mut self.buffer);
        self.buffer.push(doc_num_bits);
        if self.record_option.has_freq() {
            self.buffer.push(tf_num_bits);
        }
        if self.record_option.has_positions() {
            write_u32_vint(tf_sum, &mut self.buffer);
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer[..]
    }

    pub fn clear(&mut self) {
        self.prev_doc = 0u32;
        self.buffer.clear();
    }
}

#[derive(Clone, Copy, Debug)]
pub enum BlockInfo {
    BitPacked {
        doc_num_bits: u8,
        tf_num_bits: u8,
        tf_sum: u32,
    },
    VInt {
        num_docs: u32,
    },
}

pub struct SkipReader {
    data: OwnedBytes,
    cursor: usize,
    record_option: RecordOption,
    remaining_docs: u32,
    last_doc_in_block: DocId,
    pub(crate) last_doc_in_previous_block: DocId,
    byte_offset: usize,
    position_offset: u64,
    block_info: BlockInfo,
}

impl SkipReader {
    pub fn new(data: OwnedBytes, doc_freq: u32, record_option: RecordOption) -> SkipReader {
        let mut skip_reader = SkipReader {
            data,
            cursor: 0,
            record_option,
            remaining_docs: doc_freq,
            last_doc_in_block: 0u32,
            last_doc_in_previous_block: 0u32,
            byte_offset: 0,
            position_offset: 0u64,
            block_info: BlockInfo::VInt { num_docs: 0 },
        };
        skip_reader.advance();
        skip_reader
    }

    pub fn last_doc_in_block(&self) -> DocId {
        self.last_doc_in_block
    }

    /// Byte offset of the current block within the doc/tf stream.
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Number of positions spanned by all blocks before the current one.
    pub fn position_offset(&self) -> u64 {
        self.position_offset
    }

    pub fn block_info(&self) -> BlockInfo {
        self.block_info
    }

    fn read_block_info(&mut self) {
        let mut slice = &self.data.as_slice()[self.cursor..];
        let initial_len = slice.len();
        let doc_delta = read_u32_vint(&mut slice);
        self.last_doc_in_block += doc_delta;
        let doc_num_bits = slice[0];
        slice = &slice[1..];
        let tf_num_bits = if self.record_option.has_freq() {
            let bits = slice[0];
            slice = &slice[1..];
            bits
        } else {
            0u8
        };
        let tf_sum = if self.record_option.has_positions() {
            read_u32_vint(&mut slice)
        } else {
            0u32
        };
        self.cursor += initial_len - slice.len();
        self.block_info = BlockInfo::BitPacked {
            doc_num_bits,
            tf_num_bits,
            tf_sum,
        };
    }

    /// Advances to the block that may contain `target`.
    ///
    /// If the target is larger than all documents, ends up on the trailing
    /// variable-byte block.
    pub fn seek(&mut self, target: DocId) {
        while self.last_doc_in_block < target {
            self.advance();
        }
    }

    pub fn advance(&mut self) -> bool {
        match self.block_info {
            BlockInfo::BitPacked {
                doc_num_bits,
                tf_num_bits,
                tf_sum,
            } => {
                self.remaining_docs -= BLOCK_SIZE as u32;
                self.byte_offset += packed_block_size(doc_num_bits);
                if self.record_option.has_freq() {
                    self.byte_offset += packed_block_size(tf_num_bits);
                }
                self.position_offset += tf_sum as u64;
            }
            BlockInfo::VInt { num_docs } => {
                self.remaining_docs -= num_docs;
            }
        }
        self.last_doc_in_previous_block = self.last_doc_in_block;
        if self.remaining_docs >= BLOCK_SIZE as u32 {
            self.read_block_info();
            true
        } else {
            self.last_doc_in_block = TERMINATED;
            self.block_info = BlockInfo::VInt {
                num_docs: self.remaining_docs,
            };
            self.remaining_docs > 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockInfo, SkipReader, SkipSerializer};
    use crate::directory::OwnedBytes;
    use crate::postings::compression::BLOCK_SIZE;
    use crate::{RecordOption, TERMINATED};

    #[test]
    fn test_skip_with_freq_and_positions() {
        let buffer = {
            let mut serializer = SkipSerializer::new(RecordOption::WithFreqsAndPositions);
            serializer.write_block(1u32, 2u8, 3u8, 9u32);
            serializer.write_block(5u32, 5u8, 2u8, 4u32);
            serializer.data().to_owned()
        };
        let doc_freq = 3u32 + (BLOCK_SIZE * 2) as u32;
        let mut reader = SkipReader::new(
            OwnedBytes::new(buffer),
            doc_freq,
            RecordOption::WithFreqsAndPositions,
        );
        assert_eq!(reader.last_doc_in_block(), 1u32);
        assert!(matches!(
            reader.block_info(),
            BlockInfo::BitPacked {
                doc_num_bits: 2u8,
                tf_num_bits: 3u8,
                tf_sum: 9u32,
            }
        ));
        assert_eq!(reader.position_offset(), 0u64);
        assert!(reader.advance());
        assert_eq!(reader.last_doc_in_block(), 5u32);
        assert_eq!(reader.position_offset(), 9u64);
        assert!(reader.advance());
        assert!(matches!(
            reader.block_info(),
            BlockInfo::VInt { num_docs: 3u32 }
        ));
        assert_eq!(reader.last_doc_in_block(), TERMINATED);
        assert_eq!(reader.position_offset(), 13u64);
        assert!(!reader.advance());
    }

    #[test]
    fn test_skip_no_freq() {
        let buffer = {
            let mut serializer = SkipSerializer::new(RecordOption::Basic);
            serializer.write_block(1u32, 2u8, 0u8, 0u32);
            serializer.data().to_owned()
        };
        // serialized entry is doc delta + a single num_bits byte
        assert_eq!(buffer.len(), 2);
        let doc_freq = BLOCK_SIZE as u32;
        let mut reader = SkipReader::new(OwnedBytes::new(buffer), doc_freq, RecordOption::Basic);
        assert_eq!(reader.last_doc_in_block(), 1u32);
        assert!(matches!(
            reader.block_info(),
            BlockInfo::BitPacked {
                doc_num_bits: 2u8,
                ..
            }
        ));
        assert!(!reader.advance());
        assert!(matches!(reader.block_info(), BlockInfo::VInt { num_docs: 0 }));
    }

    #[test]
    fn test_skip_seek_lands_on_covering_block() {
        let buffer = {
            let mut serializer = SkipSerializer::new(RecordOption::WithFreqs);
            serializer.write_block(100u32, 7u8, 2u8, 0u32);
            serializer.write_block(400u32, 7u8, 2u8, 0u32);
            serializer.data().to_owned()
        };
        let doc_freq = 10u32 + (BLOCK_SIZE * 2) as u32;
        let mut reader = SkipReader::new(
            OwnedBytes::new(buffer),
            doc_freq,
            RecordOption::WithFreqs,
        );
        reader.seek(350);
        assert_eq!(reader.last_doc_in_block(), 400u32);
        assert_eq!(reader.last_doc_in_previous_block, 100u32);
        reader.seek(401);
        assert_eq!(reader.last_doc_in_block(), TERMINATED);
    }
}
