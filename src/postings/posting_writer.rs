//! Append-only builder for one term's posting list.

use crate::directory::OwnedBytes;
use crate::postings::compression::{
    read_u32_vint, read_u64_vint, write_u32_vint, write_u64_vint, write_vint_sorted,
    write_vint_unsorted, BlockEncoder, BLOCK_SIZE,
};
use crate::postings::skip::SkipSerializer;
use crate::postings::PostingData;
use crate::{DocId, Position, RecordOption};

/// Per-term append buffer with running statistics.
///
/// Doc ids must be appended in strictly increasing order; positions within
/// one document likewise. Violating either is a programmer error and aborts.
///
/// `serialize` is non-destructive and deterministic: the same append
/// sequence yields bit-identical posting bytes regardless of how the caller
/// partitioned its input.
pub struct PostingWriter {
    record_option: RecordOption,
    doc_ids: Vec<DocId>,
    // term freq of every closed record; the trailing record stays open in
    // `current_tf` until the next doc id arrives.
    term_freqs: Vec<u32>,
    position_deltas: Vec<u32>,
    current_tf: u32,
    last_position: Position,
    total_term_freq: u64,
}

impl PostingWriter {
    pub fn new(record_option: RecordOption) -> PostingWriter {
        PostingWriter {
            record_option,
            doc_ids: Vec::new(),
            term_freqs: Vec::new(),
            position_deltas: Vec::new(),
            current_tf: 0u32,
            last_position: 0u32,
            total_term_freq: 0u64,
        }
    }

    pub fn record_option(&self) -> RecordOption {
        self.record_option
    }

    /// Number of distinct documents appended so far.
    pub fn doc_freq(&self) -> u32 {
        self.doc_ids.len() as u32
    }

    /// Sum of term frequencies across all appended documents.
    pub fn total_term_freq(&self) -> u64 {
        self.total_term_freq
    }

    pub fn last_doc(&self) -> Option<DocId> {
        self.doc_ids.last().copied()
    }

    /// Records one occurrence of the term at `pos` in document `doc`.
    pub fn add_position(&mut self, doc: DocId, pos: Position) {
        match self.doc_ids.last().copied() {
            Some(last_doc) if doc == last_doc => {
                assert!(
                    pos > self.last_position,
                    "positions out of order within doc {doc}: {pos} after {}",
                    self.last_position
                );
                if self.record_option.has_positions() {
                    self.position_deltas.push(pos - self.last_position);
                }
                self.last_position = pos;
                self.current_tf += 1;
            }
            Some(last_doc) => {
                assert!(
                    doc > last_doc,
                    "doc ids out of order: {doc} appended after {last_doc}"
                );
                self.term_freqs.push(self.current_tf);
                self.start_record(doc, pos);
            }
            None => {
                self.start_record(doc, pos);
            }
        }
        self.total_term_freq += 1;
    }

    fn start_record(&mut self, doc: DocId, pos: Position) {
        self.doc_ids.push(doc);
        if self.record_option.has_positions() {
            self.position_deltas.push(pos);
        }
        self.last_position = pos;
        self.current_tf = 1;
    }

    fn all_term_freqs(&self) -> Vec<u32> {
        let mut tfs = self.term_freqs.clone();
        if !self.doc_ids.is_empty() {
            tfs.push(self.current_tf);
        }
        tfs
    }

    /// Seals the current content into its on-disk representation.
    pub fn serialize(&self) -> PostingData {
        let tfs = self.all_term_freqs();
        let mut encoder = BlockEncoder::new();
        let mut skip = SkipSerializer::new(self.record_option);
        let mut doc_bytes: Vec<u8> = Vec::new();

        let doc_freq = self.doc_ids.len();
        let num_full_blocks = doc_freq / BLOCK_SIZE;
        let mut last_doc_encoded = 0u32;
        for block_idx in 0..num_full_blocks {
            let start = block_idx * BLOCK_SIZE;
            let doc_block = &self.doc_ids[start..start + BLOCK_SIZE];
            let (doc_num_bits, packed) = encoder.compress_block_sorted(doc_block, last_doc_encoded);
            doc_bytes.extend_from_slice(packed);
            last_doc_encoded = doc_block[BLOCK_SIZE - 1];
            let mut tf_num_bits = 0u8;
            let mut tf_sum = 0u32;
            if self.record_option.has_freq() {
                let tf_block = &tfs[start..start + BLOCK_SIZE];
                tf_sum = tf_block.iter().sum();
                let (num_bits, packed) = encoder.compress_block_unsorted(tf_block);
                tf_num_bits = num_bits;
                doc_bytes.extend_from_slice(packed);
            }
            skip.write_block(last_doc_encoded, doc_num_bits, tf_num_bits, tf_sum);
        }
        let tail_start = num_full_blocks * BLOCK_SIZE;
        if tail_start < doc_freq {
            write_vint_sorted(&self.doc_ids[tail_start..], last_doc_encoded, &mut doc_bytes);
            if self.record_option.has_freq() {
                write_vint_unsorted(&tfs[tail_start..], &mut doc_bytes);
            }
        }

        let mut bytes: Vec<u8> = Vec::new();
        write_u32_vint(skip.data().len() as u32, &mut bytes);
        bytes.extend_from_slice(skip.data());
        write_u32_vint(doc_bytes.len() as u32, &mut bytes);
        bytes.extend_from_slice(&doc_bytes);
        if self.record_option.has_positions() {
            let mut pos_bytes: Vec<u8> = Vec::new();
            let mut padded = [0u32; BLOCK_SIZE];
            for chunk in self.position_deltas.chunks(BLOCK_SIZE) {
                let block: &[u32] = if chunk.len() == BLOCK_SIZE {
                    chunk
                } else {
                    padded[..chunk.len()].copy_from_slice(chunk);
                    padded[chunk.len()..].fill(0u32);
                    &padded
                };
                let (num_bits, packed) = encoder.compress_block_unsorted(block);
                pos_bytes.push(num_bits);
                pos_bytes.extend_from_slice(packed);
            }
            write_u32_vint(pos_bytes.len() as u32, &mut bytes);
            bytes.extend_from_slice(&pos_bytes);
        }

        PostingData {
            bytes: OwnedBytes::new(bytes),
            doc_freq: doc_freq as u32,
            total_term_freq: self.total_term_freq,
            record_option: self.record_option,
        }
    }

    /// Appends the raw (unsealed) state to a spill sidecar.
    pub fn spill_to(&self, out: &mut Vec<u8>) {
        write_u32_vint(self.doc_freq(), out);
        write_u64_vint(self.total_term_freq, out);
        write_vint_sorted(&self.doc_ids, 0u32, out);
        write_vint_unsorted(&self.all_term_freqs(), out);
        if self.record_option.has_positions() {
            write_vint_unsorted(&self.position_deltas, out);
        }
    }

    /// Rebuilds a writer from a spill sidecar, ready for further appends.
    pub fn load_from(data: &mut &[u8], record_option: RecordOption) -> PostingWriter {
        let doc_freq = read_u32_vint(data) as usize;
        let total_term_freq = read_u64_vint(data);
        let mut doc_ids = Vec::with_capacity(doc_freq);
        let mut previous = 0u32;
        for _ in 0..doc_freq {
            previous += read_u32_vint(data);
            doc_ids.push(previous);
        }
        let mut term_freqs = Vec::with_capacity(doc_freq);
        for _ in 0..doc_freq {
            term_freqs.push(read_u32_vint(data));
        }
        let mut position_deltas = Vec::new();
        if record_option.has_positions() {
            position_deltas.reserve(total_term_freq as usize);
            for _ in 0..total_term_freq {
                position_deltas.push(read_u32_vint(data));
            }
        }
        // reopen the trailing record so appends to the same doc id resume
        let current_tf = term_freqs.pop().unwrap_or(0u32);
        let last_position = if record_option.has_positions() {
            position_deltas
                .iter()
                .rev()
                .take(current_tf as usize)
                .sum()
        } else {
            0u32
        };
        PostingWriter {
            record_option,
            doc_ids,
            term_freqs,
            position_deltas,
            current_tf,
            last_position,
            total_term_freq,
        }
    }
}
