//! Block-compressed integer codec for posting lists.
//!
//! Full blocks of [`BLOCK_SIZE`] integers are bit-packed; the incomplete tail
//! of a posting list falls back to variable-byte encoding.

use bitpacking::{BitPacker, BitPacker4x};

/// Number of records per compressed block.
pub const BLOCK_SIZE: usize = BitPacker4x::BLOCK_LEN;

const COMPRESSED_BLOCK_MAX_SIZE: usize = BLOCK_SIZE * 4;

/// Size in bytes of a bit-packed block of `num_bits`-wide integers.
pub const fn packed_block_size(num_bits: u8) -> usize {
    (num_bits as usize) * BLOCK_SIZE / 8
}

pub struct BlockEncoder {
    bitpacker: BitPacker4x,
    output: [u8; COMPRESSED_BLOCK_MAX_SIZE],
}

impl BlockEncoder {
    pub fn new() -> BlockEncoder {
        BlockEncoder {
            bitpacker: BitPacker4x::new(),
            output: [0u8; COMPRESSED_BLOCK_MAX_SIZE],
        }
    }

    /// Bit-packs a full block of sorted integers, delta-encoded from
    /// `offset`. Returns the bit width and the packed bytes.
    pub fn compress_block_sorted(&mut self, block: &[u32], offset: u32) -> (u8, &[u8]) {
        debug_assert_eq!(block.len(), BLOCK_SIZE);
        let num_bits = self.bitpacker.num_bits_sorted(offset, block);
        let written = self
            .bitpacker
            .compress_sorted(offset, block, &mut self.output, num_bits);
        (num_bits, &self.output[..written])
    }

    /// Bit-packs a full block of unsorted integers.
    pub fn compress_block_unsorted(&mut self, block: &[u32]) -> (u8, &[u8]) {
        debug_assert_eq!(block.len(), BLOCK_SIZE);
        let num_bits = self.bitpacker.num_bits(block);
        let written = self.bitpacker.compress(block, &mut self.output, num_bits);
        (num_bits, &self.output[..written])
    }
}

pub struct BlockDecoder {
    bitpacker: BitPacker4x,
    output: [u32; BLOCK_SIZE],
    output_len: usize,
}

impl BlockDecoder {
    pub fn new() -> BlockDecoder {
        BlockDecoder {
            bitpacker: BitPacker4x::new(),
            output: [0u32; BLOCK_SIZE],
            output_len: 0,
        }
    }

    /// Decodes a full bit-packed block of sorted integers, un-deltaing from
    /// `offset`. Returns the number of consumed bytes.
    pub fn uncompress_block_sorted(&mut self, data: &[u8], offset: u32, num_bits: u8) -> usize {
        self.output_len = BLOCK_SIZE;
        self.bitpacker
            .decompress_sorted(offset, data, &mut self.output, num_bits)
    }

    /// Decodes a full bit-packed block of unsorted integers.
    pub fn uncompress_block_unsorted(&mut self, data: &[u8], num_bits: u8) -> usize {
        self.output_len = BLOCK_SIZE;
        self.bitpacker.decompress(data, &mut self.output, num_bits)
    }

    /// Decodes `num_els` variable-byte, delta-encoded sorted integers.
    /// Returns the number of consumed bytes.
    pub fn uncompress_vint_sorted(&mut self, data: &[u8], offset: u32, num_els: usize) -> usize {
        debug_assert!(num_els <= BLOCK_SIZE);
        let mut cursor = data;
        let mut previous = offset;
        for slot in self.output.iter_mut().take(num_els) {
            previous += read_u32_vint(&mut cursor);
            *slot = previous;
        }
        self.output_len = num_els;
        data.len() - cursor.len()
    }

    /// Decodes `num_els` variable-byte unsorted integers. Returns the number
    /// of consumed bytes.
    pub fn uncompress_vint_unsorted(&mut self, data: &[u8], num_els: usize) -> usize {
        debug_assert!(num_els <= BLOCK_SIZE);
        let mut cursor = data;
        for slot in self.output.iter_mut().take(num_els) {
            *slot = read_u32_vint(&mut cursor);
        }
        self.output_len = num_els;
        data.len() - cursor.len()
    }

    #[inline]
    pub fn output(&self, idx: usize) -> u32 {
        self.output[idx]
    }

    #[inline]
    pub fn output_array(&self) -> &[u32] {
        &self.output[..self.output_len]
    }
}

const STOP_BIT: u8 = 128;

/// Appends `val` as a variable-byte integer. The stop bit is set on the
/// final byte.
pub fn write_u32_vint(val: u32, out: &mut Vec<u8>) {
    write_u64_vint(val as u64, out);
}

pub fn write_u64_vint(mut val: u64, out: &mut Vec<u8>) {
    while val >= STOP_BIT as u64 {
        out.push((val & 127) as u8);
        val >>= 7;
    }
    out.push(val as u8 | STOP_BIT);
}

/// Reads a variable-byte `u32`, advancing the cursor past its payload.
///
/// # Panics
///
/// If the buffer does not start with a valid vint payload.
pub fn read_u32_vint(data: &mut &[u8]) -> u32 {
    read_u64_vint(data) as u32
}

pub fn read_u64_vint(data: &mut &[u8]) -> u64 {
    let mut result = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in data.iter().enumerate() {
        result |= ((byte & 127) as u64) << shift;
        if byte >= STOP_BIT {
            *data = &data[i + 1..];
            return result;
        }
        shift += 7;
    }
    panic!("corrupted data: unterminated vint");
}

/// Appends sorted `vals` as deltas from `offset`, variable-byte encoded.
pub fn write_vint_sorted(vals: &[u32], offset: u32, out: &mut Vec<u8>) {
    let mut previous = offset;
    for &val in vals {
        write_u32_vint(val - previous, out);
        previous = val;
    }
}

/// Appends `vals` variable-byte encoded, no delta.
pub fn write_vint_unsorted(vals: &[u32], out: &mut Vec<u8>) {
    for &val in vals {
        write_u32_vint(val, out);
    }
}
