//! Chunk files: the immutable on-disk form of a dumped memory indexer.
//!
//! Layout (bit-stable, version 1):
//!
//! ```text
//! [magic "IFTC"] [u32 version]
//! [term_dict]    count-prefixed rows, sorted by term bytes:
//!                (term_len:u16, term_bytes, postings_offset:u64, df:u32, ttf:u64)
//! [postings]     per term, at its absolute postings_offset:
//!                (byte_len:u32, posting bytes)
//! [footer]       term_dict_offset:u64, term_dict_size:u64, flags:u32, crc32:u32
//! ```
//!
//! The crc32 covers every byte before the checksum field. Readers reject
//! unknown magic numbers, versions, flags and checksum mismatches with
//! [`Error::Format`].

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::directory::{Directory, OwnedBytes};
use crate::postings::PostingData;
use crate::{Error, RecordOption, Result};

const MAGIC: &[u8; 4] = b"IFTC";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 8;
const FOOTER_LEN: usize = 8 + 8 + 4 + 4;

/// Serializes `terms` into a chunk file at `path`.
///
/// The postings offsets are computed up front, so the file is written in a
/// single pass through `Directory::atomic_write`.
pub fn write_chunk(
    directory: &dyn Directory,
    path: &Path,
    record_option: RecordOption,
    terms: &BTreeMap<String, PostingData>,
) -> io::Result<()> {
    let term_dict_size: usize = 4 + terms
        .keys()
        .map(|term| 2 + term.len() + 8 + 4 + 8)
        .sum::<usize>();
    let postings_start = HEADER_LEN + term_dict_size;

    let mut buffer: Vec<u8> = Vec::with_capacity(postings_start);
    buffer.extend_from_slice(MAGIC);
    buffer.write_u32::<LittleEndian>(VERSION)?;

    buffer.write_u32::<LittleEndian>(terms.len() as u32)?;
    let mut postings_offset = postings_start as u64;
    for (term, posting) in terms {
        buffer.write_u16::<LittleEndian>(term.len() as u16)?;
        buffer.extend_from_slice(term.as_bytes());
        buffer.write_u64::<LittleEndian>(postings_offset)?;
        buffer.write_u32::<LittleEndian>(posting.doc_freq)?;
        buffer.write_u64::<LittleEndian>(posting.total_term_freq)?;
        postings_offset += 4 + posting.bytes.len() as u64;
    }
    debug_assert_eq!(buffer.len(), postings_start);

    for posting in terms.values() {
        buffer.write_u32::<LittleEndian>(posting.bytes.len() as u32)?;
        buffer.extend_from_slice(posting.bytes.as_slice());
    }

    buffer.write_u64::<LittleEndian>(HEADER_LEN as u64)?;
    buffer.write_u64::<LittleEndian>(term_dict_size as u64)?;
    buffer.write_u32::<LittleEndian>(record_option.to_flags())?;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&buffer);
    let crc = hasher.finalize();
    buffer.write_u32::<LittleEndian>(crc)?;

    directory.atomic_write(path, &buffer)
}

#[derive(Debug)]
struct TermDictEntry {
    term: Vec<u8>,
    postings_offset: u64,
    doc_freq: u32,
    total_term_freq: u64,
}

/// Read-only view over one chunk file.
#[derive(Debug)]
pub struct ChunkReader {
    data: OwnedBytes,
    record_option: RecordOption,
    dict: Vec<TermDictEntry>,
}

impl ChunkReader {
    /// Opens and validates the chunk at `path`.
    pub fn open(directory: &dyn Directory, path: &Path) -> Result<ChunkReader> {
        let data = directory.open_read(path)?;
        Self::from_bytes(data, path)
    }

    fn from_bytes(data: OwnedBytes, path: &Path) -> Result<ChunkReader> {
        let format_err = |msg: &str| Error::format(PathBuf::from(path), msg);
        let raw = data.as_slice();
        if raw.len() < HEADER_LEN + FOOTER_LEN {
            return Err(format_err("file truncated"));
        }
        if &raw[0..4] != MAGIC {
            return Err(format_err("bad magic number"));
        }
        let version = (&raw[4..8]).read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(format_err(&format!("unsupported version {version}")));
        }
        let mut footer = &raw[raw.len() - FOOTER_LEN..];
        let term_dict_offset = footer.read_u64::<LittleEndian>()? as usize;
        let term_dict_size = footer.read_u64::<LittleEndian>()? as usize;
        let flags = footer.read_u32::<LittleEndian>()?;
        let stored_crc = footer.read_u32::<LittleEndian>()?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&raw[..raw.len() - 4]);
        if hasher.finalize() != stored_crc {
            return Err(format_err("crc32 mismatch"));
        }
        let record_option = RecordOption::from_flags(flags)
            .ok_or_else(|| format_err(&format!("unknown stream flags {flags}")))?;
        if term_dict_offset
            .checked_add(term_dict_size)
            .map_or(true, |end| end > raw.len() - FOOTER_LEN)
        {
            return Err(format_err("term dictionary out of bounds"));
        }

        let mut dict_slice = &raw[term_dict_offset..term_dict_offset + term_dict_size];
        let term_count = dict_slice.read_u32::<LittleEndian>()? as usize;
        let mut dict = Vec::with_capacity(term_count);
        for _ in 0..term_count {
            let term_len = dict_slice.read_u16::<LittleEndian>()? as usize;
            if dict_slice.len() < term_len {
                return Err(format_err("term dictionary truncated"));
            }
            let term = dict_slice[..term_len].to_vec();
            dict_slice = &dict_slice[term_len..];
            let postings_offset = dict_slice.read_u64::<LittleEndian>()?;
            let doc_freq = dict_slice.read_u32::<LittleEndian>()?;
            let total_term_freq = dict_slice.read_u64::<LittleEndian>()?;
            dict.push(TermDictEntry {
                term,
                postings_offset,
                doc_freq,
                total_term_freq,
            });
        }
        debug!(
            "opened chunk {:?}: {} terms, {} bytes",
            path,
            dict.len(),
            raw.len()
        );
        Ok(ChunkReader {
            data,
            record_option,
            dict,
        })
    }

    /// Which streams the chunk's postings carry.
    pub fn record_option(&self) -> RecordOption {
        self.record_option
    }

    /// Number of terms in the chunk dictionary.
    pub fn num_terms(&self) -> usize {
        self.dict.len()
    }

    /// Looks up one term's posting bytes.
    pub fn get(&self, term: &str) -> Option<PostingData> {
        let slot = self
            .dict
            .binary_search_by(|entry| entry.term.as_slice().cmp(term.as_bytes()))
            .ok()?;
        let entry = &self.dict[slot];
        let start = entry.postings_offset as usize;
        let len = (&self.data.as_slice()[start..start + 4])
            .read_u32::<LittleEndian>()
            .expect("chunk postings slice too short") as usize;
        Some(PostingData {
            bytes: self.data.slice(start + 4..start + 4 + len),
            doc_freq: entry.doc_freq,
            total_term_freq: entry.total_term_freq,
            record_option: self.record_option,
        })
    }
}
