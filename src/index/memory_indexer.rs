//! Ingest orchestration: many inverters feeding one term dictionary of
//! posting writers, dumped into immutable chunks.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rustc_hash::FxHashMap;

use crate::analyzer::default_registry;
use crate::directory::Directory;
use crate::index::chunk;
use crate::index::column_inverter::{ColumnInverter, ColumnLengths, PostingWriterProvider};
use crate::index::pool::ThreadPool;
use crate::postings::compression::{read_u32_vint, write_u32_vint};
use crate::postings::{PostingData, PostingWriter, SegmentPosting};
use crate::{Error, RecordOption, Result, RowId};

const SPILL_MAGIC: &[u8; 4] = b"IFTS";
const SPILL_VERSION: u32 = 1;
const MAX_DUMP_ATTEMPTS: usize = 3;
const DUMP_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Description of a chunk produced by [`MemoryIndexer::dump`].
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    /// Path of the chunk file relative to the directory root.
    pub path: PathBuf,
    /// Number of terms in the chunk dictionary.
    pub term_count: usize,
    /// Number of rows inserted into the indexer.
    pub row_count: u32,
}

struct IndexerCore {
    record_option: RecordOption,
    analyzer_name: String,
    postings: Mutex<FxHashMap<String, Arc<Mutex<PostingWriter>>>>,
    column_lengths: Arc<ColumnLengths>,
    ready: Mutex<Vec<ColumnInverter>>,
    inflight: Mutex<usize>,
    inflight_cond: Condvar,
    commit_lock: Mutex<()>,
}

enum CommitWork {
    Merge(ColumnInverter, ColumnInverter),
    Generate(ColumnInverter),
}

impl IndexerCore {
    fn writer_provider(self: &Arc<Self>) -> PostingWriterProvider {
        let core = Arc::clone(self);
        Arc::new(move |term: &str| {
            let mut postings = core.postings.lock().expect("poisoned lock");
            postings
                .entry(term.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(PostingWriter::new(core.record_option))))
                .clone()
        })
    }

    /// Runs commit-worker steps until neither a pair merge nor a final
    /// generation is possible. Caller must hold `commit_lock`.
    fn commit_steps(&self) {
        loop {
            let work = {
                let mut ready = self.ready.lock().expect("poisoned lock");
                if ready.len() >= 2 {
                    let right = ready.pop().expect("len checked");
                    let left = ready.pop().expect("len checked");
                    CommitWork::Merge(left, right)
                } else if ready.len() == 1 && *self.inflight.lock().expect("poisoned lock") == 0 {
                    CommitWork::Generate(ready.pop().expect("len checked"))
                } else {
                    return;
                }
            };
            match work {
                CommitWork::Merge(mut left, right) => {
                    left.merge(right);
                    self.ready.lock().expect("poisoned lock").push(left);
                }
                CommitWork::Generate(mut inverter) => {
                    inverter.sort();
                    inverter.generate_posting();
                }
            }
        }
    }

    /// Opportunistic commit from a worker thread; never blocks on the commit
    /// lock.
    fn try_commit(&self) {
        if let Ok(_guard) = self.commit_lock.try_lock() {
            self.commit_steps();
        }
    }
}

/// In-memory index for one chunk's worth of one segment's rows.
///
/// `insert` dispatches inversion to the worker pool and returns immediately.
/// Completed inverters land on a ready queue, get merged pairwise, and once
/// nothing is inflight the single survivor is sorted and flushed into the
/// term dictionary of posting writers. `dump` seals every writer into a
/// chunk file; with `spill` a sidecar is kept so a fresh indexer with the
/// same chunk name can `load` the writers back and resume ingestion.
pub struct MemoryIndexer {
    directory: Arc<dyn Directory>,
    chunk_name: String,
    base_row_id: RowId,
    pool: Arc<ThreadPool>,
    core: Arc<IndexerCore>,
    doc_count: AtomicU32,
}

impl MemoryIndexer {
    /// Creates an indexer writing `<segment_id>/ft/<chunk_name>.idx`.
    ///
    /// Fails with [`Error::Config`] if `analyzer_name` is not registered.
    pub fn new(
        directory: Arc<dyn Directory>,
        chunk_name: &str,
        base_row_id: RowId,
        record_option: RecordOption,
        analyzer_name: &str,
        pool: Arc<ThreadPool>,
    ) -> Result<MemoryIndexer> {
        default_registry().require(analyzer_name)?;
        Ok(MemoryIndexer {
            directory,
            chunk_name: chunk_name.to_string(),
            base_row_id,
            pool,
            core: Arc::new(IndexerCore {
                record_option,
                analyzer_name: analyzer_name.to_string(),
                postings: Mutex::default(),
                column_lengths: Arc::new(ColumnLengths::default()),
                ready: Mutex::default(),
                inflight: Mutex::new(0usize),
                inflight_cond: Condvar::new(),
                commit_lock: Mutex::default(),
            }),
            doc_count: AtomicU32::new(0u32),
        })
    }

    /// Base row id of the first inserted row.
    pub fn base_row_id(&self) -> RowId {
        self.base_row_id
    }

    /// Rows inserted so far.
    pub fn row_count(&self) -> u32 {
        self.doc_count.load(Ordering::SeqCst)
    }

    /// Streams this indexer records.
    pub fn record_option(&self) -> RecordOption {
        self.core.record_option
    }

    /// Token count of a document, as accumulated during inversion.
    pub fn column_length(&self, doc: RowId) -> u32 {
        self.core.column_lengths.get(doc.segment_offset())
    }

    /// Enqueues inversion of rows `[row_offset, row_offset + row_count)` of
    /// `column`; rows are assigned consecutive row ids following everything
    /// inserted before. Returns as soon as the task is queued; blocks only
    /// when the pool's queue is full.
    pub fn insert(&self, column: Arc<Vec<String>>, row_offset: usize, row_count: usize) -> Result<()> {
        let row_id_base = self.base_row_id + self.doc_count.fetch_add(row_count as u32, Ordering::SeqCst);
        {
            let mut inflight = self.core.inflight.lock().expect("poisoned lock");
            *inflight += 1;
        }
        let core = Arc::clone(&self.core);
        self.pool.execute(move || {
            let provider = core.writer_provider();
            let mut inverter = ColumnInverter::new(provider, Arc::clone(&core.column_lengths));
            inverter
                .init_analyzer(&core.analyzer_name)
                .expect("analyzer validated at indexer construction");
            inverter.invert_column(&column, row_offset, row_count, row_id_base);
            core.ready.lock().expect("poisoned lock").push(inverter);
            {
                let mut inflight = core.inflight.lock().expect("poisoned lock");
                *inflight -= 1;
                core.inflight_cond.notify_all();
            }
            core.try_commit();
        });
        Ok(())
    }

    /// Number of inversion tasks dispatched but not yet on the ready queue.
    pub fn inflight_tasks(&self) -> usize {
        *self.core.inflight.lock().expect("poisoned lock")
    }

    /// Runs commit-worker steps on the calling thread until the ready queue
    /// is drained (or found empty).
    pub fn commit_sync(&self) -> Result<()> {
        let _guard = self.core.commit_lock.lock().expect("poisoned lock");
        self.core.commit_steps();
        Ok(())
    }

    fn chunk_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}/ft/{}.idx",
            self.base_row_id.segment_id(),
            self.chunk_name
        ))
    }

    fn spill_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}/ft/{}.spill",
            self.base_row_id.segment_id(),
            self.chunk_name
        ))
    }

    /// Waits out inflight tasks, drains the commit queue, seals every writer
    /// and persists the chunk file. The term map is cleared on success.
    ///
    /// With `force`, a chunk is written even if no term was recorded. With
    /// `spill`, a sidecar keeping the raw writer state is written next to
    /// the chunk so [`load`](Self::load) can resume ingestion later.
    ///
    /// On persistent I/O failure the partial file is deleted and the
    /// in-memory state is preserved, so the caller may retry.
    pub fn dump(&self, force: bool, spill: bool) -> Result<ChunkMeta> {
        {
            let mut inflight = self.core.inflight.lock().expect("poisoned lock");
            while *inflight > 0 {
                inflight = self
                    .core
                    .inflight_cond
                    .wait(inflight)
                    .expect("poisoned lock");
            }
        }
        self.commit_sync()?;

        let sealed: BTreeMap<String, PostingData> = {
            let postings = self.core.postings.lock().expect("poisoned lock");
            postings
                .iter()
                .map(|(term, writer)| {
                    (
                        term.clone(),
                        writer.lock().expect("poisoned lock").serialize(),
                    )
                })
                .collect()
        };
        let meta = ChunkMeta {
            path: self.chunk_path(),
            term_count: sealed.len(),
            row_count: self.row_count(),
        };
        if sealed.is_empty() && !force {
            debug!("dump of {:?} skipped: no terms recorded", meta.path);
            return Ok(meta);
        }

        let mut attempt = 0usize;
        loop {
            match chunk::write_chunk(
                &*self.directory,
                &meta.path,
                self.core.record_option,
                &sealed,
            ) {
                Ok(()) => break,
                Err(err) => {
                    // a partial file must not survive
                    let _ = self.directory.delete(&meta.path);
                    attempt += 1;
                    if attempt >= MAX_DUMP_ATTEMPTS {
                        return Err(Error::Io(err));
                    }
                    warn!(
                        "dump of {:?} failed (attempt {attempt}): {err}; retrying",
                        meta.path
                    );
                    thread::sleep(DUMP_RETRY_BACKOFF * attempt as u32);
                }
            }
        }
        if spill {
            self.write_spill()?;
        }
        debug!(
            "dumped chunk {:?}: {} terms over {} rows",
            meta.path, meta.term_count, meta.row_count
        );
        self.core.postings.lock().expect("poisoned lock").clear();
        self.core.column_lengths.clear();
        Ok(meta)
    }

    fn write_spill(&self) -> Result<()> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(SPILL_MAGIC);
        buffer.write_u32::<LittleEndian>(SPILL_VERSION)?;
        buffer
            .write_u32::<LittleEndian>(self.core.record_option.to_flags())?;
        buffer.write_u32::<LittleEndian>(self.row_count())?;
        let lengths = self.core.column_lengths.snapshot();
        write_u32_vint(lengths.len() as u32, &mut buffer);
        for length in lengths {
            write_u32_vint(length, &mut buffer);
        }
        let postings = self.core.postings.lock().expect("poisoned lock");
        let sorted: BTreeMap<&String, &Arc<Mutex<PostingWriter>>> = postings.iter().collect();
        buffer.write_u32::<LittleEndian>(sorted.len() as u32)?;
        for (term, writer) in sorted {
            buffer.write_u16::<LittleEndian>(term.len() as u16)?;
            buffer.extend_from_slice(term.as_bytes());
            writer.lock().expect("poisoned lock").spill_to(&mut buffer);
        }
        drop(postings);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buffer);
        let crc = hasher.finalize();
        buffer.write_u32::<LittleEndian>(crc)?;
        self.directory.atomic_write(&self.spill_path(), &buffer)?;
        Ok(())
    }

    /// Rebuilds live writers from the spill sidecar written by a previous
    /// `dump(.., spill=true)` under the same chunk name.
    pub fn load(&self) -> Result<()> {
        let path = self.spill_path();
        let format_err = |msg: &str| Error::format(path.clone(), msg);
        let data = self.directory.open_read(&path)?;
        let raw = data.as_slice();
        if raw.len() < 20 {
            return Err(format_err("spill file truncated"));
        }
        if &raw[0..4] != SPILL_MAGIC {
            return Err(format_err("bad magic number"));
        }
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&raw[..raw.len() - 4]);
        let stored_crc = (&raw[raw.len() - 4..]).read_u32::<LittleEndian>()?;
        if hasher.finalize() != stored_crc {
            return Err(format_err("crc32 mismatch"));
        }
        let mut cursor = &raw[4..raw.len() - 4];
        let version = cursor.read_u32::<LittleEndian>()?;
        if version != SPILL_VERSION {
            return Err(format_err(&format!("unsupported version {version}")));
        }
        let flags = cursor.read_u32::<LittleEndian>()?;
        let record_option = RecordOption::from_flags(flags)
            .ok_or_else(|| format_err(&format!("unknown stream flags {flags}")))?;
        if record_option != self.core.record_option {
            return Err(format_err("spill recorded with different streams"));
        }
        let row_count = cursor.read_u32::<LittleEndian>()?;
        let num_lengths = read_u32_vint(&mut cursor) as usize;
        let mut lengths = Vec::with_capacity(num_lengths);
        for _ in 0..num_lengths {
            lengths.push(read_u32_vint(&mut cursor));
        }
        let term_count = cursor.read_u32::<LittleEndian>()? as usize;
        let mut writers = FxHashMap::default();
        for _ in 0..term_count {
            let term_len = cursor.read_u16::<LittleEndian>()? as usize;
            if cursor.len() < term_len {
                return Err(format_err("spill term truncated"));
            }
            let term = std::str::from_utf8(&cursor[..term_len])
                .map_err(|_| format_err("spill term is not utf-8"))?
                .to_string();
            cursor = &cursor[term_len..];
            let writer = PostingWriter::load_from(&mut cursor, record_option);
            writers.insert(term, Arc::new(Mutex::new(writer)));
        }
        debug!("loaded spill {:?}: {} terms, {} rows", path, term_count, row_count);
        *self.core.postings.lock().expect("poisoned lock") = writers;
        self.core.column_lengths.set_all(lengths);
        self.doc_count.store(row_count, Ordering::SeqCst);
        Ok(())
    }

    /// Serializes the live writer of `term` into a transient
    /// [`SegmentPosting`], for queries against a still-growing indexer.
    pub fn lookup(&self, term: &str) -> Option<SegmentPosting> {
        let postings = self.core.postings.lock().expect("poisoned lock");
        let writer = postings.get(term)?;
        let data = writer.lock().expect("poisoned lock").serialize();
        Some(SegmentPosting::new(self.base_row_id, data))
    }
}
