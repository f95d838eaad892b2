//! Inversion of one column slice into sorted `(term, doc, position)` tuples.

use std::sync::{Arc, Mutex};

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::analyzer::{default_registry, Analyzer};
use crate::postings::PostingWriter;
use crate::{DocId, Position, Result, RowId};

/// Capability handed to a [`ColumnInverter`] to resolve the posting writer
/// of a term.
///
/// Repeated lookups of the same term within one generation pass must return
/// the same writer; the provider may construct the writer on first lookup.
pub type PostingWriterProvider = Arc<dyn Fn(&str) -> Arc<Mutex<PostingWriter>> + Send + Sync>;

/// Token counts per document, shared between concurrently running inverters.
#[derive(Default, Debug)]
pub struct ColumnLengths {
    slots: Mutex<Vec<u32>>,
}

impl ColumnLengths {
    /// Adds `count` tokens to document `doc`, growing the vector as needed.
    pub fn add(&self, doc: DocId, count: u32) {
        let mut slots = self.slots.lock().expect("poisoned lock");
        let slot = doc as usize;
        if slots.len() <= slot {
            slots.resize(slot + 1, 0u32);
        }
        slots[slot] += count;
    }

    /// Token count of document `doc`; 0 if never recorded.
    pub fn get(&self, doc: DocId) -> u32 {
        self.slots
            .lock()
            .expect("poisoned lock")
            .get(doc as usize)
            .copied()
            .unwrap_or(0u32)
    }

    pub(crate) fn set_all(&self, values: Vec<u32>) {
        *self.slots.lock().expect("poisoned lock") = values;
    }

    pub(crate) fn snapshot(&self) -> Vec<u32> {
        self.slots.lock().expect("poisoned lock").clone()
    }

    pub(crate) fn clear(&self) {
        self.slots.lock().expect("poisoned lock").clear();
    }
}

#[derive(Clone, Copy)]
struct TermTuple {
    term_ref: u32,
    doc: DocId,
    pos: Position,
}

/// Tokenizes rows of a column into an internal tuple buffer, then flushes the
/// sorted tuples into per-term posting writers.
///
/// Inverters are built and filled on worker threads, merged pairwise, and a
/// single survivor generates postings. Terms are interned locally so merging
/// moves tuples, not strings.
pub struct ColumnInverter {
    provider: PostingWriterProvider,
    column_lengths: Arc<ColumnLengths>,
    analyzer: Option<Arc<dyn Analyzer>>,
    terms: Vec<String>,
    term_refs: FxHashMap<String, u32>,
    tuples: Vec<TermTuple>,
}

impl ColumnInverter {
    pub fn new(provider: PostingWriterProvider, column_lengths: Arc<ColumnLengths>) -> ColumnInverter {
        ColumnInverter {
            provider,
            column_lengths,
            analyzer: None,
            terms: Vec::new(),
            term_refs: FxHashMap::default(),
            tuples: Vec::new(),
        }
    }

    /// Binds the analyzer used by subsequent `invert_column` calls.
    pub fn init_analyzer(&mut self, name: &str) -> Result<()> {
        self.analyzer = Some(default_registry().require(name)?);
        Ok(())
    }

    fn intern(&mut self, term: &str) -> u32 {
        if let Some(&term_ref) = self.term_refs.get(term) {
            return term_ref;
        }
        let term_ref = self.terms.len() as u32;
        self.terms.push(term.to_string());
        self.term_refs.insert(term.to_string(), term_ref);
        term_ref
    }

    /// Tokenizes rows `[row_offset, row_offset + row_count)` of `column`.
    /// Row `i` of the slice becomes document `row_id_base + i`.
    pub fn invert_column(
        &mut self,
        column: &[String],
        row_offset: usize,
        row_count: usize,
        row_id_base: RowId,
    ) {
        let analyzer = self
            .analyzer
            .clone()
            .expect("init_analyzer must be called before invert_column");
        for i in 0..row_count {
            let doc: DocId = row_id_base.segment_offset() + i as u32;
            let tokens = analyzer.analyze(&column[row_offset + i]);
            self.column_lengths.add(doc, tokens.len() as u32);
            for token in tokens {
                let term_ref = self.intern(&token.text);
                self.tuples.push(TermTuple {
                    term_ref,
                    doc,
                    pos: token.position,
                });
            }
        }
    }

    /// Moves all tuples of `other` into `self`, consuming `other`.
    pub fn merge(&mut self, other: ColumnInverter) {
        let remap: Vec<u32> = other.terms.iter().map(|term| self.intern(term)).collect();
        self.tuples.reserve(other.tuples.len());
        self.tuples.extend(other.tuples.into_iter().map(|tuple| TermTuple {
            term_ref: remap[tuple.term_ref as usize],
            ..tuple
        }));
    }

    /// Stable sort of the tuple buffer by `(term, doc, pos)`.
    pub fn sort(&mut self) {
        let terms = &self.terms;
        self.tuples.sort_by(|left, right| {
            terms[left.term_ref as usize]
                .cmp(&terms[right.term_ref as usize])
                .then(left.doc.cmp(&right.doc))
                .then(left.pos.cmp(&right.pos))
        });
    }

    /// Flushes the sorted tuples into the provider's writers, in order.
    pub fn generate_posting(&self) {
        for (term_ref, group) in &self.tuples.iter().group_by(|tuple| tuple.term_ref) {
            let writer = (self.provider)(&self.terms[term_ref as usize]);
            let mut writer = writer.lock().expect("poisoned lock");
            for tuple in group {
                writer.add_position(tuple.doc, tuple.pos);
            }
        }
    }

    /// Number of buffered tuples. Used by tests and heuristics.
    pub fn num_tuples(&self) -> usize {
        self.tuples.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::{ColumnInverter, ColumnLengths, PostingWriterProvider};
    use crate::postings::{PostingIterator, PostingWriter, SegmentPosting};
    use crate::{RecordOption, RowId, INVALID_ROWID};

    type SharedWriters = Arc<Mutex<HashMap<String, Arc<Mutex<PostingWriter>>>>>;

    fn writer_provider(writers: &SharedWriters) -> PostingWriterProvider {
        let writers = writers.clone();
        Arc::new(move |term: &str| {
            writers
                .lock()
                .unwrap()
                .entry(term.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(PostingWriter::new(RecordOption::ALL))))
                .clone()
        })
    }

    fn paragraphs() -> Vec<String> {
        vec![
            "A finite-state transducer (FST) is a finite-state machine with two memory tapes, \
             following the terminology for Turing machines: an input tape and an output tape. \
             This contrasts with an ordinary finite-state automaton, which has a single tape. \
             An FST is a type of finite-state automaton (FSA) that maps between two sets of \
             symbols.[1] An FST is more general than an FSA. An FSA defines a formal language \
             by defining a set of accepted strings, while an FST defines a relation between \
             sets of strings."
                .to_string(),
            "An FST will read a set of strings on the input tape and generates a set of \
             relations on the output tape. An FST can be thought of as a translator or relater \
             between strings in a set."
                .to_string(),
            "In morphological parsing, an example would be inputting a string of letters into \
             the FST, the FST would then output a string of morphemes."
                .to_string(),
            "An automaton can be said to recognize a string if we view the content of its tape \
             as input. In other words, the automaton computes a function that maps strings into \
             the set {0,1}. Alternatively, we can say that an automaton generates strings, \
             which means viewing its tape as an output tape. On this view, the automaton \
             generates a formal language, which is a set of strings. The two views of automata \
             are equivalent: the function that the automaton computes is precisely the \
             indicator function of the set of strings it generates. The class of languages \
             generated by finite automata is known as the class of regular languages."
                .to_string(),
            "The two tapes of a transducer are typically viewed as an input tape and an output \
             tape. On this view, a transducer is said to transduce (i.e., translate) the \
             contents of its input tape to its output tape, by accepting a string on its input \
             tape and generating another string on its output tape. It may do so \
             nondeterministically and it may produce more than one output for each input \
             string. A transducer may also produce no output for a given input string, in \
             which case it is said to reject the input. In general, a transducer computes a \
             relation between two formal languages."
                .to_string(),
        ]
    }

    #[test]
    fn test_invert_merge_sort_generate() {
        let column = paragraphs();
        let writers: SharedWriters = Arc::default();
        let provider = writer_provider(&writers);
        let column_lengths = Arc::new(ColumnLengths::default());

        let mut inverter1 = ColumnInverter::new(provider.clone(), column_lengths.clone());
        inverter1.init_analyzer("standard").unwrap();
        let mut inverter2 = ColumnInverter::new(provider, column_lengths.clone());
        inverter2.init_analyzer("standard").unwrap();

        inverter1.invert_column(&column, 0, 3, RowId::new(0, 0));
        inverter2.invert_column(&column, 3, 2, RowId::new(0, 3));

        inverter1.merge(inverter2);
        inverter1.sort();
        inverter1.generate_posting();

        let expected: Vec<(&str, Vec<u32>, Vec<u32>)> = vec![
            ("fst", vec![0, 1, 2], vec![4, 2, 2]),
            ("automaton", vec![0, 3], vec![2, 5]),
            ("transducer", vec![0, 4], vec![1, 4]),
        ];
        for (term, doc_ids, tfs) in expected {
            let writer = writers.lock().unwrap().get(term).cloned().unwrap();
            let writer = writer.lock().unwrap();
            assert_eq!(writer.doc_freq() as usize, doc_ids.len(), "df({term})");
            let posting = SegmentPosting::new(RowId::new(0, 0), writer.serialize());
            let mut iter = PostingIterator::new(RecordOption::ALL, vec![posting]);
            for (doc, tf) in doc_ids.iter().zip(&tfs) {
                assert_eq!(iter.seek_doc(RowId::new(0, *doc)), RowId::new(0, *doc));
                assert_eq!(iter.current_tf(), *tf, "tf({term}, {doc})");
            }
            let last = RowId::new(0, *doc_ids.last().unwrap());
            assert_eq!(iter.seek_doc(last.next()), INVALID_ROWID);
        }
        // every paragraph contributed its token count
        assert!(column_lengths.get(0) > 0);
        assert!(column_lengths.get(4) > 0);
    }

    #[test]
    fn test_two_inverters_produce_identical_writers() {
        let column = paragraphs();
        let run = || {
            let writers: SharedWriters = Arc::default();
            let provider = writer_provider(&writers);
            let lengths = Arc::new(ColumnLengths::default());
            let mut inverter = ColumnInverter::new(provider, lengths);
            inverter.init_analyzer("standard").unwrap();
            inverter.invert_column(&column, 0, 5, RowId::new(0, 0));
            inverter.sort();
            inverter.generate_posting();
            let writers = writers.lock().unwrap();
            let writer = writers.get("tape").unwrap().lock().unwrap();
            writer.serialize().bytes.as_slice().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_unknown_analyzer() {
        let writers: SharedWriters = Arc::default();
        let mut inverter =
            ColumnInverter::new(writer_provider(&writers), Arc::default());
        assert!(inverter.init_analyzer("nope").is_err());
    }
}
