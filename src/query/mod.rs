//! Query execution: the iterator algebra over posting lists and the parser
//! producing query trees.

mod and_iterator;
mod doc_iterator;
mod exclude_iterator;
pub(crate) mod grammar;
mod or_iterator;
mod phrase_iterator;
mod query_node;
mod search_driver;
mod term_iterator;

pub use self::and_iterator::AndIterator;
pub use self::doc_iterator::{DocIterator, EmptyDocIterator, VecDocIterator};
pub use self::exclude_iterator::ExcludeIterator;
pub use self::or_iterator::OrIterator;
pub use self::phrase_iterator::PhraseIterator;
pub use self::query_node::{BooleanQueryNode, PhraseQueryNode, QueryNode, TermQueryNode};
pub use self::search_driver::SearchDriver;
pub use self::term_iterator::TermDocIterator;
