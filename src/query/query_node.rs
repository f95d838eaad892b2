//! The compiled query tree and its lowering into doc iterators.

use crate::index::ColumnIndexReader;
use crate::query::{
    AndIterator, DocIterator, EmptyDocIterator, ExcludeIterator, OrIterator, PhraseIterator,
    TermDocIterator,
};
use crate::{Error, Result};

/// One term bound to a field.
#[derive(Debug, Clone, PartialEq)]
pub struct TermQueryNode {
    pub term: String,
    pub field: Option<String>,
    pub weight: f32,
}

/// Terms required at consecutive positions, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseQueryNode {
    pub terms: Vec<String>,
    pub field: Option<String>,
    pub weight: f32,
}

/// Conjunction or disjunction over child nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanQueryNode {
    pub children: Vec<QueryNode>,
    pub weight: f32,
}

/// Tree of query operators produced by the
/// [`SearchDriver`](crate::query::SearchDriver).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Term(TermQueryNode),
    Phrase(PhraseQueryNode),
    And(BooleanQueryNode),
    Or(BooleanQueryNode),
    /// Valid only as the excluded side of a conjunction.
    Not(Box<QueryNode>),
}

impl QueryNode {
    pub fn term(term: impl Into<String>, field: Option<String>) -> QueryNode {
        QueryNode::Term(TermQueryNode {
            term: term.into(),
            field,
            weight: 1.0,
        })
    }

    /// Multiplies this node's weight; boosts compose multiplicatively.
    pub fn multiply_weight(&mut self, boost: f32) {
        match self {
            QueryNode::Term(node) => node.weight *= boost,
            QueryNode::Phrase(node) => node.weight *= boost,
            QueryNode::And(node) | QueryNode::Or(node) => node.weight *= boost,
            QueryNode::Not(child) => child.multiply_weight(boost),
        }
    }

    /// Effective weight of this node.
    pub fn weight(&self) -> f32 {
        match self {
            QueryNode::Term(node) => node.weight,
            QueryNode::Phrase(node) => node.weight,
            QueryNode::And(node) | QueryNode::Or(node) => node.weight,
            QueryNode::Not(child) => child.weight(),
        }
    }

    /// Lowers the tree into a doc iterator against `reader`.
    ///
    /// A term absent from the index becomes an empty iterator. `NOT` is
    /// only meaningful inside a conjunction with at least one positive
    /// clause; anything else is a [`Error::Syntax`].
    pub fn build(&self, reader: &ColumnIndexReader) -> Result<Box<dyn DocIterator>> {
        match self {
            QueryNode::Term(node) => build_term(reader, &node.term),
            QueryNode::Phrase(node) => build_phrase(reader, &node.terms),
            QueryNode::And(node) => build_and(reader, &node.children),
            QueryNode::Or(node) => build_or(reader, &node.children),
            QueryNode::Not(_) => Err(Error::Syntax(
                "NOT is only allowed alongside positive clauses of a conjunction".to_string(),
            )),
        }
    }
}

fn build_term(reader: &ColumnIndexReader, term: &str) -> Result<Box<dyn DocIterator>> {
    match reader.lookup(term)? {
        Some(postings) => Ok(Box::new(TermDocIterator::new(postings))),
        None => Ok(Box::new(EmptyDocIterator)),
    }
}

fn build_phrase(reader: &ColumnIndexReader, terms: &[String]) -> Result<Box<dyn DocIterator>> {
    let mut children = Vec::with_capacity(terms.len());
    for term in terms {
        match reader.lookup(term)? {
            Some(postings) => children.push(TermDocIterator::new(postings)),
            // a missing term can never align
            None => return Ok(Box::new(EmptyDocIterator)),
        }
    }
    if children.is_empty() {
        return Ok(Box::new(EmptyDocIterator));
    }
    Ok(Box::new(PhraseIterator::new(children)))
}

fn build_and(reader: &ColumnIndexReader, children: &[QueryNode]) -> Result<Box<dyn DocIterator>> {
    let mut positives: Vec<Box<dyn DocIterator>> = Vec::new();
    let mut negatives: Vec<Box<dyn DocIterator>> = Vec::new();
    for child in children {
        match child {
            QueryNode::Not(inner) => negatives.push(inner.build(reader)?),
            _ => positives.push(child.build(reader)?),
        }
    }
    if positives.is_empty() {
        return Err(Error::Syntax(
            "a conjunction needs at least one positive clause".to_string(),
        ));
    }
    let positive: Box<dyn DocIterator> = if positives.len() == 1 {
        positives.pop().expect("checked len")
    } else {
        Box::new(AndIterator::new(positives))
    };
    if negatives.is_empty() {
        return Ok(positive);
    }
    let negative: Box<dyn DocIterator> = if negatives.len() == 1 {
        negatives.pop().expect("checked len")
    } else {
        Box::new(OrIterator::new(negatives))
    };
    Ok(Box::new(ExcludeIterator::new(positive, negative)))
}

fn build_or(reader: &ColumnIndexReader, children: &[QueryNode]) -> Result<Box<dyn DocIterator>> {
    let mut iterators: Vec<Box<dyn DocIterator>> = Vec::new();
    for child in children {
        if matches!(child, QueryNode::Not(_)) {
            return Err(Error::Syntax(
                "NOT is not allowed inside a disjunction".to_string(),
            ));
        }
        iterators.push(child.build(reader)?);
    }
    if iterators.len() == 1 {
        return Ok(iterators.pop().expect("checked len"));
    }
    Ok(Box::new(OrIterator::new(iterators)))
}
