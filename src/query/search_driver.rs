//! The driver turning query text into a [`QueryNode`] tree: field lists with
//! boosts, per-field parsing, and re-analysis of leaf terms.

use std::collections::HashMap;

use crate::analyzer::default_registry;
use crate::query::grammar::{self, UserInputAst, UserInputLiteral};
use crate::query::query_node::{BooleanQueryNode, PhraseQueryNode, QueryNode, TermQueryNode};
use crate::{Error, Result};

/// Splits `"body^2"` into `("body", 2.0)`; a missing caret means boost 1.
fn parse_field(field: &str) -> Result<(String, f32)> {
    match field.split_once('^') {
        None => Ok((field.to_string(), 1.0)),
        Some((name, boost)) => {
            let boost: f32 = boost
                .parse()
                .map_err(|_| Error::Config(format!("invalid field boost: '{field}'")))?;
            Ok((name.to_string(), boost))
        }
    }
}

/// Parses a `"f1^b1,f2^b2,..."` list.
fn parse_fields(fields_str: &str) -> Result<Vec<(String, f32)>> {
    if fields_str.is_empty() {
        return Ok(Vec::new());
    }
    fields_str.split(',').map(parse_field).collect()
}

/// Parses query text into query trees, applying per-field analyzers to leaf
/// terms.
pub struct SearchDriver {
    field2analyzer: HashMap<String, String>,
    default_field: String,
}

impl SearchDriver {
    pub fn new(field2analyzer: HashMap<String, String>, default_field: &str) -> SearchDriver {
        SearchDriver {
            field2analyzer,
            default_field: default_field.to_string(),
        }
    }

    /// Parses `query` against the driver's default field.
    ///
    /// `Ok(None)` means the query was empty.
    pub fn parse(&self, query: &str) -> Result<Option<QueryNode>> {
        self.parse_single(query, &self.default_field)
    }

    /// Parses `query` once per entry of the `"f1^b1,f2^b2,..."` fields
    /// list, OR-ing the per-field trees together weighted by their boosts.
    ///
    /// An empty list falls back to the driver's default field; a single
    /// field just scales the root.
    pub fn parse_with_fields(&self, fields_str: &str, query: &str) -> Result<Option<QueryNode>> {
        let fields = parse_fields(fields_str)?;
        match fields.len() {
            0 => self.parse(query),
            1 => {
                let (field, boost) = &fields[0];
                let mut node_opt = self.parse_single(query, field)?;
                if let Some(node) = node_opt.as_mut() {
                    node.multiply_weight(*boost);
                }
                Ok(node_opt)
            }
            _ => {
                let mut or_children = Vec::new();
                for (field, boost) in &fields {
                    if let Some(mut node) = self.parse_single(query, field)? {
                        node.multiply_weight(*boost);
                        or_children.push(node);
                    }
                }
                match or_children.len() {
                    0 => Ok(None),
                    1 => Ok(or_children.pop()),
                    _ => Ok(Some(QueryNode::Or(BooleanQueryNode {
                        children: or_children,
                        weight: 1.0,
                    }))),
                }
            }
        }
    }

    fn parse_single(&self, query: &str, default_field: &str) -> Result<Option<QueryNode>> {
        match grammar::parse_query(query)? {
            Some(ast) => Ok(Some(self.build_node(ast, default_field)?)),
            None => Ok(None),
        }
    }

    fn build_node(&self, ast: UserInputAst, default_field: &str) -> Result<QueryNode> {
        match ast {
            UserInputAst::Leaf(literal) => self.build_leaf(literal, default_field),
            UserInputAst::Not(child) => Ok(QueryNode::Not(Box::new(
                self.build_node(*child, default_field)?,
            ))),
            UserInputAst::And(children) => Ok(QueryNode::And(BooleanQueryNode {
                children: children
                    .into_iter()
                    .map(|child| self.build_node(child, default_field))
                    .collect::<Result<Vec<_>>>()?,
                weight: 1.0,
            })),
            UserInputAst::Or(children) => Ok(QueryNode::Or(BooleanQueryNode {
                children: children
                    .into_iter()
                    .map(|child| self.build_node(child, default_field))
                    .collect::<Result<Vec<_>>>()?,
                weight: 1.0,
            })),
            UserInputAst::Boost(child, boost) => {
                let mut node = self.build_node(*child, default_field)?;
                node.multiply_weight(boost);
                Ok(node)
            }
        }
    }

    /// Re-analyzes a leaf with the analyzer mapped to its field: one term
    /// stays a term query, several become a phrase (positions enforced),
    /// none is a syntax error.
    fn build_leaf(&self, literal: UserInputLiteral, default_field: &str) -> Result<QueryNode> {
        let field = literal
            .field_name
            .unwrap_or_else(|| default_field.to_string());
        let field_opt = (!field.is_empty()).then(|| field.clone());
        let analyzer_name = self.field2analyzer.get(&field);
        let terms: Vec<String> = match analyzer_name {
            Some(name) => default_registry()
                .require(name)?
                .analyze(&literal.phrase)
                .into_iter()
                .map(|token| token.text)
                .collect(),
            None if literal.is_quoted => literal
                .phrase
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            None => vec![literal.phrase],
        };
        match terms.len() {
            0 => Err(Error::Syntax("Empty terms after analyzing".to_string())),
            1 => Ok(QueryNode::Term(TermQueryNode {
                term: terms.into_iter().next().expect("checked len"),
                field: field_opt,
                weight: 1.0,
            })),
            _ => Ok(QueryNode::Phrase(PhraseQueryNode {
                terms,
                field: field_opt,
                weight: 1.0,
            })),
        }
    }
}
