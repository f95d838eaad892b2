//! Lexing and parsing of the user-facing query language.
//!
//! ```text
//! query   ::= orexpr
//! orexpr  ::= andexpr (("OR" | ) andexpr)*
//! andexpr ::= unary ("AND" unary)*
//! unary   ::= ["NOT"] atom ["^" number]
//! atom    ::= fieldref | phrase | word | "(" query ")"
//! fieldref::= IDENT ":" atom
//! phrase  ::= '"' WORD (WHITESPACE WORD)* '"'
//! ```
//!
//! The default operator between adjacent terms is `OR`.

use combine::parser::char::{char, digit, letter, space, spaces, string};
use combine::{attempt, eof, many, many1, optional, parser, satisfy, skip_many1, Parser};

use crate::{Error, Result};

/// Raw parse tree, before field defaulting and analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum UserInputAst {
    Leaf(UserInputLiteral),
    Not(Box<UserInputAst>),
    And(Vec<UserInputAst>),
    Or(Vec<UserInputAst>),
    Boost(Box<UserInputAst>, f32),
}

/// A word or quoted phrase, with an optional `field:` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInputLiteral {
    pub field_name: Option<String>,
    pub phrase: String,
    pub is_quoted: bool,
}

/// Recursively assigns `field` to every leaf that has no explicit field.
fn apply_field(ast: UserInputAst, field: &str) -> UserInputAst {
    match ast {
        UserInputAst::Leaf(mut literal) => {
            if literal.field_name.is_none() {
                literal.field_name = Some(field.to_string());
            }
            UserInputAst::Leaf(literal)
        }
        UserInputAst::Not(child) => UserInputAst::Not(Box::new(apply_field(*child, field))),
        UserInputAst::And(children) => UserInputAst::And(
            children
                .into_iter()
                .map(|child| apply_field(child, field))
                .collect(),
        ),
        UserInputAst::Or(children) => UserInputAst::Or(
            children
                .into_iter()
                .map(|child| apply_field(child, field))
                .collect(),
        ),
        UserInputAst::Boost(child, boost) => {
            UserInputAst::Boost(Box::new(apply_field(*child, field)), boost)
        }
    }
}

fn field_name<'a>() -> impl Parser<&'a str, Output = String> {
    (
        letter().or(char('_')),
        many(satisfy(|c: char| {
            c.is_alphanumeric() || c == '_' || c == '-'
        })),
    )
        .skip(char(':'))
        .map(|(first, rest): (char, String)| format!("{first}{rest}"))
}

const SPECIAL_CHARS: [char; 6] = ['(', ')', ':', '^', '"', '\\'];

fn word<'a>() -> impl Parser<&'a str, Output = String> {
    many1(satisfy(|c: char| {
        !c.is_whitespace() && !SPECIAL_CHARS.contains(&c)
    }))
    .and_then(|word: String| match word.as_str() {
        "AND" | "OR" | "NOT" => Err(combine::error::StringStreamError::UnexpectedParse),
        _ => Ok(word),
    })
}

fn quoted_phrase<'a>() -> impl Parser<&'a str, Output = String> {
    char('"')
        .with(many1(satisfy(|c: char| c != '"')))
        .skip(char('"'))
}

fn literal<'a>() -> impl Parser<&'a str, Output = UserInputAst> {
    quoted_phrase()
        .map(|phrase| UserInputLiteral {
            field_name: None,
            phrase,
            is_quoted: true,
        })
        .or(word().map(|phrase| UserInputLiteral {
            field_name: None,
            phrase,
            is_quoted: false,
        }))
        .map(UserInputAst::Leaf)
}

fn spaces1<'a>() -> impl Parser<&'a str, Output = ()> {
    skip_many1(space())
}

fn atom<'a>() -> impl Parser<&'a str, Output = UserInputAst> {
    parser(|input| {
        char('(')
            .with(ast())
            .skip(char(')'))
            .or(attempt(
                string("NOT")
                    .skip(spaces1())
                    .with(atom())
                    .map(|child| UserInputAst::Not(Box::new(child))),
            ))
            .or(attempt(
                (field_name(), atom()).map(|(field, child)| apply_field(child, &field)),
            ))
            .or(literal())
            .parse_stream(input)
            .into_result()
    })
}

fn positive_float_number<'a>() -> impl Parser<&'a str, Output = f32> {
    (many1(digit()), optional((char('.'), many1(digit())))).map(
        |(int_part, decimal_part_opt): (String, Option<(char, String)>)| {
            let mut float_str = int_part;
            if let Some((sep, decimal_str)) = decimal_part_opt {
                float_str.push(sep);
                float_str.push_str(&decimal_str);
            }
            float_str.parse::<f32>().expect("parsed from digits")
        },
    )
}

fn boost<'a>() -> impl Parser<&'a str, Output = f32> {
    char('^').with(positive_float_number())
}

fn boosted_atom<'a>() -> impl Parser<&'a str, Output = UserInputAst> {
    (atom(), optional(boost())).map(|(ast, boost_opt)| match boost_opt {
        Some(boost) if (boost - 1.0).abs() > f32::EPSILON => {
            UserInputAst::Boost(Box::new(ast), boost)
        }
        _ => ast,
    })
}

#[derive(Clone, Copy)]
enum BinaryOperand {
    Or,
    And,
}

fn binary_operand<'a>() -> impl Parser<&'a str, Output = BinaryOperand> {
    string("AND")
        .skip(spaces1())
        .map(|_| BinaryOperand::And)
        .or(string("OR").skip(spaces1()).map(|_| BinaryOperand::Or))
}

/// Folds a chain of operands into the tree. `AND` binds tighter than `OR`;
/// a missing operator means `OR`.
fn aggregate_binary_expressions(
    first: UserInputAst,
    rest: Vec<(Option<BinaryOperand>, UserInputAst)>,
) -> UserInputAst {
    let mut disjuncts: Vec<Vec<UserInputAst>> = vec![vec![first]];
    for (operand, ast) in rest {
        match operand {
            Some(BinaryOperand::And) => {
                disjuncts
                    .last_mut()
                    .expect("always starts with one group")
                    .push(ast);
            }
            _ => disjuncts.push(vec![ast]),
        }
    }
    let mut or_children: Vec<UserInputAst> = disjuncts
        .into_iter()
        .map(|mut group| {
            if group.len() == 1 {
                group.pop().expect("group is non-empty")
            } else {
                UserInputAst::And(group)
            }
        })
        .collect();
    if or_children.len() == 1 {
        or_children.pop().expect("checked len")
    } else {
        UserInputAst::Or(or_children)
    }
}

fn ast<'a>() -> impl Parser<&'a str, Output = UserInputAst> {
    let chain = (
        boosted_atom().skip(spaces()),
        many((
            optional(attempt(binary_operand())),
            boosted_atom().skip(spaces()),
        )),
    )
        .map(
            |(first, rest): (UserInputAst, Vec<(Option<BinaryOperand>, UserInputAst)>)| {
                aggregate_binary_expressions(first, rest)
            },
        );
    spaces().with(chain)
}

/// Parses `query` into its raw tree; `Ok(None)` for an all-whitespace query.
pub fn parse_query(query: &str) -> Result<Option<UserInputAst>> {
    match spaces().with(optional(ast()).skip(eof())).parse(query) {
        Ok((ast_opt, _rest)) => Ok(ast_opt),
        Err(_err) => Err(Error::Syntax(format!("failed to parse query: '{query}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_query, UserInputAst, UserInputLiteral};

    fn leaf(field: Option<&str>, phrase: &str, quoted: bool) -> UserInputAst {
        UserInputAst::Leaf(UserInputLiteral {
            field_name: field.map(str::to_string),
            phrase: phrase.to_string(),
            is_quoted: quoted,
        })
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(parse_query("").unwrap(), None);
        assert_eq!(parse_query("   ").unwrap(), None);
    }

    #[test]
    fn test_single_word() {
        assert_eq!(
            parse_query("hello").unwrap().unwrap(),
            leaf(None, "hello", false)
        );
    }

    #[test]
    fn test_default_operator_is_or() {
        assert_eq!(
            parse_query("hello world").unwrap().unwrap(),
            UserInputAst::Or(vec![leaf(None, "hello", false), leaf(None, "world", false)])
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            parse_query("a AND b OR c").unwrap().unwrap(),
            UserInputAst::Or(vec![
                UserInputAst::And(vec![leaf(None, "a", false), leaf(None, "b", false)]),
                leaf(None, "c", false),
            ])
        );
    }

    #[test]
    fn test_quoted_phrase() {
        assert_eq!(
            parse_query("\"finite state\"").unwrap().unwrap(),
            leaf(None, "finite state", true)
        );
    }

    #[test]
    fn test_field_prefix() {
        assert_eq!(
            parse_query("title:hello").unwrap().unwrap(),
            leaf(Some("title"), "hello", false)
        );
    }

    #[test]
    fn test_field_prefix_distributes_over_group() {
        assert_eq!(
            parse_query("title:(a b)").unwrap().unwrap(),
            UserInputAst::Or(vec![
                leaf(Some("title"), "a", false),
                leaf(Some("title"), "b", false),
            ])
        );
    }

    #[test]
    fn test_not_and_boost() {
        assert_eq!(
            parse_query("a AND NOT b").unwrap().unwrap(),
            UserInputAst::And(vec![
                leaf(None, "a", false),
                UserInputAst::Not(Box::new(leaf(None, "b", false))),
            ])
        );
        assert_eq!(
            parse_query("hello^2").unwrap().unwrap(),
            UserInputAst::Boost(Box::new(leaf(None, "hello", false)), 2.0)
        );
        // a boost of exactly one is dropped
        assert_eq!(
            parse_query("hello^1").unwrap().unwrap(),
            leaf(None, "hello", false)
        );
    }

    #[test]
    fn test_parens_group() {
        assert_eq!(
            parse_query("(a OR b) AND c").unwrap().unwrap(),
            UserInputAst::And(vec![
                UserInputAst::Or(vec![leaf(None, "a", false), leaf(None, "b", false)]),
                leaf(None, "c", false),
            ])
        );
    }

    #[test]
    fn test_malformed_queries() {
        assert!(parse_query("(unclosed").is_err());
        assert!(parse_query("\"unterminated").is_err());
        assert!(parse_query("AND trailing").is_err());
        assert!(parse_query("dangling AND").is_err());
    }
}
