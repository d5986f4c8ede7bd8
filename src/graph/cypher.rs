//! RETURN clause column extraction for Cypher statements.
//!
//! Backends that receive rows keyed by column need the names of the final
//! projection. The statement is parsed with a pest grammar
//! (`graph/cypher.pest`) that treats every clause except RETURN as an opaque
//! token stream and parses the RETURN projection into items.
//!
//! # Example
//!
//! ```
//! use graphmap::graph::extract_return_columns;
//!
//! let columns = extract_return_columns("MATCH (n) RETURN n.name AS name, n.age").unwrap();
//! assert_eq!(columns, vec!["name", "n.age"]);
//! ```

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "graph/cypher.pest"]
struct CypherParser;

/// Extracts column names from a Cypher query's final RETURN clause.
///
/// For aliased expressions (`expr AS alias`) returns the alias, otherwise the
/// expression text as written. Earlier projections (`WITH`, or the first
/// half of a `UNION`) are ignored.
///
/// # Errors
///
/// * [`ParseError::NoReturnClause`] for write-only statements.
/// * [`ParseError::ReturnStarNotSupported`] for `RETURN *`.
/// * [`ParseError::InvalidSyntax`] when the statement does not tokenize,
///   e.g. an unterminated string or unbalanced brackets.
///
/// # Example
///
/// ```
/// use graphmap::graph::extract_return_columns;
///
/// let cols = extract_return_columns("MATCH (a)-[r]->(b) RETURN a, r AS rel, b").unwrap();
/// assert_eq!(cols, vec!["a", "rel", "b"]);
///
/// // Property names that spell keywords stay inside the projection
/// let cols = extract_return_columns("MATCH (p:Plan) RETURN p.limit AS cap LIMIT 5").unwrap();
/// assert_eq!(cols, vec!["cap"]);
/// ```
pub fn extract_return_columns(query: &str) -> Result<Vec<String>, ParseError> {
    let pairs = CypherParser::parse(Rule::Cypher, query)
        .map_err(|e| ParseError::InvalidSyntax(e.to_string()))?;

    let mut columns = Vec::new();
    collect_last_return(pairs, &mut columns)?;

    if columns.is_empty() {
        return Err(ParseError::NoReturnClause);
    }
    Ok(columns)
}

/// Walks the parse tree; each RETURN found replaces the columns collected so far.
fn collect_last_return(pairs: Pairs<Rule>, columns: &mut Vec<String>) -> Result<(), ParseError> {
    for pair in pairs {
        match pair.as_rule() {
            Rule::Return => {
                columns.clear();
                for inner in pair.into_inner() {
                    if inner.as_rule() == Rule::ProjectionItems {
                        projection_columns(inner, columns)?;
                    }
                }
            }
            _ => collect_last_return(pair.into_inner(), columns)?,
        }
    }
    Ok(())
}

fn projection_columns(items: Pair<Rule>, columns: &mut Vec<String>) -> Result<(), ParseError> {
    for item in items.into_inner() {
        match item.as_rule() {
            Rule::Star => return Err(ParseError::ReturnStarNotSupported),
            Rule::ProjectionItem => columns.push(column_name(item)),
            _ => {}
        }
    }
    Ok(())
}

/// The alias of `expr AS alias`, or the trimmed expression text.
fn column_name(item: Pair<Rule>) -> String {
    let full_text = item.as_str().trim().to_string();
    let mut expression = None;
    let mut alias = None;

    for inner in item.into_inner() {
        match inner.as_rule() {
            Rule::Expression => expression = Some(inner.as_str().trim().to_string()),
            Rule::Variable => alias = Some(unescape_name(inner.as_str().trim())),
            _ => {}
        }
    }

    alias.or(expression).unwrap_or(full_text)
}

fn unescape_name(name: &str) -> String {
    match name.strip_prefix('`').and_then(|n| n.strip_suffix('`')) {
        Some(inner) => inner.replace("``", "`"),
        None => name.to_string(),
    }
}

/// Errors that can occur while extracting return columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No RETURN clause found in the query
    NoReturnClause,
    /// RETURN * requires variable tracking (not supported)
    ReturnStarNotSupported,
    /// The statement does not match the grammar
    InvalidSyntax(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::NoReturnClause => write!(f, "No RETURN clause found in query"),
            ParseError::ReturnStarNotSupported => {
                write!(
                    f,
                    "RETURN * is not supported - please specify columns explicitly"
                )
            }
            ParseError::InvalidSyntax(msg) => write!(f, "Invalid syntax: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}
