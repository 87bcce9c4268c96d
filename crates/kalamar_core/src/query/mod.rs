//! Path query language.
//!
//! # Responsibility
//! - Parse `/`-separated path queries into typed equality constraints.
//! - Evaluate constraints against item property maps.
//!
//! # Invariants
//! - Query syntax errors surface synchronously and are never retried.
//! - Evaluation is a pure conjunction; constraint order does not matter.

pub mod parser;
pub mod predicate;

use crate::model::value::PropertyValue;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use parser::{escape_value, explicit_query, parse_query};
pub use predicate::{matches, Predicate};

pub type QueryResult<T> = Result<T, QueryError>;

/// One equality constraint produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub property: String,
    pub expected: PropertyValue,
}

/// Query syntax and resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    MalformedQuery {
        query: String,
        message: String,
    },
    UnknownProperty {
        property: String,
    },
    TooManySugarSegments {
        query: String,
        /// Positional slots the schema offers.
        available: usize,
    },
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedQuery { query, message } => {
                write!(f, "malformed query `{query}`: {message}")
            }
            Self::UnknownProperty { property } => write!(f, "unknown property `{property}`"),
            Self::TooManySugarSegments { query, available } => write!(
                f,
                "query `{query}` has more positional segments than the {available} available properties"
            ),
        }
    }
}

impl Error for QueryError {}
