//! Path query parser.
//!
//! # Responsibility
//! - Split a `/`-separated query into explicit (`key=value`) and sugar
//!   (bare value) segments.
//! - Resolve sugar segments against the schema's positional order.
//! - Convert every expected value to the property's declared type.
//!
//! # Invariants
//! - The empty query yields no constraint.
//! - Escapes use backslash: `\/`, `\=` and `\\`. `escape_value` is the exact
//!   inverse and is shared with record key derivation.
//! - A property is constrained at most once per query.

use super::{Constraint, QueryError, QueryResult};
use crate::model::schema::{PropertyDef, PropertySchema};
use crate::model::value::PropertyValue;
use std::collections::BTreeSet;

const SEPARATOR: char = '/';
const ASSIGN: char = '=';
const ESCAPE: char = '\\';

#[derive(Debug, PartialEq, Eq)]
struct Segment {
    key: Option<String>,
    value: String,
}

/// Parses `query` into constraints against `schema`, in input order.
///
/// # Errors
/// - `MalformedQuery` for empty segments, bad escapes, repeated properties
///   or values that do not parse as the declared type.
/// - `UnknownProperty` for explicit keys the schema does not declare or that
///   name the content slot.
/// - `TooManySugarSegments` when bare values outnumber free positions.
pub fn parse_query(schema: &PropertySchema, query: &str) -> QueryResult<Vec<Constraint>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let segments = split_segments(query)?;
    let positional: Vec<&PropertyDef> = schema.positional().collect();
    let mut consumed = BTreeSet::<&str>::new();
    let mut next_slot = 0_usize;
    let mut constraints = Vec::with_capacity(segments.len());

    for segment in segments {
        let def = match segment.key {
            Some(key) => {
                let def = schema
                    .get(&key)
                    .filter(|def| !def.is_content())
                    .ok_or(QueryError::UnknownProperty { property: key })?;
                if !consumed.insert(def.name.as_str()) {
                    return Err(malformed(
                        query,
                        format!("property `{}` is constrained twice", def.name),
                    ));
                }
                def
            }
            None => {
                while positional
                    .get(next_slot)
                    .is_some_and(|def| consumed.contains(def.name.as_str()))
                {
                    next_slot += 1;
                }
                let Some(def) = positional.get(next_slot).copied() else {
                    return Err(QueryError::TooManySugarSegments {
                        query: query.to_string(),
                        available: positional.len(),
                    });
                };
                consumed.insert(def.name.as_str());
                next_slot += 1;
                def
            }
        };

        let expected = PropertyValue::parse(def.value_type, &segment.value)
            .map_err(|err| malformed(query, format!("property `{}`: {err}", def.name)))?;
        constraints.push(Constraint {
            property: def.name.clone(),
            expected,
        });
    }

    Ok(constraints)
}

/// Escapes `/`, `=` and `\` so `value` survives as one literal segment.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, SEPARATOR | ASSIGN | ESCAPE) {
            escaped.push(ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Builds an explicit `key=value/...` query with escaped values.
pub fn explicit_query<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}{ASSIGN}{}", escape_value(value)))
        .collect::<Vec<_>>()
        .join("/")
}

fn split_segments(query: &str) -> QueryResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut key: Option<String> = None;
    let mut current = String::new();
    let mut chars = query.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(escaped @ (SEPARATOR | ASSIGN | ESCAPE)) => current.push(escaped),
                Some(other) => {
                    return Err(malformed(
                        query,
                        format!("unsupported escape sequence `\\{other}`"),
                    ));
                }
                None => return Err(malformed(query, "dangling escape at end of query")),
            },
            SEPARATOR => {
                segments.push(finish_segment(query, key.take(), std::mem::take(&mut current))?);
            }
            ASSIGN if key.is_none() => key = Some(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(finish_segment(query, key, current)?);

    Ok(segments)
}

fn finish_segment(query: &str, key: Option<String>, value: String) -> QueryResult<Segment> {
    match key {
        Some(key) if key.is_empty() => Err(malformed(query, "segment has an empty property name")),
        None if value.is_empty() => Err(malformed(query, "query contains an empty segment")),
        key => Ok(Segment { key, value }),
    }
}

fn malformed(query: &str, message: impl Into<String>) -> QueryError {
    QueryError::MalformedQuery {
        query: query.to_string(),
        message: message.into(),
    }
}
