//! Typed property values.
//!
//! # Invariants
//! - `PropertyValue::parse(t, text)` and `to_text()` are inverse for every
//!   non-content type.
//! - Equality is type-aware: `Integer(2)` never equals `Text("2")`.

use super::schema::ValueType;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One property value, typed by the owning schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    Binary(Vec<u8>),
}

/// Raised when text cannot be read as the declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueParseError {
    pub expected: ValueType,
    pub value: String,
}

impl Display for ValueParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` is not a valid {} value", self.value, self.expected)
    }
}

impl Error for ValueParseError {}

impl PropertyValue {
    /// Reads a textual value as `value_type`.
    pub fn parse(value_type: ValueType, raw: &str) -> Result<Self, ValueParseError> {
        let invalid = || ValueParseError {
            expected: value_type,
            value: raw.to_string(),
        };

        match value_type {
            ValueType::String => Ok(Self::Text(raw.to_string())),
            ValueType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| invalid()),
            ValueType::Date => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(Self::Date)
                .map_err(|_| invalid()),
            ValueType::Content => Ok(Self::Binary(raw.as_bytes().to_vec())),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Text(_) => ValueType::String,
            Self::Integer(_) => ValueType::Integer,
            Self::Date(_) => ValueType::Date,
            Self::Binary(_) => ValueType::Content,
        }
    }

    /// Textual form used for queries, record keys and backend metadata.
    ///
    /// Binary payloads are rendered lossily; they never take part in addressing.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Date(value) => value.format(DATE_FORMAT).to_string(),
            Self::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
            other => f.write_str(&other.to_text()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<NaiveDate> for PropertyValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}
