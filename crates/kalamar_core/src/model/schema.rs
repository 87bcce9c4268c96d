//! Property schema declared by one access point.
//!
//! # Responsibility
//! - Hold the ordered, typed list of properties an access point accepts.
//! - Define the positional order used to resolve sugar query segments.
//!
//! # Invariants
//! - Property names are unique and match `^[A-Za-z_][A-Za-z0-9_]*$`.
//! - At most one property has `ValueType::Content`, and it is always named
//!   [`CONTENT_PROPERTY`].
//! - At least one positional (non-content) property exists, so every item has
//!   a record address.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reserved property name of the binary content slot.
pub const CONTENT_PROPERTY: &str = "_content";

static PROPERTY_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid property name regex")
});

/// Declared type of one property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Integer,
    /// Calendar date, written as `YYYY-MM-DD`.
    Date,
    /// Binary payload slot; never positional.
    Content,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Date => "date",
            Self::Content => "content",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Some(Self::String),
            "integer" | "int" => Some(Self::Integer),
            "date" => Some(Self::Date),
            "content" | "binary" => Some(Self::Content),
            _ => None,
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named, typed property slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub value_type: ValueType,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::String)
    }

    /// The reserved binary content slot.
    pub fn content() -> Self {
        Self::new(CONTENT_PROPERTY, ValueType::Content)
    }

    /// Parses a `name[:type]` declaration; type defaults to `string`.
    pub fn parse_spec(spec: &str) -> Result<Self, SchemaError> {
        let spec = spec.trim();
        match spec.split_once(':') {
            Some((name, kind)) => {
                let value_type = ValueType::parse(kind)
                    .ok_or_else(|| SchemaError::UnknownType(kind.trim().to_string()))?;
                Ok(Self::new(name.trim(), value_type))
            }
            None => Ok(Self::string(spec)),
        }
    }

    pub fn is_content(&self) -> bool {
        self.value_type == ValueType::Content
    }
}

/// Schema declaration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    NoPositionalProperty,
    InvalidName(String),
    DuplicateName(String),
    UnknownType(String),
    /// Content type used under another name, or the reserved name with another type.
    MisplacedContentSlot(String),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPositionalProperty => {
                write!(f, "schema must declare at least one non-content property")
            }
            Self::InvalidName(name) => write!(f, "invalid property name `{name}`"),
            Self::DuplicateName(name) => write!(f, "property `{name}` is declared twice"),
            Self::UnknownType(kind) => {
                write!(f, "unknown property type `{kind}`; expected string|integer|date|content")
            }
            Self::MisplacedContentSlot(name) => write!(
                f,
                "property `{name}` conflicts with the content slot; only `{CONTENT_PROPERTY}` may use type `content`"
            ),
        }
    }
}

impl Error for SchemaError {}

/// Ordered property schema of one access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySchema {
    properties: Vec<PropertyDef>,
}

impl PropertySchema {
    pub fn new(properties: Vec<PropertyDef>) -> Result<Self, SchemaError> {
        let mut seen = BTreeSet::new();
        for def in &properties {
            if !PROPERTY_NAME_RE.is_match(&def.name) {
                return Err(SchemaError::InvalidName(def.name.clone()));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(SchemaError::DuplicateName(def.name.clone()));
            }
            if def.is_content() != (def.name == CONTENT_PROPERTY) {
                return Err(SchemaError::MisplacedContentSlot(def.name.clone()));
            }
        }

        if properties.iter().all(PropertyDef::is_content) {
            return Err(SchemaError::NoPositionalProperty);
        }

        Ok(Self { properties })
    }

    /// Builds a schema from `name[:type]` declarations.
    pub fn from_specs<I, S>(specs: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let properties = specs
            .into_iter()
            .map(|spec| PropertyDef::parse_spec(spec.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(properties)
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|def| def.name == name)
    }

    /// Properties in sugar resolution order; the content slot is skipped.
    pub fn positional(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.iter().filter(|def| !def.is_content())
    }

    pub fn has_content_slot(&self) -> bool {
        self.properties.iter().any(PropertyDef::is_content)
    }
}
