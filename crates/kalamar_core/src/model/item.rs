//! Item value object.
//!
//! # Responsibility
//! - Hold one bag of typed properties bound to an access point schema.
//! - Reject unknown keys and mistyped values at construction time.
//!
//! # Invariants
//! - Every present key is declared by the schema and holds a value of the
//!   declared type.
//! - Positional text values are never empty, so every complete item has a
//!   record key that also parses as a sugar query.
//! - Equality compares access point name and properties only; the origin
//!   record key is bookkeeping and never part of identity.
//! - Items are snapshots: edits return a new `Item`.

use super::schema::{PropertySchema, ValueType, CONTENT_PROPERTY};
use super::value::{PropertyValue, ValueParseError};
use crate::access_point::AccessPoint;
use crate::store::RecordKey;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Property name to typed value.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

pub type ItemResult<T> = Result<T, ItemError>;

/// Item construction and mutation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    UnknownProperty {
        access_point: String,
        property: String,
    },
    TypeMismatch {
        property: String,
        expected: ValueType,
        found: ValueType,
    },
    InvalidValue {
        property: String,
        source: ValueParseError,
    },
    /// Empty text in a positional slot.
    EmptyValue {
        property: String,
    },
    /// Item handed to an access point it was not created for.
    WrongAccessPoint {
        expected: String,
        found: String,
    },
}

impl Display for ItemError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProperty {
                access_point,
                property,
            } => write!(
                f,
                "property `{property}` is not declared by access point `{access_point}`"
            ),
            Self::TypeMismatch {
                property,
                expected,
                found,
            } => write!(
                f,
                "property `{property}` expects a {expected} value, got {found}"
            ),
            Self::InvalidValue { property, source } => {
                write!(f, "invalid value for property `{property}`: {source}")
            }
            Self::EmptyValue { property } => {
                write!(f, "property `{property}` cannot be empty")
            }
            Self::WrongAccessPoint { expected, found } => write!(
                f,
                "item belongs to access point `{found}`, not `{expected}`"
            ),
        }
    }
}

impl Error for ItemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidValue { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Snapshot of one stored or to-be-stored item.
#[derive(Debug, Clone)]
pub struct Item {
    access_point: String,
    schema: Arc<PropertySchema>,
    properties: PropertyMap,
    origin: Option<RecordKey>,
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.access_point == other.access_point && self.properties == other.properties
    }
}

impl Eq for Item {}

impl Item {
    /// Creates a transient item from typed properties.
    ///
    /// Does not touch storage; pass the result to `Site::save` to persist it.
    pub fn create(access_point: &AccessPoint, properties: PropertyMap) -> ItemResult<Self> {
        let schema = access_point.schema_handle();
        for (name, value) in &properties {
            check_property(access_point.name(), &schema, name, value)?;
        }

        Ok(Self {
            access_point: access_point.name().to_string(),
            schema,
            properties,
            origin: None,
        })
    }

    /// Creates a transient item from textual values parsed per schema type.
    pub fn create_from_text<I, K, V>(access_point: &AccessPoint, properties: I) -> ItemResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let schema = access_point.schema_handle();
        let mut typed = PropertyMap::new();
        for (name, raw) in properties {
            let name = name.into();
            let Some(def) = schema.get(&name) else {
                return Err(ItemError::UnknownProperty {
                    access_point: access_point.name().to_string(),
                    property: name,
                });
            };
            let value = PropertyValue::parse(def.value_type, raw.as_ref()).map_err(|source| {
                ItemError::InvalidValue {
                    property: name.clone(),
                    source,
                }
            })?;
            check_property(access_point.name(), &schema, &name, &value)?;
            typed.insert(name, value);
        }

        Ok(Self {
            access_point: access_point.name().to_string(),
            schema,
            properties: typed,
            origin: None,
        })
    }

    /// Rebuilds a persisted item; caller guarantees schema conformance.
    pub(crate) fn restore(
        access_point: &str,
        schema: Arc<PropertySchema>,
        properties: PropertyMap,
        origin: RecordKey,
    ) -> Self {
        Self {
            access_point: access_point.to_string(),
            schema,
            properties,
            origin: Some(origin),
        }
    }

    pub fn access_point(&self) -> &str {
        &self.access_point
    }

    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Returns `None` when the property is not set.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Textual form of a property, `None` when not set.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(PropertyValue::to_text)
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.get(CONTENT_PROPERTY).and_then(PropertyValue::as_bytes)
    }

    /// Record key this item was loaded from or last saved to.
    pub fn origin(&self) -> Option<&RecordKey> {
        self.origin.as_ref()
    }

    pub fn is_persisted(&self) -> bool {
        self.origin.is_some()
    }

    /// Positional properties still unset, in schema order.
    pub fn missing_properties(&self) -> Vec<String> {
        self.schema
            .positional()
            .filter(|def| !self.properties.contains_key(&def.name))
            .map(|def| def.name.clone())
            .collect()
    }

    /// Returns a copy with one property replaced.
    ///
    /// The origin is kept, so saving the copy relocates the stored record.
    pub fn with_property(
        &self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> ItemResult<Self> {
        let name = name.into();
        let value = value.into();
        check_property(&self.access_point, &self.schema, &name, &value)?;

        let mut next = self.clone();
        next.properties.insert(name, value);
        Ok(next)
    }

    /// Returns a copy with one property unset.
    pub fn without_property(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.properties.remove(name);
        next
    }

    pub(crate) fn set_origin(&mut self, key: RecordKey) {
        self.origin = Some(key);
    }
}

fn check_property(
    access_point: &str,
    schema: &PropertySchema,
    name: &str,
    value: &PropertyValue,
) -> ItemResult<()> {
    let Some(def) = schema.get(name) else {
        return Err(ItemError::UnknownProperty {
            access_point: access_point.to_string(),
            property: name.to_string(),
        });
    };

    if def.value_type != value.value_type() {
        return Err(ItemError::TypeMismatch {
            property: name.to_string(),
            expected: def.value_type,
            found: value.value_type(),
        });
    }

    if !def.is_content() && matches!(value, PropertyValue::Text(text) if text.is_empty()) {
        return Err(ItemError::EmptyValue {
            property: name.to_string(),
        });
    }

    Ok(())
}
