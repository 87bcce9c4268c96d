//! Access point: one named schema bound to a storage backend and codec.
//!
//! # Responsibility
//! - Enumerate raw records and materialize them into items.
//! - Derive record keys and persist/delete items through the backend.
//!
//! # Invariants
//! - This is the only layer that talks to backends and codecs.
//! - Record keys are a pure function of an item's positional properties:
//!   the schema-ordered, escaped values joined with `/`.
//! - Incomplete items are rejected before any backend call.

use crate::codec::{CodecError, ContentCodec, TextProperties};
use crate::model::item::{Item, ItemError, PropertyMap};
use crate::model::schema::{PropertySchema, CONTENT_PROPERTY};
use crate::model::value::PropertyValue;
use crate::query::escape_value;
use crate::store::{RawRecord, RecordIter, RecordKey, StorageBackend, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type AccessPointResult<T> = Result<T, AccessPointError>;

#[derive(Debug)]
pub enum AccessPointError {
    Item(ItemError),
    IncompleteItem {
        access_point: String,
        missing: Vec<String>,
    },
    /// Stored payload or metadata cannot be read back as an item.
    CorruptContent {
        access_point: String,
        key: RecordKey,
        message: String,
    },
    NotFound {
        access_point: String,
        key: RecordKey,
    },
    /// Item properties cannot be written by the configured codec.
    Codec(CodecError),
    Store(StoreError),
}

impl Display for AccessPointError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item(err) => write!(f, "{err}"),
            Self::IncompleteItem {
                access_point,
                missing,
            } => write!(
                f,
                "item for access point `{access_point}` is missing: {}",
                missing.join(", ")
            ),
            Self::CorruptContent {
                access_point,
                key,
                message,
            } => write!(
                f,
                "record `{key}` of access point `{access_point}` is corrupt: {message}"
            ),
            Self::NotFound { access_point, key } => {
                write!(f, "record `{key}` not found in access point `{access_point}`")
            }
            Self::Codec(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccessPointError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Item(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::IncompleteItem { .. } | Self::CorruptContent { .. } | Self::NotFound { .. } => {
                None
            }
        }
    }
}

impl From<ItemError> for AccessPointError {
    fn from(value: ItemError) -> Self {
        Self::Item(value)
    }
}

impl From<StoreError> for AccessPointError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<CodecError> for AccessPointError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

pub struct AccessPoint {
    name: String,
    schema: Arc<PropertySchema>,
    store: Box<dyn StorageBackend>,
    codec: Option<Box<dyn ContentCodec>>,
}

impl AccessPoint {
    pub fn new(
        name: impl Into<String>,
        schema: PropertySchema,
        store: Box<dyn StorageBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            schema: Arc::new(schema),
            store,
            codec: None,
        }
    }

    /// Attaches a content codec applied on every read and write.
    pub fn with_codec(mut self, codec: Box<dyn ContentCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    pub(crate) fn schema_handle(&self) -> Arc<PropertySchema> {
        Arc::clone(&self.schema)
    }

    pub fn store_kind(&self) -> &'static str {
        self.store.kind()
    }

    pub fn codec_name(&self) -> Option<&'static str> {
        self.codec.as_ref().map(|codec| codec.name())
    }

    /// Starts a fresh lazy enumeration of stored records.
    pub fn records(&self) -> AccessPointResult<RecordIter<'_>> {
        Ok(RecordIter::new(self.store.as_ref())?)
    }

    /// Turns one raw record into an item.
    ///
    /// Backend metadata is read first; codec-decoded properties override it.
    /// Properties the schema does not declare are dropped.
    pub fn materialize(&self, raw: RawRecord) -> AccessPointResult<Item> {
        let RawRecord {
            key,
            metadata,
            content,
        } = raw;

        let (mut text, body) = match &self.codec {
            Some(codec) => {
                let decoded = codec
                    .decode(&content)
                    .map_err(|err| self.corrupt(&key, err.to_string()))?;
                let mut merged = metadata;
                merged.extend(decoded.properties);
                (merged, decoded.body)
            }
            None => (metadata, content),
        };

        let mut properties = PropertyMap::new();
        for def in self.schema.positional() {
            let Some(raw_value) = text.remove(&def.name) else {
                continue;
            };
            let value = PropertyValue::parse(def.value_type, &raw_value)
                .map_err(|err| self.corrupt(&key, format!("property `{}`: {err}", def.name)))?;
            properties.insert(def.name.clone(), value);
        }
        if self.schema.has_content_slot() {
            properties.insert(CONTENT_PROPERTY.to_string(), PropertyValue::Binary(body));
        }

        Ok(Item::restore(
            &self.name,
            self.schema_handle(),
            properties,
            key,
        ))
    }

    /// Deterministic address of `item`: its canonical sugar query.
    pub fn record_key(&self, item: &Item) -> AccessPointResult<RecordKey> {
        self.ensure_owned(item)?;

        let missing = item.missing_properties();
        if !missing.is_empty() {
            return Err(AccessPointError::IncompleteItem {
                access_point: self.name.clone(),
                missing,
            });
        }

        let segments: Vec<String> = self
            .schema
            .positional()
            .filter_map(|def| item.get(&def.name))
            .map(|value| escape_value(&value.to_text()))
            .collect();
        Ok(RecordKey::new(segments.join("/")))
    }

    /// Writes `item`, creating or replacing its record.
    ///
    /// A persisted item whose key changed is moved: the record at its origin
    /// is dropped in the same backend operation.
    pub fn persist(&self, item: &Item) -> AccessPointResult<RecordKey> {
        let key = self.record_key(item)?;

        let metadata: TextProperties = self
            .schema
            .positional()
            .filter_map(|def| item.get(&def.name).map(|value| (def.name.clone(), value.to_text())))
            .collect();
        let body = item.content().unwrap_or_default();
        let content = match &self.codec {
            Some(codec) => codec.encode(&metadata, body)?,
            None => body.to_vec(),
        };

        let record = RawRecord {
            key: key.clone(),
            metadata,
            content,
        };
        match item.origin() {
            Some(previous) if *previous != key => self.store.replace(previous, &record)?,
            _ => self.store.write(&record)?,
        }

        Ok(key)
    }

    /// Deletes the record `item` was loaded from (or would be saved to).
    pub fn delete(&self, item: &Item) -> AccessPointResult<()> {
        let key = match item.origin() {
            Some(origin) => {
                self.ensure_owned(item)?;
                origin.clone()
            }
            None => self.record_key(item)?,
        };

        if !self.store.delete(&key)? {
            return Err(AccessPointError::NotFound {
                access_point: self.name.clone(),
                key,
            });
        }
        Ok(())
    }

    fn ensure_owned(&self, item: &Item) -> AccessPointResult<()> {
        if item.access_point() != self.name {
            return Err(ItemError::WrongAccessPoint {
                expected: self.name.clone(),
                found: item.access_point().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn corrupt(&self, key: &RecordKey, message: String) -> AccessPointError {
        AccessPointError::CorruptContent {
            access_point: self.name.clone(),
            key: key.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessPoint, AccessPointError};
    use crate::codec::HeaderCodec;
    use crate::model::item::Item;
    use crate::model::schema::PropertySchema;
    use crate::store::{MemoryStore, RawRecord, RecordKey, StorageBackend};
    use std::sync::Arc;

    fn access_point(store: Arc<MemoryStore>) -> AccessPoint {
        let schema =
            PropertySchema::from_specs(["genre", "titre", "piste:integer", "_content:content"])
                .unwrap();
        AccessPoint::new("music", schema, Box::new(store)).with_codec(Box::new(HeaderCodec))
    }

    fn track(ap: &AccessPoint, titre: &str) -> Item {
        Item::create_from_text(
            ap,
            [
                ("genre", "rock"),
                ("titre", titre),
                ("piste", "4"),
                ("_content", "riff"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn record_key_is_escaped_sugar_query() {
        let ap = access_point(Arc::new(MemoryStore::new()));
        let key = ap.record_key(&track(&ap, "either/or")).unwrap();
        assert_eq!(key, RecordKey::new(r"rock/either\/or/4"));
    }

    #[test]
    fn persist_then_materialize_round_trips() {
        let store = Arc::new(MemoryStore::new());
        let ap = access_point(Arc::clone(&store));
        let item = track(&ap, "amen");

        let key = ap.persist(&item).unwrap();
        let raw = store.read(&key).unwrap().unwrap();
        assert_eq!(raw.metadata["piste"], "4");

        let loaded = ap.materialize(raw).unwrap();
        assert_eq!(loaded, item);
        assert_eq!(loaded.origin(), Some(&key));
        assert_eq!(loaded.content(), Some(&b"riff"[..]));
    }

    #[test]
    fn incomplete_item_never_reaches_storage() {
        let store = Arc::new(MemoryStore::new());
        let ap = access_point(Arc::clone(&store));
        let item = track(&ap, "amen").without_property("titre");

        let err = ap.persist(&item).unwrap_err();
        match err {
            AccessPointError::IncompleteItem { missing, .. } => {
                assert_eq!(missing, vec!["titre".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn undecodable_payload_is_corrupt_content() {
        let store = Arc::new(MemoryStore::new());
        let ap = access_point(Arc::clone(&store));
        let raw = RawRecord {
            key: RecordKey::new("broken"),
            metadata: Default::default(),
            content: b"no header block".to_vec(),
        };

        let err = ap.materialize(raw).unwrap_err();
        assert!(matches!(err, AccessPointError::CorruptContent { .. }));
    }

    #[test]
    fn mistyped_metadata_is_corrupt_content() {
        let ap = access_point(Arc::new(MemoryStore::new()));
        let raw = RawRecord {
            key: RecordKey::new("rock/amen/four"),
            metadata: Default::default(),
            content: b"genre: rock\ntitre: amen\npiste: four\n\n".to_vec(),
        };

        let err = ap.materialize(raw).unwrap_err();
        assert!(matches!(err, AccessPointError::CorruptContent { .. }));
    }

    #[test]
    fn delete_of_absent_record_is_not_found() {
        let ap = access_point(Arc::new(MemoryStore::new()));
        let err = ap.delete(&track(&ap, "ghost")).unwrap_err();
        assert!(matches!(err, AccessPointError::NotFound { .. }));
    }
}
