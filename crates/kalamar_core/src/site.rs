//! Site: federation of named access points.
//!
//! # Responsibility
//! - Route `search`/`open`/`save`/`remove` to the right access point.
//! - Enforce the cardinality contract of `open`.
//! - Apply the corrupt-record policy while searching.
//!
//! # Invariants
//! - The access point table is fixed after construction.
//! - Every `search` call owns a fresh enumeration; results are never cached.
//! - Query errors surface from `search`/`open` before any record is read.

use crate::access_point::{AccessPoint, AccessPointError};
use crate::codec::CodecError;
use crate::model::item::{Item, ItemError, PropertyMap};
use crate::query::{parse_query, Predicate, QueryError};
use crate::store::{RecordIter, RecordKey, StoreError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SiteResult<T> = Result<T, SiteError>;

/// What a search does with a record whose content cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptContentPolicy {
    /// Log a warning and continue with the next record.
    #[default]
    Skip,
    /// Yield the error to the caller.
    Fail,
}

/// Error surface of every site operation.
#[derive(Debug)]
pub enum SiteError {
    UnknownAccessPoint(String),
    DuplicateAccessPoint(String),
    Query(QueryError),
    Item(ItemError),
    ObjectDoesNotExist {
        access_point: String,
        query: String,
    },
    MultipleObjectsReturned {
        access_point: String,
        query: String,
    },
    IncompleteItem {
        access_point: String,
        missing: Vec<String>,
    },
    CorruptContent {
        access_point: String,
        key: RecordKey,
        message: String,
    },
    NotFound {
        access_point: String,
        key: RecordKey,
    },
    Codec(CodecError),
    Store(StoreError),
}

impl SiteError {
    /// Stable snake_case identifier of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownAccessPoint(_) => "unknown_access_point",
            Self::DuplicateAccessPoint(_) => "duplicate_access_point",
            Self::Query(QueryError::MalformedQuery { .. }) => "malformed_query",
            Self::Query(QueryError::UnknownProperty { .. }) => "unknown_property",
            Self::Query(QueryError::TooManySugarSegments { .. }) => "too_many_sugar_segments",
            Self::Item(ItemError::UnknownProperty { .. }) => "unknown_property",
            Self::Item(ItemError::WrongAccessPoint { .. }) => "wrong_access_point",
            Self::Item(ItemError::EmptyValue { .. }) => "empty_value",
            Self::Item(_) => "type_mismatch",
            Self::ObjectDoesNotExist { .. } => "object_does_not_exist",
            Self::MultipleObjectsReturned { .. } => "multiple_objects_returned",
            Self::IncompleteItem { .. } => "incomplete_item",
            Self::CorruptContent { .. } => "corrupt_content",
            Self::NotFound { .. } => "not_found",
            Self::Codec(_) => "encoding",
            Self::Store(_) => "storage",
        }
    }
}

impl Display for SiteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAccessPoint(name) => write!(f, "unknown access point `{name}`"),
            Self::DuplicateAccessPoint(name) => {
                write!(f, "access point `{name}` is already registered")
            }
            Self::Query(err) => write!(f, "{err}"),
            Self::Item(err) => write!(f, "{err}"),
            Self::ObjectDoesNotExist {
                access_point,
                query,
            } => write!(f, "no item of `{access_point}` matches `{query}`"),
            Self::MultipleObjectsReturned {
                access_point,
                query,
            } => write!(f, "several items of `{access_point}` match `{query}`"),
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

impl Error for SiteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Query(err) => Some(err),
            Self::Item(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QueryError> for SiteError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<ItemError> for SiteError {
    fn from(value: ItemError) -> Self {
        Self::Item(value)
    }
}

impl From<StoreError> for SiteError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<AccessPointError> for SiteError {
    fn from(value: AccessPointError) -> Self {
        match value {
            AccessPointError::Item(err) => Self::Item(err),
            AccessPointError::IncompleteItem {
                access_point,
                missing,
            } => Self::IncompleteItem {
                access_point,
                missing,
            },
            AccessPointError::CorruptContent {
                access_point,
                key,
                message,
            } => Self::CorruptContent {
                access_point,
                key,
                message,
            },
            AccessPointError::NotFound { access_point, key } => {
                Self::NotFound { access_point, key }
            }
            AccessPointError::Codec(err) => Self::Codec(err),
            AccessPointError::Store(err) => Self::Store(err),
        }
    }
}

/// Federation of access points keyed by name.
#[derive(Default)]
pub struct Site {
    access_points: BTreeMap<String, AccessPoint>,
    corrupt_content: CorruptContentPolicy,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_corrupt_content_policy(mut self, policy: CorruptContentPolicy) -> Self {
        self.corrupt_content = policy;
        self
    }

    pub fn corrupt_content_policy(&self) -> CorruptContentPolicy {
        self.corrupt_content
    }

    /// Adds one access point; names are unique.
    pub fn register(&mut self, access_point: AccessPoint) -> SiteResult<()> {
        let name = access_point.name().to_string();
        if self.access_points.contains_key(&name) {
            return Err(SiteError::DuplicateAccessPoint(name));
        }

        info!(
            "event=site_register module=site status=ok access_point={} store={} codec={}",
            name,
            access_point.store_kind(),
            access_point.codec_name().unwrap_or("none")
        );
        self.access_points.insert(name, access_point);
        Ok(())
    }

    pub fn access_point(&self, name: &str) -> SiteResult<&AccessPoint> {
        self.access_points
            .get(name)
            .ok_or_else(|| SiteError::UnknownAccessPoint(name.to_string()))
    }

    /// Sorted access point names.
    pub fn access_point_names(&self) -> Vec<&str> {
        self.access_points.keys().map(String::as_str).collect()
    }

    /// Builds a transient item for `access_point`; nothing is stored.
    pub fn create_item(&self, access_point: &str, properties: PropertyMap) -> SiteResult<Item> {
        Ok(Item::create(self.access_point(access_point)?, properties)?)
    }

    /// Lazily yields every item of `access_point` matching `query`.
    ///
    /// Syntax errors are returned here; storage errors and, under
    /// [`CorruptContentPolicy::Fail`], corrupt records come out of the iterator.
    pub fn search(&self, access_point: &str, query: &str) -> SiteResult<SearchResults<'_>> {
        let ap = self.access_point(access_point)?;
        let predicate = Predicate::new(parse_query(ap.schema(), query)?);
        let records = ap.records()?;

        debug!(
            "event=search module=site status=start access_point={} constraints={} records={}",
            ap.name(),
            predicate.constraints().len(),
            records.remaining()
        );
        Ok(SearchResults {
            access_point: ap,
            records,
            predicate,
            policy: self.corrupt_content,
            skipped: 0,
        })
    }

    /// Returns the single item matching `query`.
    ///
    /// # Errors
    /// - `ObjectDoesNotExist` when nothing matches.
    /// - `MultipleObjectsReturned` as soon as a second match is seen.
    pub fn open(&self, access_point: &str, query: &str) -> SiteResult<Item> {
        let mut results = self.search(access_point, query)?;
        let Some(first) = results.next().transpose()? else {
            debug!("event=open module=site status=miss access_point={access_point}");
            return Err(SiteError::ObjectDoesNotExist {
                access_point: access_point.to_string(),
                query: query.to_string(),
            });
        };
        if results.next().transpose()?.is_some() {
            debug!("event=open module=site status=ambiguous access_point={access_point}");
            return Err(SiteError::MultipleObjectsReturned {
                access_point: access_point.to_string(),
                query: query.to_string(),
            });
        }

        Ok(first)
    }

    /// Number of items matching `query`.
    pub fn count(&self, access_point: &str, query: &str) -> SiteResult<usize> {
        let mut count = 0;
        for item in self.search(access_point, query)? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Persists `item` and records where it now lives.
    ///
    /// Saving an unchanged persisted item rewrites the same record; saving
    /// an edited one moves it to its new key.
    pub fn save(&self, item: &mut Item) -> SiteResult<RecordKey> {
        let ap = self.access_point(item.access_point())?;
        let moved = item.origin().cloned();

        match ap.persist(item) {
            Ok(key) => {
                info!(
                    "event=save module=site status=ok access_point={} store={} moved={}",
                    ap.name(),
                    ap.store_kind(),
                    moved.is_some_and(|origin| origin != key)
                );
                item.set_origin(key.clone());
                Ok(key)
            }
            Err(err) => {
                let err = SiteError::from(err);
                warn!(
                    "event=save module=site status=error access_point={} error_code={}",
                    ap.name(),
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Deletes the stored record of `item`.
    pub fn remove(&self, item: &Item) -> SiteResult<()> {
        let ap = self.access_point(item.access_point())?;
        match ap.delete(item) {
            Ok(()) => {
                info!(
                    "event=remove module=site status=ok access_point={} store={}",
                    ap.name(),
                    ap.store_kind()
                );
                Ok(())
            }
            Err(err) => {
                let err = SiteError::from(err);
                warn!(
                    "event=remove module=site status=error access_point={} error_code={}",
                    ap.name(),
                    err.code()
                );
                Err(err)
            }
        }
    }
}

/// Lazy result sequence of one `Site::search` call.
pub struct SearchResults<'a> {
    access_point: &'a AccessPoint,
    records: RecordIter<'a>,
    predicate: Predicate,
    policy: CorruptContentPolicy,
    skipped: usize,
}

impl SearchResults<'_> {
    /// Corrupt records skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for SearchResults<'_> {
    type Item = SiteResult<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let outcome = match self.records.next()? {
                Ok(raw) => self.access_point.materialize(raw),
                Err(StoreError::CorruptRecord { key, message }) => {
                    Err(AccessPointError::CorruptContent {
                        access_point: self.access_point.name().to_string(),
                        key,
                        message,
                    })
                }
                Err(err) => return Some(Err(err.into())),
            };

            match outcome {
                Ok(item) if self.predicate.matches(&item) => return Some(Ok(item)),
                Ok(_) => continue,
                Err(AccessPointError::CorruptContent { key, .. })
                    if self.policy == CorruptContentPolicy::Skip =>
                {
                    self.skipped += 1;
                    warn!(
                        "event=corrupt_record module=site status=skip access_point={} key={key}",
                        self.access_point.name()
                    );
                }
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}
