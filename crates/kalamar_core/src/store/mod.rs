//! Storage backend contract and reference backends.
//!
//! # Responsibility
//! - Define the narrow record-level interface every backend implements.
//! - Provide lazy, restartable record enumeration on top of it.
//!
//! # Invariants
//! - Records are addressed by an opaque `RecordKey` chosen by the caller.
//! - `write` is create-or-replace and appears atomic to readers.
//! - Each `RecordIter` owns its own key snapshot; iterators never share a cursor.

use crate::db::DbError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Backend-native textual metadata of one record.
pub type RecordMetadata = BTreeMap<String, String>;

/// Opaque, deterministic record address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored form of one item before content decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub key: RecordKey,
    pub metadata: RecordMetadata,
    pub content: Vec<u8>,
}

/// Storage-layer error.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// A lock guarding backend state was poisoned by a panicking writer.
    LockPoisoned(&'static str),
    InvalidData(String),
    /// One stored record cannot be decoded; other records stay readable.
    CorruptRecord { key: RecordKey, message: String },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::LockPoisoned(what) => write!(f, "{what} lock poisoned"),
            Self::InvalidData(message) => write!(f, "invalid stored record: {message}"),
            Self::CorruptRecord { key, message } => {
                write!(f, "record `{key}` cannot be decoded: {message}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::LockPoisoned(_) | Self::InvalidData(_) | Self::CorruptRecord { .. } => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record-level storage interface used by access points.
pub trait StorageBackend: Send + Sync {
    /// Short backend kind used in logs, e.g. `memory`.
    fn kind(&self) -> &'static str;

    /// Snapshot of every stored key, in a stable order.
    fn keys(&self) -> StoreResult<Vec<RecordKey>>;

    fn read(&self, key: &RecordKey) -> StoreResult<Option<RawRecord>>;

    /// Creates or replaces the record at `record.key`.
    fn write(&self, record: &RawRecord) -> StoreResult<()>;

    /// Returns `false` when nothing was stored under `key`.
    fn delete(&self, key: &RecordKey) -> StoreResult<bool>;

    /// Writes `record` and drops the record at `previous`.
    ///
    /// Backends that can do both in one atomic step should override this.
    fn replace(&self, previous: &RecordKey, record: &RawRecord) -> StoreResult<()> {
        self.write(record)?;
        if *previous != record.key {
            self.delete(previous)?;
        }
        Ok(())
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn keys(&self) -> StoreResult<Vec<RecordKey>> {
        (**self).keys()
    }

    fn read(&self, key: &RecordKey) -> StoreResult<Option<RawRecord>> {
        (**self).read(key)
    }

    fn write(&self, record: &RawRecord) -> StoreResult<()> {
        (**self).write(record)
    }

    fn delete(&self, key: &RecordKey) -> StoreResult<bool> {
        (**self).delete(key)
    }

    fn replace(&self, previous: &RecordKey, record: &RawRecord) -> StoreResult<()> {
        (**self).replace(previous, record)
    }
}

/// Lazy record enumeration: keys are snapshotted up front, records are read
/// one at a time. Records deleted after the snapshot are skipped; a record
/// that cannot be decoded comes out as `StoreError::CorruptRecord` and the
/// iterator keeps going.
pub struct RecordIter<'a> {
    backend: &'a dyn StorageBackend,
    keys: std::vec::IntoIter<RecordKey>,
}

impl<'a> RecordIter<'a> {
    pub fn new(backend: &'a dyn StorageBackend) -> StoreResult<Self> {
        Ok(Self {
            backend,
            keys: backend.keys()?.into_iter(),
        })
    }

    /// Keys not yet visited.
    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl Iterator for RecordIter<'_> {
    type Item = StoreResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.keys.next()?;
            match self.backend.read(&key) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
