//! In-process record store.
//!
//! Keeps records in a `BTreeMap` behind an `RwLock`; every mutation runs
//! under one write guard, so readers never observe a half-applied change.

use super::{RawRecord, RecordKey, StorageBackend, StoreError, StoreResult};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordKey, RawRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_guard()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_guard()?.is_empty())
    }

    fn read_guard(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<RecordKey, RawRecord>>> {
        self.records
            .read()
            .map_err(|_| StoreError::LockPoisoned("memory store"))
    }

    fn write_guard(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<RecordKey, RawRecord>>> {
        self.records
            .write()
            .map_err(|_| StoreError::LockPoisoned("memory store"))
    }
}

impl StorageBackend for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn keys(&self) -> StoreResult<Vec<RecordKey>> {
        Ok(self.read_guard()?.keys().cloned().collect())
    }

    fn read(&self, key: &RecordKey) -> StoreResult<Option<RawRecord>> {
        Ok(self.read_guard()?.get(key).cloned())
    }

    fn write(&self, record: &RawRecord) -> StoreResult<()> {
        self.write_guard()?
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, key: &RecordKey) -> StoreResult<bool> {
        Ok(self.write_guard()?.remove(key).is_some())
    }

    fn replace(&self, previous: &RecordKey, record: &RawRecord) -> StoreResult<()> {
        let mut records = self.write_guard()?;
        records.remove(previous);
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }
}
