//! SQLite-backed record store.
//!
//! # Responsibility
//! - Persist raw records of one access point in the shared `records` table.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - Rows are scoped by `access_point`; several access points may share one
//!   database file without seeing each other's records.
//! - Every mutation is a single statement or a single transaction.
//! - Connections are only handed in after migrations ran (`db::open_db*`).

use super::{RawRecord, RecordKey, RecordMetadata, StorageBackend, StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const UPSERT_SQL: &str = "INSERT INTO records (access_point, record_key, metadata, content)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (access_point, record_key) DO UPDATE SET
        metadata = excluded.metadata,
        content = excluded.content,
        updated_at = (strftime('%s', 'now') * 1000);";

const DELETE_SQL: &str = "DELETE FROM records WHERE access_point = ?1 AND record_key = ?2;";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    access_point: String,
}

impl SqliteStore {
    /// Opens (or creates) a database file for `access_point`.
    pub fn open(path: impl AsRef<Path>, access_point: impl Into<String>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?, access_point))
    }

    /// Opens a private in-memory database for `access_point`.
    pub fn in_memory(access_point: impl Into<String>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?, access_point))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, access_point: impl Into<String>) -> Self {
        Self {
            conn: Mutex::new(conn),
            access_point: access_point.into(),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::LockPoisoned("sqlite connection"))
    }
}

impl StorageBackend for SqliteStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn keys(&self) -> StoreResult<Vec<RecordKey>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT record_key
             FROM records
             WHERE access_point = ?1
             ORDER BY record_key ASC;",
        )?;
        let keys = stmt
            .query_map([self.access_point.as_str()], |row| {
                row.get::<_, String>(0).map(RecordKey::new)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn read(&self, key: &RecordKey) -> StoreResult<Option<RawRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT metadata, content
                 FROM records
                 WHERE access_point = ?1 AND record_key = ?2;",
                params![self.access_point.as_str(), key.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )
            .optional()?;

        let Some((metadata_json, content)) = row else {
            return Ok(None);
        };
        let metadata: RecordMetadata =
            serde_json::from_str(&metadata_json).map_err(|err| StoreError::CorruptRecord {
                key: key.clone(),
                message: format!("metadata is not valid JSON: {err}"),
            })?;

        Ok(Some(RawRecord {
            key: key.clone(),
            metadata,
            content,
        }))
    }

    fn write(&self, record: &RawRecord) -> StoreResult<()> {
        let metadata = encode_metadata(record)?;
        let conn = self.lock()?;
        conn.execute(
            UPSERT_SQL,
            params![
                self.access_point.as_str(),
                record.key.as_str(),
                metadata,
                record.content.as_slice(),
            ],
        )?;
        Ok(())
    }

    fn delete(&self, key: &RecordKey) -> StoreResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(DELETE_SQL, params![self.access_point.as_str(), key.as_str()])?;
        Ok(changed > 0)
    }

    fn replace(&self, previous: &RecordKey, record: &RawRecord) -> StoreResult<()> {
        let metadata = encode_metadata(record)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if *previous != record.key {
            tx.execute(
                DELETE_SQL,
                params![self.access_point.as_str(), previous.as_str()],
            )?;
        }
        tx.execute(
            UPSERT_SQL,
            params![
                self.access_point.as_str(),
                record.key.as_str(),
                metadata,
                record.content.as_slice(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn encode_metadata(record: &RawRecord) -> StoreResult<String> {
    serde_json::to_string(&record.metadata).map_err(|err| {
        StoreError::InvalidData(format!(
            "metadata of record `{}` cannot be encoded: {err}",
            record.key
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::store::{RawRecord, RecordKey, StorageBackend, StoreError};

    fn record(key: &str, genre: &str) -> RawRecord {
        RawRecord {
            key: RecordKey::new(key),
            metadata: [("genre".to_string(), genre.to_string())].into(),
            content: vec![0, 159, 146, 150],
        }
    }

    #[test]
    fn write_read_and_upsert() {
        let store = SqliteStore::in_memory("music").unwrap();
        store.write(&record("rock/amen", "rock")).unwrap();
        store.write(&record("rock/amen", "punk")).unwrap();

        assert_eq!(store.keys().unwrap(), vec![RecordKey::new("rock/amen")]);
        let loaded = store.read(&RecordKey::new("rock/amen")).unwrap().unwrap();
        assert_eq!(loaded.metadata["genre"], "punk");
        assert_eq!(loaded.content, vec![0, 159, 146, 150]);
    }

    #[test]
    fn records_are_scoped_by_access_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.sqlite3");
        let music = SqliteStore::open(&path, "music").unwrap();
        let books = SqliteStore::open(&path, "books").unwrap();

        music.write(&record("rock/amen", "rock")).unwrap();
        assert!(books.keys().unwrap().is_empty());
        assert!(!books.delete(&RecordKey::new("rock/amen")).unwrap());
        assert_eq!(music.keys().unwrap().len(), 1);
    }

    #[test]
    fn replace_is_transactional_move() {
        let store = SqliteStore::in_memory("music").unwrap();
        store.write(&record("old", "rock")).unwrap();

        store
            .replace(&RecordKey::new("old"), &record("new", "rock"))
            .unwrap();
        assert_eq!(store.keys().unwrap(), vec![RecordKey::new("new")]);
    }

    #[test]
    fn corrupted_metadata_is_reported() {
        let store = SqliteStore::in_memory("music").unwrap();
        store
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO records (access_point, record_key, metadata, content)
                 VALUES ('music', 'broken', 'not json', x'');",
                [],
            )
            .unwrap();

        let err = store.read(&RecordKey::new("broken")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::CorruptRecord { ref key, .. } if key.as_str() == "broken"
        ));
    }
}
