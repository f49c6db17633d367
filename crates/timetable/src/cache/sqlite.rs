/// SQLite-backed cache store
use super::error::CacheError;
use super::store::{CacheEntry, CacheKey, CacheStore};
use crate::schedule::Scope;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_cache.sql");

pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the cache database and initializes its schema
    pub fn open(db_path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(db_path)?;
        info!(path = db_path, "Opened schedule cache database");
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.db.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl CacheStore for SqliteStore {
    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let db = self.conn()?;
        let mut stmt = db.prepare_cached(
            "SELECT payload, last_updated FROM schedule_cache
             WHERE group_name = ?1 AND scope = ?2",
        )?;

        let entry = stmt
            .query_row((key.group_name.as_str(), key.scope.as_str()), |row| {
                Ok(CacheEntry {
                    payload: row.get(0)?,
                    last_updated: row.get(1)?,
                })
            })
            .optional()?;

        Ok(entry)
    }

    fn upsert(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO schedule_cache (group_name, scope, payload, last_updated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (group_name, scope) DO UPDATE SET
                payload = excluded.payload,
                last_updated = excluded.last_updated",
            (
                key.group_name.as_str(),
                key.scope.as_str(),
                entry.payload.as_str(),
                entry.last_updated,
            ),
        )?;
        Ok(())
    }

    fn timestamps(&self) -> Result<Vec<(CacheKey, DateTime<Utc>)>, CacheError> {
        let db = self.conn()?;
        let mut stmt =
            db.prepare_cached("SELECT group_name, scope, last_updated FROM schedule_cache")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, DateTime<Utc>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(group_name, scope, last_updated)| {
                let scope = scope.parse::<Scope>().map_err(CacheError::Corrupt)?;
                Ok((CacheKey::new(group_name, scope), last_updated))
            })
            .collect()
    }

    fn remove_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let db = self.conn()?;
        let removed = db.execute(
            "DELETE FROM schedule_cache WHERE last_updated < ?1",
            [cutoff],
        )?;
        Ok(removed)
    }
}
