//! Storage backends for cached schedules.

use super::error::CacheError;
use crate::schedule::Scope;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fmt;

/// Cache key: one entry per group and scope.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub group_name: String,
    pub scope: Scope,
}

impl CacheKey {
    pub fn new(group_name: impl Into<String>, scope: Scope) -> Self {
        Self {
            group_name: group_name.into(),
            scope,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_name, self.scope)
    }
}

/// Persisted form of a scrape result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Serialized `ScrapeResult`
    pub payload: String,
    pub last_updated: DateTime<Utc>,
}

/// Key/value storage under the schedule cache.
///
/// Each call must be atomic on its own; callers never need a transaction
/// spanning several calls.
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Inserts the entry, or overwrites the existing entry for `key`.
    fn upsert(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Every key with its last update time.
    fn timestamps(&self) -> Result<Vec<(CacheKey, DateTime<Utc>)>, CacheError>;

    /// Deletes entries last updated before `cutoff`, returning how many went.
    fn remove_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError>;
}

/// In-process store. Uses DashMap for concurrent access without external locking.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.clone()))
    }

    fn upsert(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        self.entries.insert(key.clone(), entry.clone());
        Ok(())
    }

    fn timestamps(&self) -> Result<Vec<(CacheKey, DateTime<Utc>)>, CacheError> {
        Ok(self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.last_updated))
            .collect())
    }

    fn remove_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_updated >= cutoff);
        Ok(before - self.entries.len())
    }
}
