//! Freshness-windowed cache of scrape results.
//!
//! Entries are never deleted on read: a stale entry reads as a miss and is
//! overwritten by the next successful scrape.

mod error;
mod sqlite;
mod store;

pub use error::CacheError;
pub use sqlite::SqliteStore;
pub use store::{CacheEntry, CacheKey, CacheStore, MemoryStore};

use crate::schedule::{ScrapeResult, Scope};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Freshness windows per scope.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub current_ttl: Duration,
    pub all_weeks_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            current_ttl: Duration::from_secs(60 * 60),
            all_weeks_ttl: Duration::from_secs(6 * 60 * 60),
        }
    }
}

impl CacheConfig {
    pub fn freshness(&self, scope: Scope) -> Duration {
        match scope {
            Scope::Current => self.current_ttl,
            Scope::AllWeeks => self.all_weeks_ttl,
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
}

pub struct ScheduleCache {
    store: Box<dyn CacheStore>,
    config: CacheConfig,
}

impl ScheduleCache {
    pub fn new(store: Box<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// In-process cache with default windows.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()), CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the cached result if it is still within its freshness window.
    pub fn get(&self, group_name: &str, scope: Scope) -> Result<Option<ScrapeResult>, CacheError> {
        self.get_at(group_name, scope, Utc::now())
    }

    pub fn get_at(
        &self,
        group_name: &str,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Option<ScrapeResult>, CacheError> {
        let key = CacheKey::new(group_name, scope);
        let Some(entry) = self.store.load(&key)? else {
            debug!(key = %key, "Cache miss");
            return Ok(None);
        };

        if !self.is_fresh(scope, entry.last_updated, now) {
            debug!(key = %key, last_updated = %entry.last_updated, "Cache entry stale");
            return Ok(None);
        }

        let result = serde_json::from_str(&entry.payload)?;
        debug!(key = %key, "Cache hit");
        Ok(Some(result))
    }

    /// Stores `result` under `(group_name, scope)`, replacing any previous entry.
    pub fn put(&self, group_name: &str, scope: Scope, result: &ScrapeResult) -> Result<(), CacheError> {
        self.put_at(group_name, scope, result, Utc::now())
    }

    pub fn put_at(
        &self,
        group_name: &str,
        scope: Scope,
        result: &ScrapeResult,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let key = CacheKey::new(group_name, scope);
        let entry = CacheEntry {
            payload: serde_json::to_string(result)?,
            last_updated: now,
        };
        self.store.upsert(&key, &entry)?;
        debug!(key = %key, weeks = result.total_weeks(), "Cached schedule");
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> Result<CacheStats, CacheError> {
        let entries = self.store.timestamps()?;
        let fresh_entries = entries
            .iter()
            .filter(|(key, last_updated)| self.is_fresh(key.scope, *last_updated, now))
            .count();

        Ok(CacheStats {
            total_entries: entries.len(),
            fresh_entries,
            stale_entries: entries.len() - fresh_entries,
        })
    }

    /// Deletes entries not updated within `max_age`.
    pub fn sweep(&self, max_age: Duration) -> Result<usize, CacheError> {
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        // A retention longer than the representable range keeps everything
        let Some(cutoff) = cutoff else {
            return Ok(0);
        };

        let removed = self.store.remove_older_than(cutoff)?;
        if removed > 0 {
            info!(removed, "Swept old cache entries");
        }
        Ok(removed)
    }

    fn is_fresh(&self, scope: Scope, last_updated: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - last_updated).to_std() {
            Ok(age) => age < self.config.freshness(scope),
            // Written "in the future" (clock skew): still fresh
            Err(_) => true,
        }
    }
}
