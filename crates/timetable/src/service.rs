//! Request coordination: cache first, scrape on miss, cache successes.

use crate::cache::{CacheError, ScheduleCache};
use crate::schedule::{ScrapeResult, Scope};
use crate::scrape::{ScheduleScraper, ScrapeError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a returned result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
    Scraped,
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub result: ScrapeResult,
    pub source: Source,
}

pub struct ScheduleService {
    cache: Arc<ScheduleCache>,
    scraper: Arc<ScheduleScraper>,
}

impl ScheduleService {
    pub fn new(cache: Arc<ScheduleCache>, scraper: Arc<ScheduleScraper>) -> Self {
        Self { cache, scraper }
    }

    pub fn cache(&self) -> &ScheduleCache {
        &self.cache
    }

    /// Full multi-week schedule for `group_name`.
    pub async fn get_or_scrape(&self, group_name: &str) -> Result<Fetched, CacheError> {
        self.get_or_scrape_scoped(group_name, Scope::AllWeeks).await
    }

    /// Returns the fresh cached result for `(group_name, scope)`, or scrapes.
    ///
    /// Concurrent misses for the same group each scrape on their own; the last
    /// write wins.
    pub async fn get_or_scrape_scoped(
        &self,
        group_name: &str,
        scope: Scope,
    ) -> Result<Fetched, CacheError> {
        if let Some(result) = self.cache.get(group_name, scope)? {
            info!(group = %group_name, scope = %scope, "Serving schedule from cache");
            return Ok(Fetched {
                result,
                source: Source::Cache,
            });
        }

        Ok(self.scrape_and_store(group_name, scope).await)
    }

    /// Scrapes regardless of the cache and stores a successful result.
    pub async fn refresh(&self, group_name: &str, scope: Scope) -> Fetched {
        self.scrape_and_store(group_name, scope).await
    }

    async fn scrape_and_store(&self, group_name: &str, scope: Scope) -> Fetched {
        let result = self.run_scrape(group_name, scope).await;

        if result.success {
            // The caller still gets the fresh result when the write fails
            if let Err(e) = self.cache.put(group_name, scope, &result) {
                warn!(group = %group_name, scope = %scope, error = %e, "Failed to cache schedule");
            }
        }

        Fetched {
            result,
            source: Source::Scraped,
        }
    }

    /// Runs the scrape on its own task so a dropped request does not cut the
    /// browser session short.
    async fn run_scrape(&self, group_name: &str, scope: Scope) -> ScrapeResult {
        let max_weeks = match scope {
            Scope::Current => 1,
            Scope::AllWeeks => self.scraper.config().max_weeks,
        };

        let scraper = self.scraper.clone();
        let group = group_name.to_string();
        let handle =
            tokio::spawn(async move { scraper.scrape_weeks(&group, max_weeks).await });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                let err = ScrapeError::Aborted {
                    message: e.to_string(),
                };
                warn!(group = %group_name, error = %err, "Scrape task did not complete");
                ScrapeResult::failed(group_name, err.kind(), err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{week_table, FakeLauncher, FakeSite};
    use crate::cache::{CacheConfig, SqliteStore};
    use crate::schedule::ScrapeErrorKind;
    use crate::scrape::ScrapeConfig;
    use std::time::Duration;

    fn site() -> FakeSite {
        FakeSite {
            weeks: vec![
                Some(week_table(&[("Пн", &[("09:00", "Math")])])),
                Some(week_table(&[("Вт", &[("11:00", "CS")])])),
            ],
            ..Default::default()
        }
    }

    fn service(launcher: Arc<FakeLauncher>) -> ScheduleService {
        let config = ScrapeConfig {
            max_weeks: 3,
            element_wait: Duration::from_millis(50),
            suggestion_wait: Duration::from_millis(50),
            table_wait: Duration::from_millis(30),
            input_pause: Duration::ZERO,
            click_settle: Duration::ZERO,
            week_settle: Duration::ZERO,
            ..Default::default()
        };
        let cache = ScheduleCache::new(
            Box::new(SqliteStore::in_memory().unwrap()),
            CacheConfig::default(),
        );
        ScheduleService::new(
            Arc::new(cache),
            Arc::new(ScheduleScraper::new(launcher, config)),
        )
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let launcher = Arc::new(FakeLauncher::new(site()));
        let service = service(launcher.clone());

        let first = service.get_or_scrape("БПИ-24-2").await.unwrap();
        assert_eq!(first.source, Source::Scraped);
        assert!(first.result.success);
        assert_eq!(first.result.total_weeks(), 2);

        let second = service.get_or_scrape("БПИ-24-2").await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert!(second.result.same_content(&first.result));
        assert_eq!(launcher.launches(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let launcher = Arc::new(FakeLauncher::new(site()));
        let service = service(launcher.clone());

        let first = service.get_or_scrape("НЕТ-00-0").await.unwrap();
        assert!(!first.result.success);
        assert_eq!(first.result.error_kind, Some(ScrapeErrorKind::NotFound));

        let second = service.get_or_scrape("НЕТ-00-0").await.unwrap();
        assert_eq!(second.source, Source::Scraped);
        assert_eq!(launcher.launches(), 2);
        assert_eq!(service.cache().stats().unwrap().total_entries, 0);
    }

    #[tokio::test]
    async fn test_current_scope_reads_one_week() {
        let launcher = Arc::new(FakeLauncher::new(site()));
        let service = service(launcher.clone());

        let fetched = service
            .get_or_scrape_scoped("БПИ-24-2", Scope::Current)
            .await
            .unwrap();
        assert_eq!(fetched.result.total_weeks(), 1);
        assert_eq!(launcher.next_clicks(), 0);

        // Separate key: the all-weeks scope still misses
        let all = service.get_or_scrape("БПИ-24-2").await.unwrap();
        assert_eq!(all.source, Source::Scraped);
        assert_eq!(service.cache().stats().unwrap().total_entries, 2);
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let launcher = Arc::new(FakeLauncher::new(site()));
        let service = service(launcher.clone());

        service.get_or_scrape("БПИ-24-2").await.unwrap();
        let refreshed = service.refresh("БПИ-24-2", Scope::AllWeeks).await;

        assert_eq!(refreshed.source, Source::Scraped);
        assert_eq!(launcher.launches(), 2);
        assert_eq!(service.cache().stats().unwrap().total_entries, 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_succeed() {
        let launcher = Arc::new(FakeLauncher::new(site()));
        let service = service(launcher.clone());

        let (a, b) = tokio::join!(
            service.get_or_scrape("БПИ-24-2"),
            service.get_or_scrape("БПИ-24-2")
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.result.success && b.result.success);
        assert_eq!(a.source, Source::Scraped);
        assert_eq!(b.source, Source::Scraped);
        assert_eq!(launcher.launches(), 2);

        let stats = service.cache().stats().unwrap();
        assert_eq!(stats.total_entries, 1);
        let cached = service.get_or_scrape("БПИ-24-2").await.unwrap();
        assert_eq!(cached.source, Source::Cache);
        assert!(cached.result.same_content(&a.result));
    }
}
