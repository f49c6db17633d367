//! Multi-week schedule scraper.
//!
//! One scrape drives one fresh browser session through:
//! 1. open the timetable page
//! 2. type the group name and click its suggestion
//! 3. read the active week
//! 4. step forward and read again, up to `max_weeks`
//!
//! The session is closed on every exit path and every failure is folded into
//! a failed [`ScrapeResult`].

mod error;
mod extract;
mod navigate;
pub mod selectors;

pub use error::ScrapeError;
pub use extract::{extract_active_week, parse_week_table};
pub use navigate::{next_week, previous_week, step_week, Direction};

use crate::browser::{wait_for_element, BrowserError, BrowserLauncher, Element, PageDriver};
use crate::schedule::{ScrapeResult, WeekSchedule};
use rand::Rng;
use selectors::{GROUP_INPUT, SUGGESTION};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Default schedule page.
pub const TIMETABLE_URL: &str = "https://www.vvsu.ru/timetable/";

/// Timing and bounds of a scrape.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub timetable_url: String,
    /// Upper bound on weeks read per scrape, the active week included
    pub max_weeks: usize,
    /// Stop after this many consecutive empty weeks; `None` (or 0) reads up to `max_weeks`
    pub stop_after_empty_weeks: Option<usize>,
    pub page_load_timeout: Duration,
    /// Wait for the group input to appear
    pub element_wait: Duration,
    /// Wait for a matching suggestion to appear
    pub suggestion_wait: Duration,
    /// Wait for the active week table to render
    pub table_wait: Duration,
    /// Pause after typing, before suggestions are looked up
    pub input_pause: Duration,
    /// Pause after clicking a suggestion
    pub click_settle: Duration,
    /// Pause after moving to another week
    pub week_settle: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timetable_url: TIMETABLE_URL.to_string(),
            max_weeks: 3,
            stop_after_empty_weeks: None,
            page_load_timeout: Duration::from_secs(20),
            element_wait: Duration::from_secs(10),
            suggestion_wait: Duration::from_secs(10),
            table_wait: Duration::from_secs(5),
            input_pause: Duration::from_secs(1),
            click_settle: Duration::from_secs(2),
            week_settle: Duration::from_secs(1),
        }
    }
}

/// Scrapes a group's schedule through a fresh browser session per call.
pub struct ScheduleScraper {
    launcher: Arc<dyn BrowserLauncher>,
    config: ScrapeConfig,
}

impl ScheduleScraper {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: ScrapeConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Scrapes up to the configured number of weeks.
    pub async fn scrape(&self, group_name: &str) -> ScrapeResult {
        self.scrape_weeks(group_name, self.config.max_weeks).await
    }

    /// Scrapes up to `max_weeks` weeks (at least one).
    ///
    /// Never fails: errors come back as `success: false` with the session
    /// already released.
    pub async fn scrape_weeks(&self, group_name: &str, max_weeks: usize) -> ScrapeResult {
        let scrape_id = generate_scrape_id();
        let start = Instant::now();

        info!(
            scrape_id = %scrape_id,
            group = %group_name,
            max_weeks,
            "Starting schedule scrape"
        );

        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(source) => {
                let err = ScrapeError::DriverInit { source };
                error!(scrape_id = %scrape_id, error = ?err, "Could not start browser");
                return ScrapeResult::failed(group_name, err.kind(), err.to_string());
            }
        };

        let outcome = self
            .run(session.as_mut(), group_name, max_weeks.max(1), &scrape_id)
            .await;

        if let Err(e) = session.close().await {
            warn!(scrape_id = %scrape_id, error = %e, "Failed to release browser session");
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(weeks) => {
                info!(
                    scrape_id = %scrape_id,
                    group = %group_name,
                    weeks = weeks.len(),
                    duration_ms,
                    "Schedule scrape completed"
                );
                ScrapeResult::succeeded(group_name, weeks)
            }
            Err(err) => {
                error!(
                    scrape_id = %scrape_id,
                    group = %group_name,
                    error = %err,
                    duration_ms,
                    "Schedule scrape failed"
                );
                ScrapeResult::failed(group_name, err.kind(), err.to_string())
            }
        }
    }

    async fn run(
        &self,
        driver: &mut dyn PageDriver,
        group_name: &str,
        max_weeks: usize,
        scrape_id: &str,
    ) -> Result<Vec<WeekSchedule>, ScrapeError> {
        let page_url = Url::parse(&self.config.timetable_url).map_err(|e| ScrapeError::Navigation {
            url: self.config.timetable_url.clone(),
            source: e.into(),
        })?;
        self.open_page(driver).await?;
        self.select_group(driver, group_name, scrape_id).await?;

        let mut weeks = Vec::with_capacity(max_weeks);
        let first = extract_active_week(driver, self.config.table_wait, &page_url).await?;
        info!(scrape_id = %scrape_id, week = 0, lessons = first.len(), "Read active week");
        let mut empty_streak = usize::from(first.is_empty());
        weeks.push(first);

        while weeks.len() < max_weeks {
            // A limit of 0 would stop before any non-empty week, so it means "off"
            if let Some(limit) = self.config.stop_after_empty_weeks.filter(|&limit| limit > 0) {
                if empty_streak >= limit {
                    info!(
                        scrape_id = %scrape_id,
                        empty_streak,
                        "Consecutive empty weeks, stopping early"
                    );
                    break;
                }
            }

            if !next_week(driver).await? {
                info!(scrape_id = %scrape_id, weeks = weeks.len(), "No further weeks available");
                break;
            }
            tokio::time::sleep(self.config.week_settle).await;

            let week = extract_active_week(driver, self.config.table_wait, &page_url).await?;
            info!(
                scrape_id = %scrape_id,
                week = weeks.len(),
                lessons = week.len(),
                "Read week"
            );
            empty_streak = if week.is_empty() { empty_streak + 1 } else { 0 };
            weeks.push(week);
        }

        Ok(weeks)
    }

    async fn open_page(&self, driver: &mut dyn PageDriver) -> Result<(), ScrapeError> {
        let url = &self.config.timetable_url;
        debug!(url = %url, "Opening timetable page");

        match tokio::time::timeout(self.config.page_load_timeout, driver.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(BrowserError::Timeout { waited_ms, .. })) => Err(ScrapeError::Timeout {
                what: format!("page load of {url}"),
                waited_ms,
            }),
            Ok(Err(source)) => Err(ScrapeError::Navigation {
                url: url.clone(),
                source,
            }),
            Err(_) => Err(ScrapeError::Timeout {
                what: format!("page load of {url}"),
                waited_ms: self.config.page_load_timeout.as_millis() as u64,
            }),
        }
    }

    async fn select_group(
        &self,
        driver: &mut dyn PageDriver,
        group_name: &str,
        scrape_id: &str,
    ) -> Result<(), ScrapeError> {
        let input = wait_for_element(driver, GROUP_INPUT, self.config.element_wait).await?;
        driver.type_text(&input, group_name).await?;
        tokio::time::sleep(self.config.input_pause).await;

        let Some(suggestion) = self.find_suggestion(driver, group_name).await? else {
            warn!(scrape_id = %scrape_id, group = %group_name, "No suggestion matches group");
            return Err(ScrapeError::GroupNotFound {
                group: group_name.to_string(),
            });
        };

        driver.click(&suggestion).await?;
        debug!(scrape_id = %scrape_id, group = %group_name, "Selected group");
        tokio::time::sleep(self.config.click_settle).await;
        Ok(())
    }

    /// Polls the suggestion controls until one's label contains the group name.
    async fn find_suggestion(
        &self,
        driver: &mut dyn PageDriver,
        group_name: &str,
    ) -> Result<Option<Element>, BrowserError> {
        let start = Instant::now();

        loop {
            for candidate in driver.find_all(SUGGESTION).await? {
                match driver.text(&candidate).await {
                    Ok(label) if label.contains(group_name) => return Ok(Some(candidate)),
                    Ok(_) => {}
                    // Suggestions re-render while typing
                    Err(BrowserError::NoSuchElement(_)) => continue,
                    Err(e) => return Err(e),
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= self.config.suggestion_wait {
                return Ok(None);
            }
            tokio::time::sleep(crate::browser::POLL_INTERVAL.min(self.config.suggestion_wait - elapsed))
                .await;
        }
    }
}

/// Generates a short id tying together the log lines of one scrape.
fn generate_scrape_id() -> String {
    let random: u32 = rand::thread_rng().gen();
    format!("{:08x}", random)
}
