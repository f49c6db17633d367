/// Schedule data model shared by the scraper, the cache and the HTTP layer.
mod normalize;

pub use normalize::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One scheduled class occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRecord {
    /// Display date, shared by consecutive lessons of the same day
    pub date: Option<String>,
    pub time_range: String,
    pub discipline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webinar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classroom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    /// Lecture, practice, lab...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_kind: Option<String>,
}

/// Lessons of one displayed week, in table row order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekSchedule {
    pub lessons: Vec<LessonRecord>,
}

impl WeekSchedule {
    pub fn new(lessons: Vec<LessonRecord>) -> Self {
        Self { lessons }
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    /// An empty week is valid (holidays, end of term).
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LessonRecord> {
        self.lessons.iter()
    }
}

/// Category of a failed scrape, kept alongside the human readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeErrorKind {
    /// Browser could not be started or the session died
    Driver,
    /// Schedule page could not be opened
    Navigation,
    /// An element did not show up within its bounded wait
    Timeout,
    /// No suggestion matched the requested group
    NotFound,
}

impl ScrapeErrorKind {
    /// Returns true if retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ScrapeErrorKind::NotFound)
    }
}

/// Outcome of one full scrape for one group.
///
/// A failed result never carries weeks; `weeks[0]` is the week that was active
/// on the site when the scrape ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub success: bool,
    pub group_name: String,
    pub weeks: Vec<WeekSchedule>,
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ScrapeErrorKind>,
}

impl ScrapeResult {
    /// Builds a successful result.
    pub fn succeeded(group_name: impl Into<String>, weeks: Vec<WeekSchedule>) -> Self {
        Self {
            success: true,
            group_name: group_name.into(),
            weeks,
            scraped_at: Utc::now(),
            error: None,
            error_kind: None,
        }
    }

    /// Builds a failed result. Weeks are always empty.
    pub fn failed(
        group_name: impl Into<String>,
        kind: ScrapeErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            group_name: group_name.into(),
            weeks: Vec::new(),
            scraped_at: Utc::now(),
            error: Some(message.into()),
            error_kind: Some(kind),
        }
    }

    pub fn total_weeks(&self) -> usize {
        self.weeks.len()
    }

    pub fn week(&self, index: usize) -> Option<&WeekSchedule> {
        self.weeks.get(index)
    }

    /// Compares everything except `scraped_at`.
    pub fn same_content(&self, other: &ScrapeResult) -> bool {
        self.success == other.success
            && self.group_name == other.group_name
            && self.weeks == other.weeks
            && self.error == other.error
            && self.error_kind == other.error_kind
    }
}

/// Cache dimension: the single active week or the full multi-week scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Current,
    AllWeeks,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Current => "current",
            Scope::AllWeeks => "all_weeks",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current" => Ok(Scope::Current),
            "all_weeks" => Ok(Scope::AllWeeks),
            other => Err(format!("unknown cache scope '{other}'")),
        }
    }
}
