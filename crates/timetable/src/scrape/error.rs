//! Error types for the scrape pipeline.

use crate::browser::BrowserError;
use crate::schedule::ScrapeErrorKind;
use thiserror::Error;

/// Errors that end a scrape. Row-level problems never get here.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No browser session could be acquired
    #[error("driver initialization failed")]
    DriverInit {
        #[source]
        source: BrowserError,
    },

    /// The session failed or crashed mid-scrape
    #[error("browser session failed: {source}")]
    Driver {
        #[source]
        source: BrowserError,
    },

    /// The schedule page could not be opened
    #[error("could not open {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: BrowserError,
    },

    /// A page element did not appear within its bounded wait
    #[error("timed out after {waited_ms} ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    /// No suggestion control matched the requested group
    #[error("group not found")]
    GroupNotFound { group: String },

    /// The scrape task ended without producing a result
    #[error("scrape task aborted: {message}")]
    Aborted { message: String },
}

impl ScrapeError {
    pub fn kind(&self) -> ScrapeErrorKind {
        match self {
            ScrapeError::DriverInit { .. }
            | ScrapeError::Driver { .. }
            | ScrapeError::Aborted { .. } => ScrapeErrorKind::Driver,
            ScrapeError::Navigation { .. } => ScrapeErrorKind::Navigation,
            ScrapeError::Timeout { .. } => ScrapeErrorKind::Timeout,
            ScrapeError::GroupNotFound { .. } => ScrapeErrorKind::NotFound,
        }
    }

    /// Returns true if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<BrowserError> for ScrapeError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Timeout { what, waited_ms } => ScrapeError::Timeout { what, waited_ms },
            source => ScrapeError::Driver { source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_timeout_maps_to_timeout_kind() {
        let err: ScrapeError = BrowserError::Timeout {
            what: "input#gr".to_string(),
            waited_ms: 10_000,
        }
        .into();
        assert_eq!(err.kind(), ScrapeErrorKind::Timeout);
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "timed out after 10000 ms waiting for input#gr");
    }

    #[test]
    fn test_other_browser_errors_map_to_driver_kind() {
        let err: ScrapeError = BrowserError::protocol("invalid session id", "gone").into();
        assert_eq!(err.kind(), ScrapeErrorKind::Driver);
    }

    #[test]
    fn test_group_not_found_is_terminal() {
        let err = ScrapeError::GroupNotFound {
            group: "XYZ".to_string(),
        };
        assert_eq!(err.to_string(), "group not found");
        assert!(!err.is_retryable());
    }
}
