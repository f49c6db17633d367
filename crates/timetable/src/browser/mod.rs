//! Narrow capability interface over a browser page.
//!
//! The scraper only ever needs to locate elements, wait for them, click them,
//! type into them and read their text or markup. Everything it does goes
//! through [`PageDriver`], so the navigation logic can be exercised against a
//! scripted page in tests and against a real WebDriver session in production.

mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod webdriver;

pub use error::BrowserError;

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Interval between two polls of a bounded wait.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Opaque handle to an element of the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element(pub String);

impl Element {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// One live browser page.
#[async_trait]
pub trait PageDriver: Send {
    /// Navigates to `url` and waits for the page load to finish.
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Finds the first element matching a CSS selector, if any.
    async fn find(&mut self, css: &str) -> Result<Option<Element>, BrowserError>;

    /// Finds every element matching a CSS selector.
    async fn find_all(&mut self, css: &str) -> Result<Vec<Element>, BrowserError>;

    /// Rendered text of an element.
    async fn text(&mut self, element: &Element) -> Result<String, BrowserError>;

    async fn is_enabled(&mut self, element: &Element) -> Result<bool, BrowserError>;

    async fn click(&mut self, element: &Element) -> Result<(), BrowserError>;

    /// Clears an input and types `text` into it.
    async fn type_text(&mut self, element: &Element, text: &str) -> Result<(), BrowserError>;

    /// Serialized markup of an element, itself included.
    async fn outer_html(&mut self, element: &Element) -> Result<String, BrowserError>;

    /// Ends the session. Must be safe to call more than once.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Starts fresh browser sessions. One session per scrape.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, BrowserError>;
}

/// Polls for an element until it shows up or `timeout` elapses.
pub async fn wait_for_element(
    driver: &mut dyn PageDriver,
    css: &str,
    timeout: Duration,
) -> Result<Element, BrowserError> {
    let start = Instant::now();

    loop {
        if let Some(element) = driver.find(css).await? {
            return Ok(element);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(BrowserError::Timeout {
                what: css.to_string(),
                waited_ms: elapsed.as_millis() as u64,
            });
        }

        trace!(selector = css, "Element not present yet, polling again");
        tokio::time::sleep(POLL_INTERVAL.min(timeout - elapsed)).await;
    }
}
