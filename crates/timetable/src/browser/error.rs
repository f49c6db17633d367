//! Error types for browser sessions.

use thiserror::Error;

/// Errors raised while driving a browser session.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The browser (or the WebDriver endpoint) could not start a session
    #[error("Could not start browser session: {message}")]
    Launch { message: String },

    /// Transport-level failure talking to the WebDriver endpoint
    #[error("WebDriver transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The WebDriver endpoint answered with an error payload
    #[error("WebDriver error '{error}': {message}")]
    Protocol { error: String, message: String },

    /// A bounded wait ran out
    #[error("Timed out after {waited_ms} ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    /// The element disappeared or was never there
    #[error("No such element: {0}")]
    NoSuchElement(String),

    /// The endpoint answered with something that is not a WebDriver response
    #[error("Malformed WebDriver response: {0}")]
    Malformed(String),

    #[error("Invalid WebDriver URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BrowserError {
    pub fn protocol(error: impl Into<String>, message: impl Into<String>) -> Self {
        BrowserError::Protocol {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error came from a bounded wait running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BrowserError::Timeout { .. })
    }

    /// Returns true if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrowserError::Http(_) | BrowserError::Timeout { .. } | BrowserError::Launch { .. }
        )
    }
}
