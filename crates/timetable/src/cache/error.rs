//! Error types for the schedule cache.

use thiserror::Error;

/// Storage-level failures. These have no local recovery and go to the caller.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Stored payload could not be (de)serialized
    #[error("Cache payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// Stored scope column holds an unknown value
    #[error("Corrupt cache row: {0}")]
    Corrupt(String),

    /// A thread panicked while holding the connection
    #[error("Cache connection lock poisoned")]
    Poisoned,
}
