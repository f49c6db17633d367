//! Error types for the user store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("User storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A thread panicked while holding the connection
    #[error("User store connection lock poisoned")]
    Poisoned,
}
