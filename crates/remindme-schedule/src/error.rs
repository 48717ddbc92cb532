use remindme_core::CoreError;
use thiserror::Error;

/// Errors raised while syncing, partitioning or persisting schedules.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Remote fetch was unreachable or answered with a non-success status.
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key/value store could not be used (e.g. a poisoned lock).
    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<reqwest::Error> for ScheduleError {
    fn from(e: reqwest::Error) -> Self {
        ScheduleError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
