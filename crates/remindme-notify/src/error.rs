use remindme_schedule::ScheduleError;
use thiserror::Error;

/// Failure reported by the platform notification API.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors that can occur within the notification subsystem.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A scheduling or cancellation call on the host failed.
    #[error("Notification host failure: {0}")]
    Host(#[from] HostError),

    /// Settings could not be read or written.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl NotifyError {
    pub fn code(&self) -> &'static str {
        match self {
            NotifyError::Host(_) => "HOST_FAILURE",
            NotifyError::Schedule(_) => "STORAGE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
