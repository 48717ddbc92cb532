use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),
}

impl CoreError {
    /// Short error code string surfaced to the UI collaborator.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::InvalidIdentity(_) => "INVALID_IDENTITY",
            CoreError::InvalidTime(_) => "INVALID_TIME",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
