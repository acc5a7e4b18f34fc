use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClickerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid catalog: {reason}")]
    InvalidCatalog { reason: String },

    #[error("Session has ended")]
    SessionEnded,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ClickerResult<T> = Result<T, ClickerError>;
