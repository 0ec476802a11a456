use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Insufficient data for customer '{customer_id}'")]
    InsufficientData { customer_id: String },

    #[error("Invalid risk weights: {reason}")]
    InvalidWeights { reason: String },

    #[error("Malformed transaction at index {index}: {reason}")]
    MalformedTransaction { index: usize, reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ChurnResult<T> = Result<T, ChurnError>;
