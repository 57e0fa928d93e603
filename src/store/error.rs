use thiserror::Error;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Infrastructure failures of the message store. Expected rejections
/// (malformed, invalid, over quota) are not errors; they are variants of
/// [`crate::store::StoreOutcome`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message data not found at {0}")]
    DataNotFound(String),

    #[error("index error: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Index(err.to_string())
    }
}
