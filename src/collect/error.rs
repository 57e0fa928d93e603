use crate::store::StoreError;
use thiserror::Error;

/// Result type for collection passes
pub type CollectResult<T> = Result<T, CollectError>;

/// Failures that abort a whole collection pass. Per-session failures do
/// not; they are scoped to their CCA and reported in the pass summary.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to enumerate stored authorizations: {0}")]
    Index(#[from] StoreError),
}

/// Transport-level session failure. The owning CCA is retained so a
/// future pass can retry.
#[derive(Debug, Clone, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
