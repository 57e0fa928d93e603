use thiserror::Error;

/// Result type for envelope operations
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

/// Errors raised while decoding or validating an envelope.
///
/// `Malformed` means the bytes do not parse as the wire format at all;
/// `Invalid` means the structure parsed but a semantic, temporal or
/// identity check failed.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("invalid envelope: {0}")]
    Invalid(String),
}

impl EnvelopeError {
    /// Whether the failure was structural rather than semantic.
    pub fn is_malformed(&self) -> bool {
        matches!(self, EnvelopeError::Malformed(_))
    }
}
