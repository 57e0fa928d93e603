use crate::envelope::{Envelope, MessageKind, RecipientType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted record of an admitted message.
///
/// Immutable once stored; deleted only when its owning collection
/// authorization completes a round-trip or a retention pass purges it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredMessage {
    /// Unique message id from the envelope
    pub message_id: String,

    pub kind: MessageKind,

    /// Resolved destination: node id for local recipients, internet-style
    /// address for internet recipients
    pub recipient_address: String,

    pub recipient_type: RecipientType,

    pub sender_id: String,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Length of the persisted frame; always equals the blob length
    pub size_bytes: u64,

    /// Location of the raw frame in the blob repository; unique per id
    pub blob_location: String,
}

impl StoredMessage {
    pub(crate) fn from_envelope(
        envelope: &Envelope,
        kind: MessageKind,
        recipient_address: String,
        recipient_type: RecipientType,
        size_bytes: u64,
        blob_location: String,
    ) -> Self {
        Self {
            message_id: envelope.id.clone(),
            kind,
            recipient_address,
            recipient_type,
            sender_id: envelope.sender_id.clone(),
            created_at: envelope.created_at,
            expires_at: envelope.expires_at,
            size_bytes,
            blob_location,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Derived snapshot of storage consumption.
///
/// `available_bytes` is the minimum of the remaining configured quota and
/// the device's free space at the time of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub max_bytes: u64,
}

impl StorageUsage {
    /// Advisory admission check: does a candidate of this size fit?
    pub fn admits(&self, candidate_size: u64) -> bool {
        self.available_bytes >= candidate_size
    }

    /// Quota utilization percentage
    pub fn percentage(&self) -> f64 {
        if self.max_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.max_bytes as f64 * 100.0
    }
}

impl std::fmt::Display for StorageUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.2}MB used of {:.2}MB ({:.1}%), {:.2}MB available",
            self.used_bytes as f64 / 1024.0 / 1024.0,
            self.max_bytes as f64 / 1024.0 / 1024.0,
            self.percentage(),
            self.available_bytes as f64 / 1024.0 / 1024.0,
        )
    }
}

/// Outcome of a store operation. Exhaustive: expected rejections never
/// surface as errors, and callers match on every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Success(StoredMessage),
    /// Bytes did not parse as the expected wire format
    Malformed,
    /// Parsed but failed a semantic, temporal, identity or address-form check
    Invalid,
    /// Admission denied by the storage quota
    NoSpaceAvailable,
}

impl StoreOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StoreOutcome::Success(_))
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            StoreOutcome::Success(_) => "success",
            StoreOutcome::Malformed => "malformed",
            StoreOutcome::Invalid => "invalid",
            StoreOutcome::NoSpaceAvailable => "no space available",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(used: u64, available: u64, max: u64) -> StorageUsage {
        StorageUsage {
            used_bytes: used,
            available_bytes: available,
            max_bytes: max,
        }
    }

    #[test]
    fn test_admission() {
        assert!(usage(0, 100, 100).admits(100));
        assert!(usage(0, 100, 100).admits(1));
        assert!(!usage(0, 100, 100).admits(101));
        assert!(!usage(100, 0, 100).admits(1));
        assert!(usage(100, 0, 100).admits(0));
    }

    #[test]
    fn test_percentage() {
        assert!((usage(50, 50, 100).percentage() - 50.0).abs() < f64::EPSILON);
        assert_eq!(usage(0, 0, 0).percentage(), 0.0);
    }
}
