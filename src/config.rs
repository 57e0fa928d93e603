//! Courier configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Smallest quota a courier may be configured with
pub const MIN_STORAGE_BYTES: u64 = 100_000_000;

/// Granularity offered when adjusting the quota
pub const STORAGE_STEP_BYTES: u64 = 100_000_000;

/// Configuration for a courier instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Directory holding message blobs
    pub storage_dir: PathBuf,

    /// Database URL of the persistent message index
    pub index_url: String,

    /// Configured maximum on-disk space for stored messages
    pub max_storage_bytes: u64,

    /// How long a collection session may stay idle before it counts as a
    /// transport failure
    pub idle_timeout: Duration,

    /// Concurrent collection sessions per pass
    pub max_concurrent_sessions: usize,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("courier-data"),
            index_url: "sqlite:courier-index.db?mode=rwc".into(),
            max_storage_bytes: 1024 * 1024 * 1024, // 1GB
            idle_timeout: Duration::from_secs(30),
            max_concurrent_sessions: 4,
        }
    }
}

impl CourierConfig {
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    /// Set the quota, clamped to the supported minimum.
    pub fn max_storage_bytes(mut self, bytes: u64) -> Self {
        self.max_storage_bytes = bytes.max(MIN_STORAGE_BYTES);
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn max_concurrent_sessions(mut self, limit: usize) -> Self {
        self.max_concurrent_sessions = limit.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CourierConfig::default();
        assert!(config.max_storage_bytes >= MIN_STORAGE_BYTES);
        assert!(config.max_concurrent_sessions >= 1);
    }

    #[test]
    fn test_quota_clamped_to_minimum() {
        let config = CourierConfig::default().max_storage_bytes(5);
        assert_eq!(config.max_storage_bytes, MIN_STORAGE_BYTES);
    }
}
