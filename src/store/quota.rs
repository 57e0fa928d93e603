//! Quota/usage reporting
//!
//! Derives a [`StorageUsage`] snapshot from the index's accounted bytes,
//! the configured maximum and the device's free space. The quota is
//! advisory: admission is a check, not a hard allocation.

use crate::store::error::StoreResult;
use crate::store::index::MessageIndex;
use crate::store::types::StorageUsage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct UsageReporter {
    index: Arc<dyn MessageIndex>,
    storage_dir: PathBuf,
    max_bytes: u64,
}

impl UsageReporter {
    pub fn new(index: Arc<dyn MessageIndex>, storage_dir: impl AsRef<Path>, max_bytes: u64) -> Self {
        Self {
            index,
            storage_dir: storage_dir.as_ref().to_path_buf(),
            max_bytes,
        }
    }

    /// Current usage snapshot.
    ///
    /// `available = min(configured_max - used, device_free_space)`.
    pub async fn get(&self) -> StoreResult<StorageUsage> {
        let used_bytes = self.index.used_bytes().await?;
        let device_free = fs2::available_space(&self.storage_dir)?;
        let remaining_quota = self.max_bytes.saturating_sub(used_bytes);

        Ok(StorageUsage {
            used_bytes,
            available_bytes: remaining_quota.min(device_free),
            max_bytes: self.max_bytes,
        })
    }
}
