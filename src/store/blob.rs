//! Blob repository
//!
//! Content-backed byte storage for admitted message frames. Locations are
//! opaque strings minted at write time; one blob per message.

use crate::store::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Seam over blob storage.
#[async_trait]
pub trait BlobRepository: Send + Sync {
    /// Persist a blob and return its location.
    async fn write(&self, data: &[u8]) -> StoreResult<String>;

    /// Read a blob back; fails with `DataNotFound` if it is missing.
    async fn read(&self, location: &str) -> StoreResult<Vec<u8>>;

    /// Remove a blob. Removing a missing blob is not an error.
    async fn delete(&self, location: &str) -> StoreResult<()>;
}

/// Filesystem-backed blob repository: one UUID-named file per blob under
/// a single directory.
pub struct FsBlobRepository {
    root: PathBuf,
}

impl FsBlobRepository {
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, location: &str) -> PathBuf {
        self.root.join(location)
    }
}

#[async_trait]
impl BlobRepository for FsBlobRepository {
    async fn write(&self, data: &[u8]) -> StoreResult<String> {
        let location = format!("{}.blob", uuid::Uuid::new_v4());
        tokio::fs::write(self.path_for(&location), data).await?;
        Ok(location)
    }

    async fn read(&self, location: &str) -> StoreResult<Vec<u8>> {
        match tokio::fs::read(self.path_for(location)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::DataNotFound(location.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, location: &str) -> StoreResult<()> {
        match tokio::fs::remove_file(self.path_for(location)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsBlobRepository::new(dir.path()).unwrap();

        let location = repo.write(b"some bytes").await.unwrap();
        let data = repo.read(&location).await.unwrap();
        assert_eq!(data, b"some bytes");
    }

    #[tokio::test]
    async fn test_locations_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsBlobRepository::new(dir.path()).unwrap();

        let a = repo.write(b"same").await.unwrap();
        let b = repo.write(b"same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_read_missing_is_data_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsBlobRepository::new(dir.path()).unwrap();

        let err = repo.read("nope.blob").await.unwrap_err();
        assert!(matches!(err, StoreError::DataNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsBlobRepository::new(dir.path()).unwrap();

        let location = repo.write(b"bytes").await.unwrap();
        repo.delete(&location).await.unwrap();
        repo.delete(&location).await.unwrap();

        assert!(matches!(
            repo.read(&location).await.unwrap_err(),
            StoreError::DataNotFound(_)
        ));
    }
}
