// src/storage/mod.rs

//! Object storage for heritage-guide documents.
//!
//! Tours carry an opaque `heritage_guide` key; this module resolves a key to
//! raw document bytes. Production deployments mount the guide bucket at a
//! local path, so the shipped implementation is filesystem-backed.

use crate::errors::AppError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's raw bytes by key.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, AppError>;
}

pub struct FileObjectStore {
    base_path: PathBuf,
}

impl FileObjectStore {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: PathBuf::from(base_path),
        }
    }

    /// Create the storage root if it is missing.
    pub async fn init(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            AppError::ObjectStorageError(format!("Failed to create storage directory: {}", e))
        })?;
        info!("Initialized object storage at: {:?}", self.base_path);
        Ok(())
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        // Keys are opaque references from the catalog, not user paths;
        // still refuse anything that would escape the storage root.
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(AppError::InvalidInput(format!(
                "invalid object key: {}",
                key
            )));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FileObjectStore {
    #[instrument(skip(self), fields(key), err)]
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key)?;

        if !path.exists() {
            return Err(AppError::NotFound(format!("object not found: {}", key)));
        }

        fs::read(&path).await.map_err(|e| {
            AppError::ObjectStorageError(format!("Failed to read object '{}': {}", key, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fetch_round_trip() {
        let temp_dir = tempdir().unwrap();
        let store = FileObjectStore::new(temp_dir.path().to_str().unwrap());
        store.init().await.unwrap();

        let path = temp_dir.path().join("guides");
        tokio::fs::create_dir_all(&path).await.unwrap();
        tokio::fs::write(path.join("hue.pdf"), b"fake pdf bytes")
            .await
            .unwrap();

        let bytes = store.fetch("guides/hue.pdf").await.unwrap();
        assert_eq!(bytes, b"fake pdf bytes");
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let temp_dir = tempdir().unwrap();
        let store = FileObjectStore::new(temp_dir.path().to_str().unwrap());
        store.init().await.unwrap();

        let err = store.fetch("guides/missing.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_escaping_key_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let store = FileObjectStore::new(temp_dir.path().to_str().unwrap());

        let err = store.fetch("../outside.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
