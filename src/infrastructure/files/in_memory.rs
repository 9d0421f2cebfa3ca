//! In-memory file store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::DomainError;
use crate::domain::document::VersionId;
use crate::domain::files::{PageImageStore, SourceFileStore};

/// Keeps uploads and page images in memory
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    files: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, content: impl Into<Bytes>) -> Result<(), DomainError> {
        let mut files = self
            .files
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        files.insert(path.into(), content.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SourceFileStore for InMemoryFileStore {
    async fn read(&self, filepath: &str) -> Result<Option<Bytes>, DomainError> {
        let files = self
            .files
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(files.get(filepath).cloned())
    }
}

#[async_trait]
impl PageImageStore for InMemoryFileStore {
    async fn store(
        &self,
        version_id: &VersionId,
        filename: &str,
        content: Bytes,
    ) -> Result<String, DomainError> {
        let path = format!("{}/{}", version_id, filename);
        self.insert(path.clone(), content)?;
        Ok(path)
    }

    async fn load(&self, image_path: &str) -> Result<Bytes, DomainError> {
        let files = self
            .files
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        files
            .get(image_path)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("Page image '{}' not found", image_path)))
    }
}
