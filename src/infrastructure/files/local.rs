//! Local filesystem stores for uploads and page images

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::DomainError;
use crate::domain::document::VersionId;
use crate::domain::files::{PageImageStore, SourceFileStore};

/// Resolves a stored relative path under a root, refusing to escape it
fn resolve(root: &Path, relative: &str) -> Result<PathBuf, DomainError> {
    let relative = Path::new(relative);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if escapes {
        return Err(DomainError::validation(format!(
            "Path '{}' must be relative to the storage root",
            relative.display()
        )));
    }

    Ok(root.join(relative))
}

/// Reads uploads from a directory
#[derive(Debug, Clone)]
pub struct LocalSourceFileStore {
    root: PathBuf,
}

impl LocalSourceFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SourceFileStore for LocalSourceFileStore {
    async fn read(&self, filepath: &str) -> Result<Option<Bytes>, DomainError> {
        let path = resolve(&self.root, filepath)?;

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Some(Bytes::from(content))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to read source file '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Writes page images under `<root>/<version_id>/<filename>`
#[derive(Debug, Clone)]
pub struct LocalPageImageStore {
    root: PathBuf,
}

impl LocalPageImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl PageImageStore for LocalPageImageStore {
    async fn store(
        &self,
        version_id: &VersionId,
        filename: &str,
        content: Bytes,
    ) -> Result<String, DomainError> {
        let relative = format!("{}/{}", version_id, filename);
        let path = resolve(&self.root, &relative)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::storage(format!(
                    "Failed to create page directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(&path, &content).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to write page image '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(relative)
    }

    async fn load(&self, image_path: &str) -> Result<Bytes, DomainError> {
        let path = resolve(&self.root, image_path)?;

        tokio::fs::read(&path).await.map(Bytes::from).map_err(|e| {
            DomainError::storage(format!(
                "Failed to read page image '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_source_is_none() {
        let dir = TempDir::new().unwrap();
        let store = LocalSourceFileStore::new(dir.path());

        assert!(store.read("uploads/missing.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reads_existing_source() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        std::fs::write(dir.path().join("uploads/a.pdf"), b"%PDF").unwrap();
        let store = LocalSourceFileStore::new(dir.path());

        let content = store.read("uploads/a.pdf").await.unwrap().unwrap();
        assert_eq!(&content[..], b"%PDF");
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalSourceFileStore::new(dir.path());

        assert!(store.read("../etc/passwd").await.is_err());
        assert!(store.read("/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_page_images_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = LocalPageImageStore::new(dir.path());
        let version = VersionId::new("ver-1");

        let path = store
            .store(&version, "contrato_p1.png", Bytes::from_static(b"png"))
            .await
            .unwrap();

        assert_eq!(path, "ver-1/contrato_p1.png");
        assert_eq!(&store.load(&path).await.unwrap()[..], b"png");
    }
}
