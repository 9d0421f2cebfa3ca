//! Raw file storage boundaries

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

use crate::domain::document::VersionId;
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Read access to uploaded source files
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SourceFileStore: Send + Sync + Debug {
    /// Reads a stored upload; `None` when the file does not exist
    async fn read(&self, filepath: &str) -> Result<Option<Bytes>, DomainError>;
}

/// Storage for rendered page images
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PageImageStore: Send + Sync + Debug {
    /// Stores an image and returns the path it can be loaded from
    async fn store(
        &self,
        version_id: &VersionId,
        filename: &str,
        content: Bytes,
    ) -> Result<String, DomainError>;

    async fn load(&self, image_path: &str) -> Result<Bytes, DomainError>;
}
