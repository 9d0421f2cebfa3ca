//! Document, version and page repository traits

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{Document, DocumentId, DocumentStatus, GroupId};
use super::page::{DocumentPage, PageId};
use super::version::{DocumentVersion, NewVersion, VersionId};
use crate::domain::error::DomainError;
use crate::domain::semantic::LayoutField;

#[cfg(test)]
use mockall::automock;

/// Repository for document persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentRepository: Send + Sync + Debug {
    async fn create(&self, document: Document) -> Result<Document, DomainError>;

    async fn update(&self, document: Document) -> Result<Document, DomainError>;

    /// Sets the status only while the stored status is one of `from`.
    /// Returns whether the document changed.
    async fn set_status_if(
        &self,
        id: &DocumentId,
        from: &[DocumentStatus],
        to: DocumentStatus,
    ) -> Result<bool, DomainError>;

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, DomainError>;

    async fn list_by_group(&self, group_id: &GroupId) -> Result<Vec<Document>, DomainError>;
}

/// Repository for document versions.
///
/// `create_current` is the only operation allowed to change `is_current`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VersionRepository: Send + Sync + Debug {
    /// Atomically supersedes the current version (if any) and inserts a new
    /// current version numbered one above the highest existing number.
    async fn create_current(
        &self,
        document_id: &DocumentId,
        new_version: NewVersion,
    ) -> Result<DocumentVersion, DomainError>;

    async fn find_by_id(&self, id: &VersionId) -> Result<Option<DocumentVersion>, DomainError>;

    async fn find_current(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<DocumentVersion>, DomainError>;

    /// All versions of a document ordered by version number
    async fn list_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<DocumentVersion>, DomainError>;

    async fn set_page_count(&self, id: &VersionId, page_count: u32) -> Result<(), DomainError>;
}

/// Repository for rendered pages
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PageRepository: Send + Sync + Debug {
    /// Fails with a conflict if the version already has this page number
    async fn create(&self, page: DocumentPage) -> Result<DocumentPage, DomainError>;

    async fn find_by_id(&self, id: &PageId) -> Result<Option<DocumentPage>, DomainError>;

    async fn update_layout(
        &self,
        id: &PageId,
        layout: Vec<LayoutField>,
    ) -> Result<(), DomainError>;

    /// Pages of a version ordered by page number
    async fn list_for_version(
        &self,
        version_id: &VersionId,
    ) -> Result<Vec<DocumentPage>, DomainError>;
}
