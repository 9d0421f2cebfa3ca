//! Semantic index repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::SemanticIndexRecord;
use crate::domain::document::{PageId, VersionId};
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Shared store for extraction results.
///
/// The extraction service writes page records; the pipeline reads, links and
/// corrects them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SemanticIndexRepository: Send + Sync + Debug {
    async fn find_by_page(
        &self,
        page_id: &PageId,
    ) -> Result<Option<SemanticIndexRecord>, DomainError>;

    /// The document-scope record of a version
    async fn find_document_record(
        &self,
        version_id: &VersionId,
    ) -> Result<Option<SemanticIndexRecord>, DomainError>;

    /// Inserts unless a record with the same scope exists; returns whether it inserted
    async fn insert_if_absent(&self, record: SemanticIndexRecord) -> Result<bool, DomainError>;

    async fn update(&self, record: SemanticIndexRecord) -> Result<(), DomainError>;

    /// Page-scope records of a version
    async fn list_page_records(
        &self,
        version_id: &VersionId,
    ) -> Result<Vec<SemanticIndexRecord>, DomainError>;
}
