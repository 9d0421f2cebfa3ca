//! Audit log repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::AuditLogEntry;
use crate::domain::document::DocumentId;
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Append-only audit storage; there is no update or delete
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditLogRepository: Send + Sync + Debug {
    async fn append(&self, entry: AuditLogEntry) -> Result<AuditLogEntry, DomainError>;

    /// Entries of a document, oldest first
    async fn list_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<AuditLogEntry>, DomainError>;
}
