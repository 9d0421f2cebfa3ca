//! In-memory audit log

use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::audit::{AuditLogEntry, AuditLogRepository};
use crate::domain::document::DocumentId;

#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLog {
    async fn append(&self, entry: AuditLogEntry) -> Result<AuditLogEntry, DomainError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        entries.push(entry.clone());
        Ok(entry)
    }

    async fn list_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<AuditLogEntry>, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(entries
            .iter()
            .filter(|e| &e.document_id == document_id)
            .cloned()
            .collect())
    }
}
