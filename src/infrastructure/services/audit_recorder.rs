//! Append-only document audit trail

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::DomainError;
use crate::domain::audit::{AuditAction, AuditLogEntry, AuditLogRepository};
use crate::domain::document::{DocumentId, DocumentVersion};

/// Records lifecycle actions. Recording never fails the caller; append
/// errors are logged and reported as `false`.
#[derive(Debug, Clone)]
pub struct AuditTrailRecorder {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditTrailRecorder {
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    /// First ingestion of a document
    pub async fn record_uploaded(&self, version: &DocumentVersion, actor: &str) -> bool {
        let entry = AuditLogEntry::new(version.document_id.clone(), AuditAction::Uploaded, actor)
            .with_version(version.id.clone())
            .with_comment(format!(
                "Document uploaded for the first time: {}",
                version.filename
            ));

        self.append(entry).await
    }

    /// A new version of an existing document
    pub async fn record_reuploaded(
        &self,
        version: &DocumentVersion,
        actor: &str,
        comment: Option<&str>,
    ) -> bool {
        let comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("New version uploaded v{}", version.version_number));

        let entry =
            AuditLogEntry::new(version.document_id.clone(), AuditAction::Reuploaded, actor)
                .with_version(version.id.clone())
                .with_comment(comment)
                .with_metadata(json!({
                    "version_number": version.version_number,
                    "filename": version.filename,
                    "file_size": version.file_size,
                }));

        self.append(entry).await
    }

    pub async fn record_downloaded(&self, version: &DocumentVersion, actor: &str) -> bool {
        let entry =
            AuditLogEntry::new(version.document_id.clone(), AuditAction::Downloaded, actor)
                .with_version(version.id.clone())
                .with_metadata(json!({ "version_number": version.version_number }));

        self.append(entry).await
    }

    pub async fn record_deleted(
        &self,
        document_id: &DocumentId,
        actor: &str,
        comment: Option<&str>,
    ) -> bool {
        let mut entry = AuditLogEntry::new(document_id.clone(), AuditAction::Deleted, actor);
        if let Some(comment) = comment {
            entry = entry.with_comment(comment);
        }

        self.append(entry).await
    }

    /// Entries of a document in recording order
    pub async fn history(&self, document_id: &DocumentId) -> Result<Vec<AuditLogEntry>, DomainError> {
        self.repository.list_for_document(document_id).await
    }

    async fn append(&self, entry: AuditLogEntry) -> bool {
        let document_id = entry.document_id.clone();
        let action = entry.action;

        match self.repository.append(entry).await {
            Ok(_) => {
                debug!(document_id = %document_id, action = %action, "Audit entry recorded");
                true
            }
            Err(e) => {
                warn!(document_id = %document_id, action = %action, error = %e, "Failed to record audit entry");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::MockAuditLogRepository;
    use crate::domain::document::NewVersion;
    use crate::infrastructure::storage::InMemoryAuditLog;

    fn version(number: u32) -> DocumentVersion {
        NewVersion::new("contrato.pdf", "grp-1/contrato.pdf", "ana")
            .with_content(b"%PDF-1.7")
            .into_version(DocumentId::new("doc-1"), number)
    }

    #[tokio::test]
    async fn test_upload_comment() {
        let recorder = AuditTrailRecorder::new(Arc::new(InMemoryAuditLog::new()));
        let v1 = version(1);

        assert!(recorder.record_uploaded(&v1, "ana").await);

        let history = recorder.history(&v1.document_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, AuditAction::Uploaded);
        assert_eq!(history[0].version_id, Some(v1.id.clone()));
        assert_eq!(
            history[0].comment.as_deref(),
            Some("Document uploaded for the first time: contrato.pdf")
        );
    }

    #[tokio::test]
    async fn test_reupload_defaults_comment_and_records_metadata() {
        let recorder = AuditTrailRecorder::new(Arc::new(InMemoryAuditLog::new()));
        let v3 = version(3);

        recorder.record_reuploaded(&v3, "ana", None).await;
        recorder.record_reuploaded(&v3, "ana", Some("firmado")).await;
        recorder.record_reuploaded(&v3, "ana", Some("   ")).await;

        let history = recorder.history(&v3.document_id).await.unwrap();
        assert_eq!(history[0].comment.as_deref(), Some("New version uploaded v3"));
        assert_eq!(history[1].comment.as_deref(), Some("firmado"));
        assert_eq!(history[2].comment.as_deref(), Some("New version uploaded v3"));
        assert_eq!(
            history[0].metadata,
            json!({"version_number": 3, "filename": "contrato.pdf", "file_size": 8})
        );
    }

    #[tokio::test]
    async fn test_append_failure_is_swallowed() {
        let mut repository = MockAuditLogRepository::new();
        repository
            .expect_append()
            .times(1)
            .returning(|_| Err(DomainError::storage("disk full")));

        let recorder = AuditTrailRecorder::new(Arc::new(repository));

        assert!(!recorder.record_deleted(&DocumentId::new("doc-1"), "ana", None).await);
    }
}
