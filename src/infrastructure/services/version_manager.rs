//! Version creation and document status rollup

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::DomainError;
use crate::domain::document::{
    Document, DocumentId, DocumentRepository, DocumentStatus, DocumentVersion, NewVersion,
    VersionRepository,
};
use crate::domain::ingestion::DocumentOutcome;
use crate::infrastructure::metrics;

#[derive(Debug, Clone)]
pub struct VersionStateManager {
    documents: Arc<dyn DocumentRepository>,
    versions: Arc<dyn VersionRepository>,
}

impl VersionStateManager {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        versions: Arc<dyn VersionRepository>,
    ) -> Self {
        Self {
            documents,
            versions,
        }
    }

    /// Supersedes the current version and creates the next one in a single
    /// atomic step. On error nothing changed.
    #[instrument(skip(self, new_version), fields(filename = %new_version.filename))]
    pub async fn create_version(
        &self,
        document_id: &DocumentId,
        new_version: NewVersion,
    ) -> Result<DocumentVersion, DomainError> {
        let version = self.versions.create_current(document_id, new_version).await?;

        info!(
            document_id = %document_id,
            version_id = %version.id,
            version_number = version.version_number,
            "Created current version"
        );

        Ok(version)
    }

    /// Records the page count of a processed version and rolls the outcome
    /// up into the document status
    #[instrument(skip(self, document, outcome), fields(document_id = %document.id()))]
    pub async fn complete_version(
        &self,
        mut document: Document,
        version: &DocumentVersion,
        outcome: &DocumentOutcome,
    ) -> Result<Document, DomainError> {
        let page_count = outcome.page_count();
        self.versions.set_page_count(&version.id, page_count).await?;

        let status = outcome.status();
        document.set_status(status);
        let document = self.documents.update(document).await?;

        info!(
            version_number = version.version_number,
            page_count,
            status = %status,
            "Version processing completed"
        );
        metrics::record_document(status.as_str());

        Ok(document)
    }

    /// Puts a document into the failed state
    pub async fn mark_unclassified(&self, mut document: Document) -> Result<Document, DomainError> {
        document.set_status(DocumentStatus::Unclassified);
        metrics::record_document(DocumentStatus::Unclassified.as_str());
        self.documents.update(document).await
    }

    pub async fn current_version(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<DocumentVersion>, DomainError> {
        self.versions.find_current(document_id).await
    }

    pub async fn history(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<DocumentVersion>, DomainError> {
        self.versions.list_for_document(document_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{GroupId, MockVersionRepository};
    use crate::domain::ingestion::PageOutcome;
    use crate::infrastructure::storage::InMemoryDocumentStore;

    async fn setup() -> (VersionStateManager, Arc<InMemoryDocumentStore>, Document) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let document = DocumentRepository::create(
            store.as_ref(),
            Document::new(GroupId::new("grp-1"), "contrato.pdf"),
        )
        .await
        .unwrap();

        (
            VersionStateManager::new(store.clone(), store.clone()),
            store,
            document,
        )
    }

    fn upload(name: &str) -> NewVersion {
        NewVersion::new(name, format!("grp-1/{}", name), "ana")
    }

    #[tokio::test]
    async fn test_second_version_supersedes_first() {
        let (manager, _, document) = setup().await;

        let v1 = manager.create_version(document.id(), upload("a.pdf")).await.unwrap();
        let v2 = manager.create_version(document.id(), upload("b.pdf")).await.unwrap();

        assert_eq!(v1.version_number, 1);
        assert_eq!(v2.version_number, 2);

        let history = manager.history(document.id()).await.unwrap();
        let current: Vec<_> = history.iter().filter(|v| v.is_current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, v2.id);
        assert_eq!(
            manager.current_version(document.id()).await.unwrap().unwrap().id,
            v2.id
        );
    }

    #[tokio::test]
    async fn test_concurrent_uploads_keep_one_current_version() {
        let (manager, _, document) = setup().await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = manager.clone();
                let id = document.id().clone();
                tokio::spawn(async move {
                    manager
                        .create_version(&id, upload(&format!("scan_{}.pdf", i)))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = manager.history(document.id()).await.unwrap();
        let numbers: Vec<u32> = history.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, (1..=8).collect::<Vec<_>>());
        assert_eq!(history.iter().filter(|v| v.is_current).count(), 1);
    }

    #[tokio::test]
    async fn test_complete_version_rolls_up_status_and_page_count() {
        let (manager, store, document) = setup().await;
        let version = manager.create_version(document.id(), upload("a.pdf")).await.unwrap();

        let mut outcome = DocumentOutcome::new();
        outcome.record_page(1, PageOutcome::NotAnalyzed);
        outcome.record_page(
            4,
            PageOutcome::Flagged {
                labels: vec!["RUT_DEUDOR".to_string()],
            },
        );

        let document = manager
            .complete_version(document, &version, &outcome)
            .await
            .unwrap();

        assert_eq!(document.status(), DocumentStatus::Rejected);
        let stored = VersionRepository::find_by_id(store.as_ref(), &version.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.page_count, 4);
    }

    #[tokio::test]
    async fn test_failed_creation_propagates() {
        let mut versions = MockVersionRepository::new();
        versions
            .expect_create_current()
            .times(1)
            .returning(|_, _| Err(DomainError::storage("deadlock detected")));

        let manager = VersionStateManager::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(versions),
        );

        let error = manager
            .create_version(&DocumentId::new("doc-1"), upload("a.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(error, DomainError::Storage { .. }));
    }
}
