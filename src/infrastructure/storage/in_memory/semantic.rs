//! In-memory semantic index

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::document::{PageId, VersionId};
use crate::domain::semantic::{RecordId, SemanticIndexRecord, SemanticIndexRepository};

#[derive(Debug, Default)]
pub struct InMemorySemanticIndex {
    records: RwLock<HashMap<RecordId, SemanticIndexRecord>>,
}

impl InMemorySemanticIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_scope(a: &SemanticIndexRecord, b: &SemanticIndexRecord) -> bool {
    match (&a.page_id, &b.page_id) {
        (Some(x), Some(y)) => x == y,
        (None, None) => a.version_id == b.version_id,
        _ => false,
    }
}

#[async_trait]
impl SemanticIndexRepository for InMemorySemanticIndex {
    async fn find_by_page(
        &self,
        page_id: &PageId,
    ) -> Result<Option<SemanticIndexRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(records
            .values()
            .find(|r| r.page_id.as_ref() == Some(page_id))
            .cloned())
    }

    async fn find_document_record(
        &self,
        version_id: &VersionId,
    ) -> Result<Option<SemanticIndexRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(records
            .values()
            .find(|r| r.is_document_scope() && &r.version_id == version_id)
            .cloned())
    }

    async fn insert_if_absent(&self, record: SemanticIndexRecord) -> Result<bool, DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        if records.values().any(|r| same_scope(r, &record)) {
            return Ok(false);
        }

        records.insert(record.id.clone(), record);
        Ok(true)
    }

    async fn update(&self, record: SemanticIndexRecord) -> Result<(), DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        if !records.contains_key(&record.id) {
            return Err(DomainError::not_found(format!(
                "Semantic record with id '{}' not found",
                record.id
            )));
        }

        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn list_page_records(
        &self,
        version_id: &VersionId,
    ) -> Result<Vec<SemanticIndexRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(records
            .values()
            .filter(|r| !r.is_document_scope() && &r.version_id == version_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{DocumentId, GroupId};
    use crate::domain::semantic::LayoutField;

    #[tokio::test]
    async fn test_insert_if_absent_is_once_per_page() {
        let index = InMemorySemanticIndex::new();
        let page = PageId::new("page-1");
        let record = |text: &str| {
            SemanticIndexRecord::for_page(
                GroupId::new("g"),
                VersionId::new("v"),
                page.clone(),
                vec![LayoutField::new("NOMBRE", text)],
            )
        };

        assert!(index.insert_if_absent(record("first")).await.unwrap());
        assert!(!index.insert_if_absent(record("second")).await.unwrap());

        let stored = index.find_by_page(&page).await.unwrap().unwrap();
        assert_eq!(stored.fields[0].text, "first");
    }

    #[tokio::test]
    async fn test_document_record_once_per_version() {
        let index = InMemorySemanticIndex::new();
        let record = || {
            SemanticIndexRecord::for_document(
                GroupId::new("g"),
                DocumentId::new("d"),
                VersionId::new("v"),
            )
        };

        assert!(index.insert_if_absent(record()).await.unwrap());
        assert!(!index.insert_if_absent(record()).await.unwrap());
        assert!(
            index
                .find_document_record(&VersionId::new("v"))
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            index
                .list_page_records(&VersionId::new("v"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_update_unknown_record_fails() {
        let index = InMemorySemanticIndex::new();
        let record = SemanticIndexRecord::for_page(
            GroupId::new("g"),
            VersionId::new("v"),
            PageId::new("p"),
            vec![],
        );

        assert!(index.update(record).await.is_err());
    }
}
