//! In-memory validation issue store

use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::document::DocumentId;
use crate::domain::ingestion::{ObservationRecord, ObservationRepository};

#[derive(Debug, Default)]
pub struct InMemoryObservationStore {
    records: RwLock<Vec<ObservationRecord>>,
}

impl InMemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObservationRepository for InMemoryObservationStore {
    async fn append_all(&self, records: Vec<ObservationRecord>) -> Result<usize, DomainError> {
        let mut stored = self
            .records
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let mut appended = 0;
        for record in records {
            if stored.iter().any(|r| r.same_issue(&record)) {
                continue;
            }
            stored.push(record);
            appended += 1;
        }

        Ok(appended)
    }

    async fn list_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<ObservationRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(records
            .iter()
            .filter(|r| &r.document_id == document_id)
            .cloned()
            .collect())
    }
}
