//! Field extraction service boundary

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

use crate::domain::document::{DocumentId, GroupId, PageId, VersionId};
use crate::domain::error::DomainError;

/// A page dispatched for field extraction
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub group_id: GroupId,
    pub document_id: DocumentId,
    pub version_id: VersionId,
    pub page_id: PageId,
    pub page_number: u32,
    pub image_filename: String,
    pub image: Bytes,
}

/// Extracts labelled fields from a page image.
///
/// On success the extraction result is readable from the semantic index,
/// keyed by the page id of the request.
#[async_trait]
pub trait ExtractionService: Send + Sync + Debug {
    async fn extract(&self, request: &ExtractionRequest) -> Result<(), DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    use crate::domain::semantic::{LayoutField, SemanticIndexRecord, SemanticIndexRepository};

    /// Writes configured fields into the semantic index like the real service
    #[derive(Debug)]
    pub struct MockExtractionService {
        index: Arc<dyn SemanticIndexRepository>,
        fields: RwLock<Vec<LayoutField>>,
        failing_pages: RwLock<HashMap<u32, String>>,
        calls: RwLock<Vec<ExtractionRequest>>,
    }

    impl MockExtractionService {
        pub fn new(index: Arc<dyn SemanticIndexRepository>) -> Self {
            Self {
                index,
                fields: RwLock::new(Vec::new()),
                failing_pages: RwLock::new(HashMap::new()),
                calls: RwLock::new(Vec::new()),
            }
        }

        pub fn with_fields(self, fields: Vec<LayoutField>) -> Self {
            *self.fields.write().unwrap() = fields;
            self
        }

        pub fn with_failing_page(self, page_number: u32, error: &str) -> Self {
            self.failing_pages
                .write()
                .unwrap()
                .insert(page_number, error.to_string());
            self
        }

        pub fn calls(&self) -> Vec<ExtractionRequest> {
            self.calls.read().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExtractionService for MockExtractionService {
        async fn extract(&self, request: &ExtractionRequest) -> Result<(), DomainError> {
            self.calls.write().unwrap().push(request.clone());

            if let Some(error) = self.failing_pages.read().unwrap().get(&request.page_number) {
                return Err(DomainError::external_service("extractor", error.clone()));
            }

            let fields = self.fields.read().unwrap().clone();
            let record = SemanticIndexRecord::for_page(
                request.group_id.clone(),
                request.version_id.clone(),
                request.page_id.clone(),
                fields,
            );
            self.index.insert_if_absent(record).await?;
            Ok(())
        }
    }
}
