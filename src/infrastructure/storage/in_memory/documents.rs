//! In-memory document, version and page repositories

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::document::{
    Document, DocumentId, DocumentPage, DocumentRepository, DocumentStatus, DocumentVersion,
    GroupId, NewVersion,
    PageId, PageRepository, VersionId, VersionRepository, next_version_number,
};
use crate::domain::semantic::LayoutField;

/// Documents, versions and pages kept in memory.
///
/// Version creation runs under a single write lock, so supersession and
/// insertion are observed together.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocumentId, Document>>,
    versions: RwLock<HashMap<DocumentId, Vec<DocumentVersion>>>,
    pages: RwLock<HashMap<VersionId, Vec<DocumentPage>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentStore {
    async fn create(&self, document: Document) -> Result<Document, DomainError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        if documents.contains_key(document.id()) {
            return Err(DomainError::conflict(format!(
                "Document with id '{}' already exists",
                document.id()
            )));
        }

        documents.insert(document.id().clone(), document.clone());
        Ok(document)
    }

    async fn update(&self, document: Document) -> Result<Document, DomainError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        if !documents.contains_key(document.id()) {
            return Err(DomainError::not_found(format!(
                "Document with id '{}' not found",
                document.id()
            )));
        }

        documents.insert(document.id().clone(), document.clone());
        Ok(document)
    }

    async fn set_status_if(
        &self,
        id: &DocumentId,
        from: &[DocumentStatus],
        to: DocumentStatus,
    ) -> Result<bool, DomainError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        match documents.get_mut(id) {
            Some(document) if from.contains(&document.status()) => {
                document.set_status(to);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, DomainError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(documents.get(id).cloned())
    }

    async fn list_by_group(&self, group_id: &GroupId) -> Result<Vec<Document>, DomainError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let mut result: Vec<_> = documents
            .values()
            .filter(|d| d.group_id() == group_id)
            .cloned()
            .collect();
        result.sort_by_key(|d| d.created_at());
        Ok(result)
    }
}

#[async_trait]
impl VersionRepository for InMemoryDocumentStore {
    async fn create_current(
        &self,
        document_id: &DocumentId,
        new_version: NewVersion,
    ) -> Result<DocumentVersion, DomainError> {
        let exists = self
            .documents
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?
            .contains_key(document_id);

        if !exists {
            return Err(DomainError::not_found(format!(
                "Document with id '{}' not found",
                document_id
            )));
        }

        let mut versions = self
            .versions
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let history = versions.entry(document_id.clone()).or_default();
        let number = next_version_number(history.iter().map(|v| v.version_number).max());

        for version in history.iter_mut() {
            version.is_current = false;
        }

        let version = new_version.into_version(document_id.clone(), number);
        history.push(version.clone());

        Ok(version)
    }

    async fn find_by_id(&self, id: &VersionId) -> Result<Option<DocumentVersion>, DomainError> {
        let versions = self
            .versions
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(versions.values().flatten().find(|v| &v.id == id).cloned())
    }

    async fn find_current(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<DocumentVersion>, DomainError> {
        let versions = self
            .versions
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(versions
            .get(document_id)
            .and_then(|history| history.iter().find(|v| v.is_current))
            .cloned())
    }

    async fn list_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<DocumentVersion>, DomainError> {
        let versions = self
            .versions
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let mut result = versions.get(document_id).cloned().unwrap_or_default();
        result.sort_by_key(|v| v.version_number);
        Ok(result)
    }

    async fn set_page_count(&self, id: &VersionId, page_count: u32) -> Result<(), DomainError> {
        let mut versions = self
            .versions
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let version = versions
            .values_mut()
            .flatten()
            .find(|v| &v.id == id)
            .ok_or_else(|| DomainError::not_found(format!("Version with id '{}' not found", id)))?;

        version.page_count = page_count;
        Ok(())
    }
}

#[async_trait]
impl PageRepository for InMemoryDocumentStore {
    async fn create(&self, page: DocumentPage) -> Result<DocumentPage, DomainError> {
        let mut pages = self
            .pages
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let version_pages = pages.entry(page.version_id.clone()).or_default();

        if version_pages.iter().any(|p| p.page_number == page.page_number) {
            return Err(DomainError::conflict(format!(
                "Version '{}' already has page {}",
                page.version_id, page.page_number
            )));
        }

        version_pages.push(page.clone());
        Ok(page)
    }

    async fn find_by_id(&self, id: &PageId) -> Result<Option<DocumentPage>, DomainError> {
        let pages = self
            .pages
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(pages.values().flatten().find(|p| &p.id == id).cloned())
    }

    async fn update_layout(
        &self,
        id: &PageId,
        layout: Vec<LayoutField>,
    ) -> Result<(), DomainError> {
        let mut pages = self
            .pages
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let page = pages
            .values_mut()
            .flatten()
            .find(|p| &p.id == id)
            .ok_or_else(|| DomainError::not_found(format!("Page with id '{}' not found", id)))?;

        page.extracted_layout = Some(layout);
        Ok(())
    }

    async fn list_for_version(
        &self,
        version_id: &VersionId,
    ) -> Result<Vec<DocumentPage>, DomainError> {
        let pages = self
            .pages
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let mut result = pages.get(version_id).cloned().unwrap_or_default();
        result.sort_by_key(|p| p.page_number);
        Ok(result)
    }
}
