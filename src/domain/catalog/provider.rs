//! Group configuration collaborator

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{DocumentTypeId, DocumentTypeSpec, FieldSpec};
use super::snapshot::CatalogSnapshot;
use crate::domain::document::GroupId;
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Read access to document type and field configuration
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync + Debug {
    /// Document types configured for a group, in configured order
    async fn group_document_types(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<DocumentTypeSpec>, DomainError>;

    /// The global document type catalog
    async fn global_document_types(&self) -> Result<Vec<DocumentTypeSpec>, DomainError>;

    /// Looks up a single document type
    async fn document_type(
        &self,
        id: &DocumentTypeId,
    ) -> Result<Option<DocumentTypeSpec>, DomainError>;

    /// Field specs configured for a type within a group
    async fn group_field_specs(
        &self,
        group_id: &GroupId,
        document_type_id: &DocumentTypeId,
    ) -> Result<Vec<FieldSpec>, DomainError>;

    /// Field specs configured globally for a type
    async fn global_field_specs(
        &self,
        document_type_id: &DocumentTypeId,
    ) -> Result<Vec<FieldSpec>, DomainError>;
}

/// Resolves the active catalog for a group, falling back to the global one
pub async fn resolve_snapshot(
    provider: &dyn CatalogProvider,
    group_id: &GroupId,
) -> Result<CatalogSnapshot, DomainError> {
    let group_types = provider.group_document_types(group_id).await?;

    if !group_types.is_empty() {
        return Ok(CatalogSnapshot::from_group(group_types));
    }

    let global = provider.global_document_types().await?;
    Ok(CatalogSnapshot::from_global(global))
}

/// Required field specs for a type in a group, falling back to the global specs
pub async fn required_field_specs(
    provider: &dyn CatalogProvider,
    group_id: &GroupId,
    document_type_id: &DocumentTypeId,
) -> Result<Vec<FieldSpec>, DomainError> {
    let mut specs = provider.group_field_specs(group_id, document_type_id).await?;

    if specs.is_empty() {
        specs = provider.global_field_specs(document_type_id).await?;
    }

    Ok(specs.into_iter().filter(|s| s.required).collect())
}
