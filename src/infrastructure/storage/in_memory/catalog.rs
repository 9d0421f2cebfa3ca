//! In-memory catalog provider, optionally loaded from a JSON definition

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::DomainError;
use crate::domain::catalog::{CatalogProvider, DocumentTypeId, DocumentTypeSpec, FieldSpec};
use crate::domain::document::GroupId;

/// Group section of a catalog definition
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupCatalog {
    pub types: Vec<DocumentTypeSpec>,
    pub fields: HashMap<DocumentTypeId, Vec<FieldSpec>>,
}

/// Catalog configuration as stored on disk
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogDefinition {
    pub global_types: Vec<DocumentTypeSpec>,
    pub global_fields: HashMap<DocumentTypeId, Vec<FieldSpec>>,
    pub groups: HashMap<GroupId, GroupCatalog>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    definition: CatalogDefinition,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definition(definition: CatalogDefinition) -> Self {
        Self { definition }
    }

    /// Loads a JSON catalog definition
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read catalog '{}': {}",
                path.display(),
                e
            ))
        })?;

        let definition = serde_json::from_str(&raw).map_err(|e| {
            DomainError::configuration(format!(
                "Invalid catalog '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self::from_definition(definition))
    }

    pub fn with_global_types(mut self, types: Vec<DocumentTypeSpec>) -> Self {
        self.definition.global_types = types;
        self
    }

    pub fn with_group_types(mut self, group_id: GroupId, types: Vec<DocumentTypeSpec>) -> Self {
        self.definition.groups.entry(group_id).or_default().types = types;
        self
    }

    pub fn with_group_fields(
        mut self,
        group_id: GroupId,
        document_type_id: DocumentTypeId,
        fields: Vec<FieldSpec>,
    ) -> Self {
        self.definition
            .groups
            .entry(group_id)
            .or_default()
            .fields
            .insert(document_type_id, fields);
        self
    }

    pub fn with_global_fields(
        mut self,
        document_type_id: DocumentTypeId,
        fields: Vec<FieldSpec>,
    ) -> Self {
        self.definition.global_fields.insert(document_type_id, fields);
        self
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn group_document_types(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<DocumentTypeSpec>, DomainError> {
        Ok(self
            .definition
            .groups
            .get(group_id)
            .map(|g| g.types.clone())
            .unwrap_or_default())
    }

    async fn global_document_types(&self) -> Result<Vec<DocumentTypeSpec>, DomainError> {
        Ok(self.definition.global_types.clone())
    }

    async fn document_type(
        &self,
        id: &DocumentTypeId,
    ) -> Result<Option<DocumentTypeSpec>, DomainError> {
        let global = self.definition.global_types.iter();
        let grouped = self.definition.groups.values().flat_map(|g| g.types.iter());

        Ok(global.chain(grouped).find(|t| &t.id == id).cloned())
    }

    async fn group_field_specs(
        &self,
        group_id: &GroupId,
        document_type_id: &DocumentTypeId,
    ) -> Result<Vec<FieldSpec>, DomainError> {
        Ok(self
            .definition
            .groups
            .get(group_id)
            .and_then(|g| g.fields.get(document_type_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn global_field_specs(
        &self,
        document_type_id: &DocumentTypeId,
    ) -> Result<Vec<FieldSpec>, DomainError> {
        Ok(self
            .definition
            .global_fields
            .get(document_type_id)
            .cloned()
            .unwrap_or_default())
    }
}
