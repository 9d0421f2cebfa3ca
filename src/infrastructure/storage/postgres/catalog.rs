//! PostgreSQL catalog provider

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::decode_error;
use crate::domain::DomainError;
use crate::domain::catalog::{CatalogProvider, DocumentTypeId, DocumentTypeSpec, FieldSpec};
use crate::domain::document::GroupId;

#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_type(row: &PgRow) -> Result<DocumentTypeSpec, DomainError> {
    let decode = decode_error("document type");

    Ok(DocumentTypeSpec::new(
        DocumentTypeId::new(row.try_get::<String, _>("id").map_err(&decode)?),
        row.try_get::<String, _>("name").map_err(&decode)?,
    )
    .with_required(row.try_get("required").map_err(&decode)?)
    .with_analyze(row.try_get("analyze").map_err(&decode)?))
}

fn row_to_field(row: &PgRow) -> Result<FieldSpec, DomainError> {
    let decode = decode_error("field spec");

    Ok(FieldSpec {
        field_key: row.try_get("field_key").map_err(&decode)?,
        label: row.try_get("label").map_err(&decode)?,
        datatype: row.try_get("datatype").map_err(&decode)?,
        pattern: row.try_get("pattern").map_err(&decode)?,
        required: row.try_get("is_required").map_err(&decode)?,
    })
}

#[async_trait]
impl CatalogProvider for PostgresCatalog {
    async fn group_document_types(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<DocumentTypeSpec>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, g.required, COALESCE(g.analyze, t.analyze) AS analyze
            FROM group_document_types g
            JOIN document_types t ON t.id = g.document_type_id
            WHERE g.group_id = $1
            ORDER BY g.position, t.id
            "#,
        )
        .bind(group_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list group document types: {}", e)))?;

        rows.iter().map(row_to_type).collect()
    }

    async fn global_document_types(&self) -> Result<Vec<DocumentTypeSpec>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, TRUE AS required, analyze
            FROM document_types
            ORDER BY position, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list document types: {}", e)))?;

        rows.iter().map(row_to_type).collect()
    }

    async fn document_type(
        &self,
        id: &DocumentTypeId,
    ) -> Result<Option<DocumentTypeSpec>, DomainError> {
        let row = sqlx::query(
            "SELECT id, name, TRUE AS required, analyze FROM document_types WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get document type: {}", e)))?;

        row.as_ref().map(row_to_type).transpose()
    }

    async fn group_field_specs(
        &self,
        group_id: &GroupId,
        document_type_id: &DocumentTypeId,
    ) -> Result<Vec<FieldSpec>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT field_key, label, datatype, pattern, is_required
            FROM group_field_specs
            WHERE group_id = $1 AND document_type_id = $2
            ORDER BY position, field_key
            "#,
        )
        .bind(group_id.as_str())
        .bind(document_type_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list group field specs: {}", e)))?;

        rows.iter().map(row_to_field).collect()
    }

    async fn global_field_specs(
        &self,
        document_type_id: &DocumentTypeId,
    ) -> Result<Vec<FieldSpec>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT field_key, label, datatype, pattern, is_required
            FROM document_field_specs
            WHERE document_type_id = $1
            ORDER BY position, field_key
            "#,
        )
        .bind(document_type_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list field specs: {}", e)))?;

        rows.iter().map(row_to_field).collect()
    }
}
