//! PostgreSQL document repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::decode_error;
use crate::domain::DomainError;
use crate::domain::catalog::DocumentTypeId;
use crate::domain::document::{Document, DocumentId, DocumentRepository, DocumentStatus, GroupId};

#[derive(Debug, Clone)]
pub struct PostgresDocumentRepository {
    pool: PgPool,
}

impl PostgresDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &PgRow) -> Result<Document, DomainError> {
    let decode = decode_error("document");

    let status: String = row.try_get("status").map_err(&decode)?;
    let classified_type: Option<String> = row.try_get("classified_type_id").map_err(&decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(&decode)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(&decode)?;

    Ok(Document::restore(
        DocumentId::new(row.try_get::<String, _>("id").map_err(&decode)?),
        GroupId::new(row.try_get::<String, _>("group_id").map_err(&decode)?),
        row.try_get("name").map_err(&decode)?,
        classified_type.map(DocumentTypeId::new),
        status.parse::<DocumentStatus>()?,
        created_at,
        updated_at,
    ))
}

#[async_trait]
impl DocumentRepository for PostgresDocumentRepository {
    async fn create(&self, document: Document) -> Result<Document, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, group_id, name, classified_type_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(document.id().as_str())
        .bind(document.group_id().as_str())
        .bind(document.name())
        .bind(document.classified_type().map(|t| t.as_str()))
        .bind(document.status().as_str())
        .bind(document.created_at())
        .bind(document.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DomainError::conflict(format!(
                    "Document with id '{}' already exists",
                    document.id()
                ));
            }
            DomainError::storage(format!("Failed to create document: {}", e))
        })?;

        Ok(document)
    }

    async fn update(&self, document: Document) -> Result<Document, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET name = $2, classified_type_id = $3, status = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(document.id().as_str())
        .bind(document.name())
        .bind(document.classified_type().map(|t| t.as_str()))
        .bind(document.status().as_str())
        .bind(document.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update document: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Document with id '{}' not found",
                document.id()
            )));
        }

        Ok(document)
    }

    async fn set_status_if(
        &self,
        id: &DocumentId,
        from: &[DocumentStatus],
        to: DocumentStatus,
    ) -> Result<bool, DomainError> {
        let from: Vec<&str> = from.iter().map(|s| s.as_str()).collect();

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            "#,
        )
        .bind(id.as_str())
        .bind(&from)
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update document status: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, group_id, name, classified_type_id, status, created_at, updated_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get document: {}", e)))?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn list_by_group(&self, group_id: &GroupId) -> Result<Vec<Document>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, group_id, name, classified_type_id, status, created_at, updated_at
            FROM documents
            WHERE group_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(group_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list documents: {}", e)))?;

        rows.iter().map(row_to_document).collect()
    }
}
