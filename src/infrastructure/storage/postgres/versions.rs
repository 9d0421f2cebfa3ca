//! PostgreSQL version repository

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::decode_error;
use crate::domain::DomainError;
use crate::domain::document::{
    DocumentId, DocumentVersion, NewVersion, VersionId, VersionRepository, next_version_number,
};

const VERSION_COLUMNS: &str = "id, document_id, version_number, filename, filepath, mime_type, \
     file_size, checksum_sha256, is_current, uploaded_by, comment, page_count, created_at";

#[derive(Debug, Clone)]
pub struct PostgresVersionRepository {
    pool: PgPool,
}

impl PostgresVersionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_version(row: &PgRow) -> Result<DocumentVersion, DomainError> {
    let decode = decode_error("document version");

    let version_number: i32 = row.try_get("version_number").map_err(&decode)?;
    let file_size: i64 = row.try_get("file_size").map_err(&decode)?;
    let page_count: i32 = row.try_get("page_count").map_err(&decode)?;

    Ok(DocumentVersion {
        id: VersionId::new(row.try_get::<String, _>("id").map_err(&decode)?),
        document_id: DocumentId::new(row.try_get::<String, _>("document_id").map_err(&decode)?),
        version_number: version_number.max(0) as u32,
        filename: row.try_get("filename").map_err(&decode)?,
        filepath: row.try_get("filepath").map_err(&decode)?,
        mime_type: row.try_get("mime_type").map_err(&decode)?,
        file_size: file_size.max(0) as u64,
        checksum_sha256: row.try_get("checksum_sha256").map_err(&decode)?,
        is_current: row.try_get("is_current").map_err(&decode)?,
        uploaded_by: row.try_get("uploaded_by").map_err(&decode)?,
        comment: row.try_get("comment").map_err(&decode)?,
        page_count: page_count.max(0) as u32,
        created_at: row.try_get("created_at").map_err(&decode)?,
    })
}

#[async_trait]
impl VersionRepository for PostgresVersionRepository {
    async fn create_current(
        &self,
        document_id: &DocumentId,
        new_version: NewVersion,
    ) -> Result<DocumentVersion, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        // Row lock on the parent serializes concurrent uploads of one document
        let locked: Option<String> =
            sqlx::query_scalar("SELECT id FROM documents WHERE id = $1 FOR UPDATE")
                .bind(document_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to lock document: {}", e)))?;

        if locked.is_none() {
            return Err(DomainError::not_found(format!(
                "Document with id '{}' not found",
                document_id
            )));
        }

        let max_existing: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(version_number) FROM document_versions WHERE document_id = $1",
        )
        .bind(document_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to read version numbers: {}", e)))?;

        sqlx::query(
            "UPDATE document_versions SET is_current = FALSE WHERE document_id = $1 AND is_current",
        )
        .bind(document_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to supersede version: {}", e)))?;

        let number = next_version_number(max_existing.map(|n| n.max(0) as u32));
        let version = new_version.into_version(document_id.clone(), number);

        sqlx::query(
            r#"
            INSERT INTO document_versions (
                id, document_id, version_number, filename, filepath, mime_type,
                file_size, checksum_sha256, is_current, uploaded_by, comment, page_count, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(version.id.as_str())
        .bind(version.document_id.as_str())
        .bind(version.version_number as i32)
        .bind(&version.filename)
        .bind(&version.filepath)
        .bind(&version.mime_type)
        .bind(version.file_size as i64)
        .bind(&version.checksum_sha256)
        .bind(version.is_current)
        .bind(&version.uploaded_by)
        .bind(&version.comment)
        .bind(version.page_count as i32)
        .bind(version.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create version: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit version: {}", e)))?;

        Ok(version)
    }

    async fn find_by_id(&self, id: &VersionId) -> Result<Option<DocumentVersion>, DomainError> {
        let query = format!("SELECT {} FROM document_versions WHERE id = $1", VERSION_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get version: {}", e)))?;

        row.as_ref().map(row_to_version).transpose()
    }

    async fn find_current(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<DocumentVersion>, DomainError> {
        let query = format!(
            "SELECT {} FROM document_versions WHERE document_id = $1 AND is_current",
            VERSION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(document_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get current version: {}", e)))?;

        row.as_ref().map(row_to_version).transpose()
    }

    async fn list_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<DocumentVersion>, DomainError> {
        let query = format!(
            "SELECT {} FROM document_versions WHERE document_id = $1 ORDER BY version_number",
            VERSION_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(document_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list versions: {}", e)))?;

        rows.iter().map(row_to_version).collect()
    }

    async fn set_page_count(&self, id: &VersionId, page_count: u32) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE document_versions SET page_count = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(page_count as i32)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to update page count: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Version with id '{}' not found",
                id
            )));
        }

        Ok(())
    }
}
