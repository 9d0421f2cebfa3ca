//! PostgreSQL semantic index

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;

use super::decode_error;
use crate::domain::DomainError;
use crate::domain::document::{DocumentId, GroupId, PageId, VersionId};
use crate::domain::semantic::{
    LayoutField, RecordId, SemanticIndexRecord, SemanticIndexRepository,
};

const RECORD_COLUMNS: &str = "id, group_id, document_id, version_id, page_id, json_layout, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresSemanticIndex {
    pool: PgPool,
}

impl PostgresSemanticIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &PgRow) -> Result<SemanticIndexRecord, DomainError> {
    let decode = decode_error("semantic index");

    let document_id: Option<String> = row.try_get("document_id").map_err(&decode)?;
    let page_id: Option<String> = row.try_get("page_id").map_err(&decode)?;
    let fields: Json<Vec<LayoutField>> = row.try_get("json_layout").map_err(&decode)?;

    Ok(SemanticIndexRecord {
        id: RecordId::new(row.try_get::<String, _>("id").map_err(&decode)?),
        group_id: GroupId::new(row.try_get::<String, _>("group_id").map_err(&decode)?),
        document_id: document_id.map(DocumentId::new),
        version_id: VersionId::new(row.try_get::<String, _>("version_id").map_err(&decode)?),
        page_id: page_id.map(PageId::new),
        fields: fields.0,
        updated_at: row.try_get("updated_at").map_err(&decode)?,
    })
}

#[async_trait]
impl SemanticIndexRepository for PostgresSemanticIndex {
    async fn find_by_page(
        &self,
        page_id: &PageId,
    ) -> Result<Option<SemanticIndexRecord>, DomainError> {
        let query = format!("SELECT {} FROM semantic_index WHERE page_id = $1", RECORD_COLUMNS);

        let row = sqlx::query(&query)
            .bind(page_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get page record: {}", e)))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_document_record(
        &self,
        version_id: &VersionId,
    ) -> Result<Option<SemanticIndexRecord>, DomainError> {
        let query = format!(
            "SELECT {} FROM semantic_index WHERE version_id = $1 AND page_id IS NULL",
            RECORD_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(version_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get document record: {}", e)))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn insert_if_absent(&self, record: SemanticIndexRecord) -> Result<bool, DomainError> {
        // Partial unique indexes on page_id and on document-scope version_id
        // turn a duplicate scope into a no-op
        let result = sqlx::query(
            r#"
            INSERT INTO semantic_index (id, group_id, document_id, version_id, page_id, json_layout, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(record.id.as_str())
        .bind(record.group_id.as_str())
        .bind(record.document_id.as_ref().map(|d| d.as_str()))
        .bind(record.version_id.as_str())
        .bind(record.page_id.as_ref().map(|p| p.as_str()))
        .bind(Json(&record.fields))
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to insert semantic record: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update(&self, record: SemanticIndexRecord) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE semantic_index
            SET document_id = $2, json_layout = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(record.id.as_str())
        .bind(record.document_id.as_ref().map(|d| d.as_str()))
        .bind(Json(&record.fields))
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update semantic record: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Semantic record with id '{}' not found",
                record.id
            )));
        }

        Ok(())
    }

    async fn list_page_records(
        &self,
        version_id: &VersionId,
    ) -> Result<Vec<SemanticIndexRecord>, DomainError> {
        let query = format!(
            r#"
            SELECT {} FROM semantic_index
            WHERE version_id = $1 AND page_id IS NOT NULL
            ORDER BY updated_at
            "#,
            RECORD_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(version_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list page records: {}", e)))?;

        rows.iter().map(row_to_record).collect()
    }
}
