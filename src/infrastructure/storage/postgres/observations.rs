//! PostgreSQL validation issue store

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::decode_error;
use crate::domain::DomainError;
use crate::domain::catalog::DocumentTypeId;
use crate::domain::document::{DocumentId, GroupId, VersionId};
use crate::domain::ingestion::{
    FieldIssue, IssueKind, ObservationId, ObservationRecord, ObservationRepository,
};

#[derive(Debug, Clone)]
pub struct PostgresObservationStore {
    pool: PgPool,
}

impl PostgresObservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &PgRow) -> Result<ObservationRecord, DomainError> {
    let decode = decode_error("observation");

    let kind: String = row.try_get("issue_type").map_err(&decode)?;
    let version_id: Option<String> = row.try_get("version_id").map_err(&decode)?;

    Ok(ObservationRecord {
        id: ObservationId::new(row.try_get::<String, _>("id").map_err(&decode)?),
        group_id: GroupId::new(row.try_get::<String, _>("group_id").map_err(&decode)?),
        document_id: DocumentId::new(row.try_get::<String, _>("document_id").map_err(&decode)?),
        version_id: version_id.map(VersionId::new),
        document_type_id: DocumentTypeId::new(
            row.try_get::<String, _>("document_type_id").map_err(&decode)?,
        ),
        issue: FieldIssue {
            kind: IssueKind::parse(&kind)?,
            field_key: row.try_get("field_key").map_err(&decode)?,
            label: row.try_get("label").map_err(&decode)?,
            message: row.try_get("message").map_err(&decode)?,
        },
        recorded_at: row.try_get("recorded_at").map_err(&decode)?,
    })
}

#[async_trait]
impl ObservationRepository for PostgresObservationStore {
    async fn append_all(&self, records: Vec<ObservationRecord>) -> Result<usize, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        let mut appended = 0;
        for record in &records {
            let result = sqlx::query(
                r#"
                INSERT INTO document_observations
                    (id, group_id, document_id, version_id, document_type_id, issue_type, field_key, label, message, recorded_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(record.id.as_str())
            .bind(record.group_id.as_str())
            .bind(record.document_id.as_str())
            .bind(record.version_id.as_ref().map(|v| v.as_str()))
            .bind(record.document_type_id.as_str())
            .bind(record.issue.kind.as_str())
            .bind(&record.issue.field_key)
            .bind(&record.issue.label)
            .bind(&record.issue.message)
            .bind(record.recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to append observation: {}", e)))?;

            appended += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit observations: {}", e)))?;

        Ok(appended)
    }

    async fn list_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<ObservationRecord>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, group_id, document_id, version_id, document_type_id, issue_type, field_key, label, message, recorded_at
            FROM document_observations
            WHERE document_id = $1
            ORDER BY recorded_at, id
            "#,
        )
        .bind(document_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list observations: {}", e)))?;

        rows.iter().map(row_to_record).collect()
    }
}
