//! PostgreSQL audit log

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;

use super::decode_error;
use crate::domain::DomainError;
use crate::domain::audit::{AuditAction, AuditEntryId, AuditLogEntry, AuditLogRepository};
use crate::domain::document::{DocumentId, VersionId};

#[derive(Debug, Clone)]
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &PgRow) -> Result<AuditLogEntry, DomainError> {
    let decode = decode_error("audit log");

    let action: String = row.try_get("action").map_err(&decode)?;
    let version_id: Option<String> = row.try_get("version_id").map_err(&decode)?;
    let metadata: Json<serde_json::Value> = row.try_get("metadata").map_err(&decode)?;

    Ok(AuditLogEntry {
        id: AuditEntryId::new(row.try_get::<String, _>("id").map_err(&decode)?),
        document_id: DocumentId::new(row.try_get::<String, _>("document_id").map_err(&decode)?),
        version_id: version_id.map(VersionId::new),
        action: AuditAction::parse(&action)?,
        actor: row.try_get("actor").map_err(&decode)?,
        comment: row.try_get("comment").map_err(&decode)?,
        metadata: metadata.0,
        recorded_at: row.try_get("recorded_at").map_err(&decode)?,
    })
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLog {
    async fn append(&self, entry: AuditLogEntry) -> Result<AuditLogEntry, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO document_audit_logs (id, document_id, version_id, action, actor, comment, metadata, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_str())
        .bind(entry.document_id.as_str())
        .bind(entry.version_id.as_ref().map(|v| v.as_str()))
        .bind(entry.action.as_str())
        .bind(&entry.actor)
        .bind(&entry.comment)
        .bind(Json(&entry.metadata))
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to append audit entry: {}", e)))?;

        Ok(entry)
    }

    async fn list_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<AuditLogEntry>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, version_id, action, actor, comment, metadata, recorded_at
            FROM document_audit_logs
            WHERE document_id = $1
            ORDER BY recorded_at
            "#,
        )
        .bind(document_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list audit entries: {}", e)))?;

        rows.iter().map(row_to_entry).collect()
    }
}
