//! PostgreSQL page repository

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;

use super::decode_error;
use crate::domain::DomainError;
use crate::domain::document::{DocumentPage, PageId, PageRepository, VersionId};
use crate::domain::semantic::LayoutField;

#[derive(Debug, Clone)]
pub struct PostgresPageRepository {
    pool: PgPool,
}

impl PostgresPageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_page(row: &PgRow) -> Result<DocumentPage, DomainError> {
    let decode = decode_error("document page");

    let page_number: i32 = row.try_get("page_number").map_err(&decode)?;
    let layout: Option<Json<Vec<LayoutField>>> =
        row.try_get("extracted_layout").map_err(&decode)?;

    Ok(DocumentPage {
        id: PageId::new(row.try_get::<String, _>("id").map_err(&decode)?),
        version_id: VersionId::new(row.try_get::<String, _>("version_id").map_err(&decode)?),
        page_number: page_number.max(0) as u32,
        image_path: row.try_get("image_path").map_err(&decode)?,
        extracted_layout: layout.map(|l| l.0),
        created_at: row.try_get("created_at").map_err(&decode)?,
    })
}

#[async_trait]
impl PageRepository for PostgresPageRepository {
    async fn create(&self, page: DocumentPage) -> Result<DocumentPage, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO document_pages (id, version_id, page_number, image_path, extracted_layout, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(page.id.as_str())
        .bind(page.version_id.as_str())
        .bind(page.page_number as i32)
        .bind(&page.image_path)
        .bind(page.extracted_layout.as_ref().map(Json))
        .bind(page.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DomainError::conflict(format!(
                    "Page {} already exists for version '{}'",
                    page.page_number, page.version_id
                ));
            }
            DomainError::storage(format!("Failed to create page: {}", e))
        })?;

        Ok(page)
    }

    async fn find_by_id(&self, id: &PageId) -> Result<Option<DocumentPage>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, version_id, page_number, image_path, extracted_layout, created_at
            FROM document_pages
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get page: {}", e)))?;

        row.as_ref().map(row_to_page).transpose()
    }

    async fn update_layout(
        &self,
        id: &PageId,
        layout: Vec<LayoutField>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE document_pages SET extracted_layout = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(Json(layout))
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to update page layout: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Page with id '{}' not found",
                id
            )));
        }

        Ok(())
    }

    async fn list_for_version(
        &self,
        version_id: &VersionId,
    ) -> Result<Vec<DocumentPage>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, version_id, page_number, image_path, extracted_layout, created_at
            FROM document_pages
            WHERE version_id = $1
            ORDER BY page_number
            "#,
        )
        .bind(version_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list pages: {}", e)))?;

        rows.iter().map(row_to_page).collect()
    }
}
