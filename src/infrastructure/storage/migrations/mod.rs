//! Database migrations infrastructure

use async_trait::async_trait;
use sqlx::Executor;
use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Trait for running database migrations
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Runs all pending migrations
    async fn run(&self) -> Result<(), DomainError>;

    /// Reverts the last migration
    async fn revert(&self) -> Result<(), DomainError>;

    /// Returns the current migration version
    async fn version(&self) -> Result<Option<i64>, DomainError>;
}

/// PostgreSQL migrator applying the embedded schema migrations
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
    migrations: Vec<Migration>,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            migrations: storage_migrations(),
        }
    }

    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                success BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))
    }

    /// Applies one migration and records it in a single transaction
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        if self.is_applied(migration.version).await? {
            return Ok(false);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        (&mut *tx)
            .execute(sqlx::raw_sql(&migration.up))
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit migration: {}", e)))?;

        info!(version = migration.version, description = %migration.description, "Applied migration");
        Ok(true)
    }

    /// Reverts one migration if it is applied
    pub async fn revert_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        if !self.is_applied(migration.version).await? {
            return Ok(false);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        (&mut *tx)
            .execute(sqlx::raw_sql(&migration.down))
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to revert migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("DELETE FROM _migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to remove migration record {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit revert: {}", e)))?;

        info!(version = migration.version, "Reverted migration");
        Ok(true)
    }

    /// Returns all applied migration versions
    pub async fn applied_versions(&self) -> Result<Vec<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT version FROM _migrations WHERE success = TRUE ORDER BY version")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get applied migrations: {}", e)))
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }
}

#[async_trait]
impl Migrator for PostgresMigrator {
    async fn run(&self) -> Result<(), DomainError> {
        for migration in &self.migrations {
            self.run_migration(migration).await?;
        }
        Ok(())
    }

    async fn revert(&self) -> Result<(), DomainError> {
        let Some(current) = self.version().await? else {
            return Ok(());
        };

        match self.migrations.iter().find(|m| m.version == current) {
            Some(migration) => {
                self.revert_migration(migration).await?;
                Ok(())
            }
            None => Err(DomainError::storage(format!(
                "Applied migration {} is unknown to this build",
                current
            ))),
        }
    }

    async fn version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations WHERE success = TRUE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// Represents a database migration
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
    /// SQL to run when reverting the migration
    pub down: String,
}

impl Migration {
    pub fn new(
        version: i64,
        description: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
            down: down.into(),
        }
    }
}

/// Schema of the ingestion store
pub fn storage_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create documents table",
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                name TEXT NOT NULL,
                classified_type_id TEXT,
                status VARCHAR(32) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_documents_group_id ON documents(group_id);
            "#,
            r#"
            DROP TABLE IF EXISTS documents;
            "#,
        ),
        Migration::new(
            2,
            "Create document versions table",
            r#"
            CREATE TABLE IF NOT EXISTS document_versions (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                version_number INTEGER NOT NULL,
                filename TEXT NOT NULL,
                filepath TEXT NOT NULL,
                mime_type VARCHAR(255) NOT NULL,
                file_size BIGINT NOT NULL DEFAULT 0,
                checksum_sha256 CHAR(64),
                is_current BOOLEAN NOT NULL DEFAULT FALSE,
                uploaded_by TEXT NOT NULL,
                comment TEXT,
                page_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (document_id, version_number)
            );
            CREATE UNIQUE INDEX IF NOT EXISTS ux_document_versions_current
                ON document_versions(document_id) WHERE is_current;
            "#,
            r#"
            DROP TABLE IF EXISTS document_versions;
            "#,
        ),
        Migration::new(
            3,
            "Create document pages table",
            r#"
            CREATE TABLE IF NOT EXISTS document_pages (
                id TEXT PRIMARY KEY,
                version_id TEXT NOT NULL REFERENCES document_versions(id) ON DELETE CASCADE,
                page_number INTEGER NOT NULL CHECK (page_number > 0),
                image_path TEXT NOT NULL,
                extracted_layout JSONB,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (version_id, page_number)
            );
            "#,
            r#"
            DROP TABLE IF EXISTS document_pages;
            "#,
        ),
        Migration::new(
            4,
            "Create semantic index table",
            r#"
            CREATE TABLE IF NOT EXISTS semantic_index (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                document_id TEXT,
                version_id TEXT NOT NULL,
                page_id TEXT,
                json_layout JSONB NOT NULL DEFAULT '[]'::jsonb,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE UNIQUE INDEX IF NOT EXISTS ux_semantic_index_page
                ON semantic_index(page_id) WHERE page_id IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS ux_semantic_index_document
                ON semantic_index(version_id) WHERE page_id IS NULL;
            CREATE INDEX IF NOT EXISTS idx_semantic_index_version ON semantic_index(version_id);
            "#,
            r#"
            DROP TABLE IF EXISTS semantic_index;
            "#,
        ),
        Migration::new(
            5,
            "Create document audit log table",
            r#"
            CREATE TABLE IF NOT EXISTS document_audit_logs (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                version_id TEXT,
                action VARCHAR(32) NOT NULL,
                actor TEXT NOT NULL,
                comment TEXT,
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_document_audit_logs_document
                ON document_audit_logs(document_id, recorded_at);
            "#,
            r#"
            DROP TABLE IF EXISTS document_audit_logs;
            "#,
        ),
        Migration::new(
            6,
            "Create document type catalog tables",
            r#"
            CREATE TABLE IF NOT EXISTS document_types (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                analyze BOOLEAN NOT NULL DEFAULT FALSE,
                position INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS group_document_types (
                group_id TEXT NOT NULL,
                document_type_id TEXT NOT NULL REFERENCES document_types(id) ON DELETE CASCADE,
                required BOOLEAN NOT NULL DEFAULT TRUE,
                analyze BOOLEAN,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (group_id, document_type_id)
            );
            CREATE TABLE IF NOT EXISTS document_field_specs (
                document_type_id TEXT NOT NULL REFERENCES document_types(id) ON DELETE CASCADE,
                field_key TEXT NOT NULL,
                label TEXT NOT NULL,
                datatype VARCHAR(64),
                pattern TEXT,
                is_required BOOLEAN NOT NULL DEFAULT TRUE,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (document_type_id, field_key)
            );
            CREATE TABLE IF NOT EXISTS group_field_specs (
                group_id TEXT NOT NULL,
                document_type_id TEXT NOT NULL REFERENCES document_types(id) ON DELETE CASCADE,
                field_key TEXT NOT NULL,
                label TEXT NOT NULL,
                datatype VARCHAR(64),
                pattern TEXT,
                is_required BOOLEAN NOT NULL DEFAULT TRUE,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (group_id, document_type_id, field_key)
            );
            "#,
            r#"
            DROP TABLE IF EXISTS group_field_specs;
            DROP TABLE IF EXISTS document_field_specs;
            DROP TABLE IF EXISTS group_document_types;
            DROP TABLE IF EXISTS document_types;
            "#,
        ),
        Migration::new(
            7,
            "Create document observations table",
            r#"
            CREATE TABLE IF NOT EXISTS document_observations (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                version_id TEXT,
                document_type_id TEXT NOT NULL,
                issue_type VARCHAR(32) NOT NULL,
                field_key TEXT NOT NULL,
                label TEXT NOT NULL,
                message TEXT NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE UNIQUE INDEX IF NOT EXISTS ux_document_observations_issue
                ON document_observations(document_id, COALESCE(version_id, ''), field_key, issue_type);
            "#,
            r#"
            DROP TABLE IF EXISTS document_observations;
            "#,
        ),
    ]
}

/// Runs all pending storage migrations
pub async fn run_storage_migrations(pool: &PgPool) -> Result<(), DomainError> {
    PostgresMigrator::new(pool.clone()).run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creation() {
        let migration = Migration::new(1, "Test migration", "CREATE TABLE test", "DROP TABLE test");

        assert_eq!(migration.version, 1);
        assert_eq!(migration.description, "Test migration");
        assert_eq!(migration.up, "CREATE TABLE test");
        assert_eq!(migration.down, "DROP TABLE test");
    }

    #[test]
    fn test_storage_migrations_order() {
        let migrations = storage_migrations();

        assert!(!migrations.is_empty());
        for pair in migrations.windows(2) {
            assert!(
                pair[1].version > pair[0].version,
                "Migrations should be in ascending order"
            );
        }
    }

    #[test]
    fn test_current_version_uniqueness_is_enforced_by_schema() {
        let migrations = storage_migrations();
        let versions = migrations
            .iter()
            .find(|m| m.up.contains("CREATE TABLE IF NOT EXISTS document_versions"))
            .unwrap();

        assert!(versions.up.contains("WHERE is_current"));
        assert!(versions.up.contains("UNIQUE (document_id, version_number)"));
    }

    #[test]
    fn test_observations_are_deduplicated_by_schema() {
        let migrations = storage_migrations();
        let observations = migrations
            .iter()
            .find(|m| m.up.contains("CREATE TABLE IF NOT EXISTS document_observations"))
            .unwrap();

        assert!(observations.up.contains("CREATE UNIQUE INDEX"));
        assert!(observations.up.contains("field_key, issue_type"));
    }

    #[test]
    fn test_storage_migrations_content() {
        for migration in storage_migrations() {
            assert!(!migration.description.is_empty());
            assert!(!migration.up.trim().is_empty());
            assert!(!migration.down.trim().is_empty());
        }
    }
}
