//! Storage factory for runtime backend selection

use std::sync::Arc;

use tracing::info;

use crate::config::StorageSettings;
use crate::domain::DomainError;
use crate::domain::audit::AuditLogRepository;
use crate::domain::catalog::CatalogProvider;
use crate::domain::document::{DocumentRepository, PageRepository, VersionRepository};
use crate::domain::ingestion::ObservationRepository;
use crate::domain::semantic::SemanticIndexRepository;

use super::in_memory::{
    InMemoryAuditLog, InMemoryCatalog, InMemoryDocumentStore, InMemoryObservationStore,
    InMemorySemanticIndex,
};
use super::migrations::run_storage_migrations;
use super::postgres::{
    self, PostgresAuditLog, PostgresCatalog, PostgresConfig, PostgresDocumentRepository,
    PostgresObservationStore, PostgresPageRepository, PostgresSemanticIndex,
    PostgresVersionRepository,
};

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Every repository the pipeline needs, backed by one storage type
#[derive(Debug, Clone)]
pub struct Repositories {
    pub documents: Arc<dyn DocumentRepository>,
    pub versions: Arc<dyn VersionRepository>,
    pub pages: Arc<dyn PageRepository>,
    pub semantic: Arc<dyn SemanticIndexRepository>,
    pub audit: Arc<dyn AuditLogRepository>,
    pub observations: Arc<dyn ObservationRepository>,
    pub catalog: Arc<dyn CatalogProvider>,
}

impl Repositories {
    /// In-memory repositories around the given catalog
    pub fn in_memory(catalog: InMemoryCatalog) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());

        Self {
            documents: store.clone(),
            versions: store.clone(),
            pages: store,
            semantic: Arc::new(InMemorySemanticIndex::new()),
            audit: Arc::new(InMemoryAuditLog::new()),
            observations: Arc::new(InMemoryObservationStore::new()),
            catalog: Arc::new(catalog),
        }
    }

    /// PostgreSQL repositories sharing one pool
    pub async fn postgres(config: &PostgresConfig, migrate: bool) -> Result<Self, DomainError> {
        let pool = postgres::connect(config).await?;

        if migrate {
            run_storage_migrations(&pool).await?;
        }

        Ok(Self {
            documents: Arc::new(PostgresDocumentRepository::new(pool.clone())),
            versions: Arc::new(PostgresVersionRepository::new(pool.clone())),
            pages: Arc::new(PostgresPageRepository::new(pool.clone())),
            semantic: Arc::new(PostgresSemanticIndex::new(pool.clone())),
            audit: Arc::new(PostgresAuditLog::new(pool.clone())),
            observations: Arc::new(PostgresObservationStore::new(pool.clone())),
            catalog: Arc::new(PostgresCatalog::new(pool)),
        })
    }
}

/// Factory for creating repositories from configuration
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(settings: &StorageSettings) -> Result<Repositories, DomainError> {
        let storage_type = StorageType::from_str(&settings.backend).ok_or_else(|| {
            DomainError::configuration(format!("Unknown storage backend '{}'", settings.backend))
        })?;

        info!(backend = ?storage_type, "Initializing storage");

        match storage_type {
            StorageType::InMemory => {
                let catalog = match &settings.catalog_path {
                    Some(path) => InMemoryCatalog::load(path).await?,
                    None => InMemoryCatalog::new(),
                };
                Ok(Repositories::in_memory(catalog))
            }
            StorageType::Postgres => {
                let config = postgres_config(settings)?;
                Repositories::postgres(&config, settings.run_migrations).await
            }
        }
    }
}

/// Pool configuration for the postgres backend
pub fn postgres_config(settings: &StorageSettings) -> Result<PostgresConfig, DomainError> {
    let url = settings.database_url.as_deref().ok_or_else(|| {
        DomainError::configuration("storage.database_url is required for the postgres backend")
    })?;

    Ok(PostgresConfig::new(url).with_max_connections(settings.max_connections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{Document, GroupId, NewVersion};

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!(StorageType::from_str("memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("in-memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("postgres"), Some(StorageType::Postgres));
        assert_eq!(StorageType::from_str("PostgreSQL"), Some(StorageType::Postgres));
        assert_eq!(StorageType::from_str("pg"), Some(StorageType::Postgres));
        assert_eq!(StorageType::from_str("unknown"), None);
    }

    #[test]
    fn test_postgres_config_requires_url() {
        let settings = StorageSettings {
            backend: "postgres".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            postgres_config(&settings),
            Err(DomainError::Configuration { .. })
        ));

        let settings = StorageSettings {
            database_url: Some("postgres://db/docs".to_string()),
            max_connections: 4,
            ..settings
        };
        let config = postgres_config(&settings).unwrap();
        assert_eq!(config.url, "postgres://db/docs");
        assert_eq!(config.max_connections, 4);
    }

    #[tokio::test]
    async fn test_unknown_backend_is_rejected() {
        let settings = StorageSettings {
            backend: "cassandra".to_string(),
            ..Default::default()
        };

        let error = StorageFactory::create(&settings).await.unwrap_err();
        assert!(matches!(error, DomainError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_in_memory_repositories_share_one_store() {
        let repos = StorageFactory::create(&StorageSettings::default())
            .await
            .unwrap();

        let document = repos
            .documents
            .create(Document::new(GroupId::new("grp-1"), "contrato.pdf"))
            .await
            .unwrap();
        let version = repos
            .versions
            .create_current(
                document.id(),
                NewVersion::new("contrato.pdf", "grp-1/contrato.pdf", "ana"),
            )
            .await
            .unwrap();

        assert_eq!(version.version_number, 1);
        assert!(repos.pages.list_for_version(&version.id).await.unwrap().is_empty());
    }
}
