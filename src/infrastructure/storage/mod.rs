//! Storage infrastructure - Repository implementations

mod factory;
mod in_memory;
pub mod migrations;
mod postgres;

pub use factory::{Repositories, StorageFactory, StorageType, postgres_config};
pub use in_memory::{
    CatalogDefinition, GroupCatalog, InMemoryAuditLog, InMemoryCatalog, InMemoryDocumentStore,
    InMemoryObservationStore, InMemorySemanticIndex,
};
pub use migrations::{Migration, Migrator, PostgresMigrator, run_storage_migrations};
pub use postgres::{
    PostgresAuditLog, PostgresCatalog, PostgresConfig, PostgresDocumentRepository,
    PostgresObservationStore, PostgresPageRepository, PostgresSemanticIndex,
    PostgresVersionRepository, connect,
};
