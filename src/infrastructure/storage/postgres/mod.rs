//! PostgreSQL repositories sharing one connection pool

mod audit;
mod catalog;
mod documents;
mod observations;
mod pages;
mod semantic;
mod versions;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::domain::DomainError;

pub use audit::PostgresAuditLog;
pub use catalog::PostgresCatalog;
pub use documents::PostgresDocumentRepository;
pub use observations::PostgresObservationStore;
pub use pages::PostgresPageRepository;
pub use semantic::PostgresSemanticIndex;
pub use versions::PostgresVersionRepository;

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/docflow".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// Opens a connection pool
pub async fn connect(config: &PostgresConfig) -> Result<PgPool, DomainError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))
}

/// Maps a row decoding error
pub(crate) fn decode_error(entity: &str) -> impl Fn(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::storage(format!("Failed to decode {} row: {}", entity, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = PostgresConfig::new("postgres://db/docs").with_max_connections(20);

        assert_eq!(config.url, "postgres://db/docs");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 1);
    }
}
