//! Migrate command - applies the PostgreSQL schema

use tracing::info;

use crate::infrastructure::storage::{Migrator, PostgresMigrator, connect, postgres_config};

/// Apply every pending migration
pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    let settings = postgres_config(&config.storage)?;
    let pool = connect(&settings).await?;

    let migrator = PostgresMigrator::new(pool);
    migrator.run().await?;

    info!(version = ?migrator.version().await?, "Database schema up to date");
    Ok(())
}
