//! Docflow ingestion worker
//!
//! Asynchronous document ingestion and versioning pipeline:
//! - Filename classification against per-group document type catalogs
//! - Page rendering and field extraction through external services
//! - Bounded-retry national identifier verification
//! - Versioned document history with exactly one current version
//! - Group required-field validation and an append-only audit trail

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use infrastructure::events::BroadcastEventPublisher;
use infrastructure::extraction::HttpExtractionService;
use infrastructure::files::{LocalPageImageStore, LocalSourceFileStore};
use infrastructure::http_client::build_client;
use infrastructure::rendering::HttpRenderService;
use infrastructure::services::{IngestionCoordinator, IngestionQueue, PipelineServices, QueueConfig};
use infrastructure::storage::{Repositories, StorageFactory};
use infrastructure::verification::HttpVerificationService;
use tracing::info;

/// A running pipeline: repositories, the job queue and its event stream
#[derive(Debug)]
pub struct Pipeline {
    pub repositories: Repositories,
    pub queue: IngestionQueue,
    pub events: Arc<BroadcastEventPublisher>,
}

/// Wires storage, external service clients and the worker pool from configuration
pub async fn build_pipeline(config: &AppConfig) -> anyhow::Result<Pipeline> {
    let repositories = StorageFactory::create(&config.storage).await?;
    let client = build_client(config.services.request_timeout())?;
    let events = Arc::new(BroadcastEventPublisher::default());

    let services = PipelineServices {
        renderer: Arc::new(HttpRenderService::new(
            client.clone(),
            &config.services.renderer_url,
        )),
        extractor: Arc::new(HttpExtractionService::new(
            client.clone(),
            &config.services.extractor_url,
        )),
        verifier: Arc::new(HttpVerificationService::new(
            client,
            &config.services.verifier_url,
        )),
        sources: Arc::new(LocalSourceFileStore::new(&config.pipeline.source_root)),
        images: Arc::new(LocalPageImageStore::new(&config.pipeline.page_root)),
        events: events.clone(),
    };

    let coordinator = IngestionCoordinator::new(
        &repositories,
        services,
        config.verification.retry_policy(),
        config.pipeline.identifier_labels.clone(),
    );
    let queue = IngestionQueue::start(
        Arc::new(coordinator),
        QueueConfig::from(&config.pipeline),
    );

    info!(
        backend = %config.storage.backend,
        workers = config.pipeline.workers,
        "Ingestion pipeline ready"
    );

    Ok(Pipeline {
        repositories,
        queue,
        events,
    })
}
