//! Prometheus metrics for the ingestion pipeline

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;
use crate::domain::DomainError;

/// Installs the Prometheus recorder and its scrape listener
pub fn init_metrics(config: &MetricsConfig) -> Result<(), DomainError> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return Ok(());
    }

    let addr: SocketAddr = config.listen_addr.parse().map_err(|e| {
        DomainError::configuration(format!(
            "Invalid metrics listen address '{}': {}",
            config.listen_addr, e
        ))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            DomainError::configuration(format!("Failed to install Prometheus exporter: {}", e))
        })?;

    gauge!("ingestion_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::info!(listen_addr = %addr, "Prometheus metrics initialized");

    Ok(())
}

/// Records the outcome of one processed page
pub fn record_page(outcome: &str) {
    counter!("ingestion_pages_total", "outcome" => outcome.to_string()).increment(1);
}

/// Records one verification attempt
pub fn record_verification_attempt(result: &'static str) {
    counter!("ingestion_verification_attempts_total", "result" => result).increment(1);
}

/// Records a document finishing with the given status
pub fn record_document(status: &str) {
    counter!("ingestion_documents_total", "status" => status.to_string()).increment(1);
}

/// Records a job reaching a terminal status
pub fn record_job(kind: &str, status: &str, duration: Duration) {
    let labels = [("kind", kind.to_string()), ("status", status.to_string())];

    counter!("ingestion_jobs_total", &labels).increment(1);
    histogram!("ingestion_job_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Tracks the number of queued jobs
pub fn set_queue_depth(depth: usize) {
    gauge!("ingestion_queue_depth").set(depth as f64);
}
