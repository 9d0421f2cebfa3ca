use std::time::Duration;

use serde::Deserialize;

use crate::domain::verification::{
    Backoff, DEFAULT_IDENTIFIER_LABELS, DEFAULT_MAX_ATTEMPTS, RetryPolicy, RetryPredicate,
    retry_all, retry_transport_only,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
    pub services: ServicesConfig,
    pub pipeline: PipelineConfig,
    pub verification: VerificationConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    pub backend: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Apply pending schema migrations on startup
    pub run_migrations: bool,
    /// JSON catalog definition for the memory backend
    pub catalog_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub renderer_url: String,
    pub extractor_url: String,
    pub verifier_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Zero disables the per-job timeout
    pub job_timeout_secs: u64,
    pub source_root: String,
    pub page_root: String,
    pub identifier_labels: Vec<String>,
    /// Finished job records kept for status queries
    pub retained_jobs: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub jitter: bool,
    /// Zero disables the per-attempt timeout
    pub attempt_timeout_ms: u64,
    /// Retry only transport failures and timeouts instead of every error
    pub transport_errors_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            database_url: None,
            max_connections: 10,
            run_migrations: false,
            catalog_path: None,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            renderer_url: "http://localhost:8001".to_string(),
            extractor_url: "http://localhost:8002".to_string(),
            verifier_url: "http://localhost:8003".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
            job_timeout_secs: 0,
            source_root: "storage/sources".to_string(),
            page_root: "storage/pages".to_string(),
            identifier_labels: DEFAULT_IDENTIFIER_LABELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
            retained_jobs: 1024,
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::None,
            jitter: false,
            attempt_timeout_ms: 0,
            transport_errors_only: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "0.0.0.0:9100".to_string(),
        }
    }
}

impl ServicesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PipelineConfig {
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}

impl VerificationConfig {
    /// Builds the retry policy used by the identifier verifier
    pub fn retry_policy(&self) -> RetryPolicy {
        let attempt_timeout = (self.attempt_timeout_ms > 0)
            .then(|| Duration::from_millis(self.attempt_timeout_ms));
        let retryable: RetryPredicate = if self.transport_errors_only {
            retry_transport_only
        } else {
            retry_all
        };

        RetryPolicy::new(self.max_attempts)
            .with_backoff(self.backoff)
            .with_jitter(self.jitter)
            .with_attempt_timeout(attempt_timeout)
            .with_retryable(retryable)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("pipeline.identifier_labels")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.verification.max_attempts, 10);
        assert_eq!(config.pipeline.identifier_labels.len(), 4);
        assert!(config.pipeline.job_timeout().is_none());
    }

    #[test]
    fn test_default_retry_policy_has_no_backoff() {
        let policy = VerificationConfig::default().retry_policy();

        assert_eq!(policy.max_attempts(), 10);
        assert_eq!(policy.backoff(), Backoff::None);
        assert!(policy.attempt_timeout().is_none());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [verification]
                max_attempts = 3
                attempt_timeout_ms = 250

                [verification.backoff]
                kind = "fixed"
                delay_ms = 100
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: AppConfig = config.try_deserialize().unwrap();

        let policy = config.verification.retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff(), Backoff::Fixed { delay_ms: 100 });
        assert_eq!(policy.attempt_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.logging.level, "info");
    }
}
