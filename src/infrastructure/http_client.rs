//! Shared reqwest setup for the external services

use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::Part;

use crate::domain::DomainError;

/// Builds a client with a request timeout
pub fn build_client(timeout: Duration) -> Result<Client, DomainError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Joins a base URL and a path with exactly one slash between them
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Multipart file part with a filename and content type
pub fn file_part(
    service: &str,
    content: Vec<u8>,
    filename: &str,
    mime_type: &str,
) -> Result<Part, DomainError> {
    Part::bytes(content)
        .file_name(filename.to_string())
        .mime_str(mime_type)
        .map_err(|e| {
            DomainError::external_service(service, format!("Invalid mime type '{}': {}", mime_type, e))
        })
}
