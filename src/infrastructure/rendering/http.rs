//! HTTP client for the PDF rendering service

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::Form;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::DomainError;
use crate::domain::rendering::{RenderService, RenderedPayload, SourceDocument};
use crate::infrastructure::http_client::{endpoint, file_part};

const SERVICE: &str = "renderer";
const RENDER_PATH: &str = "/pdf_to_images/";

#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    images: Vec<RenderedPayload>,
    #[serde(default)]
    error: Option<String>,
}

/// Posts source files as multipart uploads and returns the rendered pages
#[derive(Debug, Clone)]
pub struct HttpRenderService {
    client: Client,
    url: String,
}

impl HttpRenderService {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, RENDER_PATH),
        }
    }
}

#[async_trait]
impl RenderService for HttpRenderService {
    #[instrument(skip(self, source), fields(filename = %source.filename))]
    async fn render(&self, source: &SourceDocument) -> Result<Vec<RenderedPayload>, DomainError> {
        let form = Form::new().part(
            "file",
            file_part(
                SERVICE,
                source.content.to_vec(),
                &source.filename,
                &source.mime_type,
            )?,
        );

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DomainError::external_service(SERVICE, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::external_service(
                SERVICE,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let body: RenderResponse = response.json().await.map_err(|e| {
            DomainError::external_service(SERVICE, format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = body.error {
            return Err(DomainError::external_service(SERVICE, error));
        }

        debug!(pages = body.images.len(), "Rendering finished");
        Ok(body.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source() -> SourceDocument {
        SourceDocument::new("contrato.pdf", "application/pdf", Bytes::from_static(b"%PDF-1.4"))
    }

    #[tokio::test]
    async fn test_returns_rendered_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pdf_to_images/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [
                    {"filename": "contrato_p1.png", "content_base64": "cGFnZSAx"},
                    {"filename": "contrato_p2.png", "content_base64": "cGFnZSAy"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = HttpRenderService::new(Client::new(), &server.uri());
        let images = service.render(&source()).await.unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[1].filename, "contrato_p2.png");
    }

    #[tokio::test]
    async fn test_error_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pdf_to_images/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "encrypted pdf"})),
            )
            .mount(&server)
            .await;

        let service = HttpRenderService::new(Client::new(), &server.uri());
        let error = service.render(&source()).await.unwrap_err();

        assert!(error.to_string().contains("encrypted pdf"));
    }

    #[tokio::test]
    async fn test_server_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let service = HttpRenderService::new(Client::new(), &server.uri());
        let error = service.render(&source()).await.unwrap_err();

        assert!(error.is_external());
    }

    #[tokio::test]
    async fn test_empty_image_list_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": []})))
            .mount(&server)
            .await;

        let service = HttpRenderService::new(Client::new(), &server.uri());
        assert!(service.render(&source()).await.unwrap().is_empty());
    }
}
