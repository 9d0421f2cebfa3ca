//! HTTP client for the field extraction service

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::Form;
use tracing::instrument;

use crate::domain::DomainError;
use crate::domain::extraction::{ExtractionRequest, ExtractionService};
use crate::infrastructure::http_client::{endpoint, file_part};

const SERVICE: &str = "extractor";
const EXTRACT_PATH: &str = "/procesar/";

/// Posts page images with their identifiers; the service writes the result
/// into the shared semantic index
#[derive(Debug, Clone)]
pub struct HttpExtractionService {
    client: Client,
    url: String,
}

impl HttpExtractionService {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, EXTRACT_PATH),
        }
    }
}

#[async_trait]
impl ExtractionService for HttpExtractionService {
    #[instrument(skip(self, request), fields(page_id = %request.page_id, page = request.page_number))]
    async fn extract(&self, request: &ExtractionRequest) -> Result<(), DomainError> {
        let form = Form::new()
            .part(
                "file",
                file_part(
                    SERVICE,
                    request.image.to_vec(),
                    &request.image_filename,
                    "image/png",
                )?,
            )
            .text("master_id", request.document_id.to_string())
            .text("version_id", request.version_id.to_string())
            .text("page_id", request.page_id.to_string())
            .text("group_id", request.group_id.to_string())
            .text("page", request.page_number.to_string());

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

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::domain::document::{DocumentId, GroupId, PageId, VersionId};

    fn request() -> ExtractionRequest {
        ExtractionRequest {
            group_id: GroupId::new("grp-1"),
            document_id: DocumentId::new("doc-1"),
            version_id: VersionId::new("ver-1"),
            page_id: PageId::new("page-1"),
            page_number: 3,
            image_filename: "contrato_p3.png".to_string(),
            image: Bytes::from_static(b"png"),
        }
    }

    #[tokio::test]
    async fn test_sends_identifiers_as_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/procesar/"))
            .and(body_string_contains("name=\"master_id\""))
            .and(body_string_contains("doc-1"))
            .and(body_string_contains("page-1"))
            .and(body_string_contains("contrato_p3.png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let service = HttpExtractionService::new(Client::new(), &server.uri());
        service.extract(&request()).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let service = HttpExtractionService::new(Client::new(), &server.uri());
        let error = service.extract(&request()).await.unwrap_err();

        assert!(error.to_string().contains("model crashed"));
    }
}
