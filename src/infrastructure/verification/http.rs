//! HTTP client for the identifier verification authority

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::domain::verification::{
    NationalIdentifier, VerificationError, VerificationResponse, VerificationService,
};
use crate::infrastructure::http_client::endpoint;

const VERIFY_PATH: &str = "/verify";

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    number: &'a str,
    check_digit: String,
}

/// Verification client.
///
/// A 2xx answer verifies the identifier. 400, 404 and 422 are structured
/// rejections. Any other status and every transport failure is an error the
/// caller may retry.
#[derive(Debug, Clone)]
pub struct HttpVerificationService {
    client: Client,
    url: String,
}

impl HttpVerificationService {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, VERIFY_PATH),
        }
    }
}

fn is_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY
    )
}

fn rejection_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl VerificationService for HttpVerificationService {
    async fn verify(
        &self,
        identifier: &NationalIdentifier,
    ) -> Result<VerificationResponse, VerificationError> {
        let request = VerifyRequest {
            number: identifier.number(),
            check_digit: identifier.check_digit().to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VerificationError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VerificationError::Transport(e.to_string()))?;

        if status.is_success() {
            let payload = serde_json::from_str(&body)
                .map_err(|e| VerificationError::MalformedResponse(e.to_string()))?;
            return Ok(VerificationResponse::Verified(payload));
        }

        if is_rejection(status) {
            return Ok(VerificationResponse::Rejected {
                reason: rejection_reason(&body),
            });
        }

        Err(VerificationError::Transport(format!("HTTP {}: {}", status, body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identifier(raw: &str) -> NationalIdentifier {
        NationalIdentifier::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_verified_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(body_json(json!({"number": "9876543", "check_digit": "1"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "ACME SpA"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let service = HttpVerificationService::new(Client::new(), &server.uri());
        let response = service.verify(&identifier("9.876.543-1")).await.unwrap();

        assert_eq!(
            response,
            VerificationResponse::Verified(json!({"name": "ACME SpA"}))
        );
    }

    #[tokio::test]
    async fn test_structured_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"message": "check digit mismatch"})),
            )
            .mount(&server)
            .await;

        let service = HttpVerificationService::new(Client::new(), &server.uri());
        let response = service.verify(&identifier("12.345.678-K")).await.unwrap();

        assert_eq!(
            response,
            VerificationResponse::Rejected {
                reason: "check digit mismatch".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_server_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = HttpVerificationService::new(Client::new(), &server.uri());
        let error = service.verify(&identifier("12.345.678-K")).await.unwrap_err();

        assert!(matches!(error, VerificationError::Transport(_)));
    }

    #[tokio::test]
    async fn test_non_json_success_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let service = HttpVerificationService::new(Client::new(), &server.uri());
        let error = service.verify(&identifier("12.345.678-K")).await.unwrap_err();

        assert!(matches!(error, VerificationError::MalformedResponse(_)));
    }

    #[test]
    fn test_rejection_reason_falls_back_to_body() {
        assert_eq!(rejection_reason("  not found "), "not found");
        assert_eq!(rejection_reason(r#"{"message": "invalid"}"#), "invalid");
    }
}
