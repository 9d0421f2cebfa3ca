//! Bounded-retry identifier verification

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::verification::{
    NationalIdentifier, RejectionReason, RetryPolicy, VerificationError, VerificationOutcome,
    VerificationResponse, VerificationService,
};
use crate::infrastructure::metrics;

/// Wraps the verification authority with the configured retry policy.
///
/// `verify` never fails: exhausted or non-retryable attempts come back as a
/// rejection carrying the reason.
#[derive(Debug, Clone)]
pub struct IdentifierVerifier {
    service: Arc<dyn VerificationService>,
    policy: RetryPolicy,
}

impl IdentifierVerifier {
    pub fn new(service: Arc<dyn VerificationService>) -> Self {
        Self {
            service,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[instrument(skip(self), fields(identifier = %identifier))]
    pub async fn verify(&self, identifier: &NationalIdentifier) -> VerificationOutcome {
        let max_attempts = self.policy.max_attempts();
        let mut last_error: Option<VerificationError> = None;

        for attempt in 1..=max_attempts {
            match self.attempt(identifier).await {
                Ok(VerificationResponse::Verified(payload)) => {
                    metrics::record_verification_attempt("verified");
                    debug!(attempt, "Identifier verified");
                    return VerificationOutcome::Verified {
                        attempts: attempt,
                        payload,
                    };
                }
                Ok(VerificationResponse::Rejected { reason }) => {
                    metrics::record_verification_attempt("rejected");
                    info!(attempt, reason = %reason, "Identifier rejected by authority");
                    return VerificationOutcome::Rejected {
                        attempts: attempt,
                        reason: RejectionReason::Authority(reason),
                    };
                }
                Err(error) => {
                    metrics::record_verification_attempt("error");

                    if !self.policy.is_retryable(&error) {
                        warn!(attempt, error = %error, "Verification error is not retryable");
                        return VerificationOutcome::Rejected {
                            attempts: attempt,
                            reason: RejectionReason::NotRetryable(error.to_string()),
                        };
                    }

                    warn!(attempt, max_attempts, error = %error, "Verification attempt failed");
                    last_error = Some(error);

                    if attempt < max_attempts {
                        let delay = self.policy.delay_after(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        let last_error = last_error.map(|e| e.to_string()).unwrap_or_default();
        warn!(max_attempts, last_error = %last_error, "Verification retries exhausted");

        VerificationOutcome::Rejected {
            attempts: max_attempts,
            reason: RejectionReason::RetriesExhausted {
                attempts: max_attempts,
                last_error,
            },
        }
    }

    async fn attempt(
        &self,
        identifier: &NationalIdentifier,
    ) -> Result<VerificationResponse, VerificationError> {
        match self.policy.attempt_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.service.verify(identifier))
                .await
                .unwrap_or_else(|_| Err(VerificationError::Timeout(limit.as_millis() as u64))),
            None => self.service.verify(identifier).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::domain::verification::{MockVerificationService, retry_transport_only};

    fn identifier() -> NationalIdentifier {
        NationalIdentifier::parse("12.345.678-K").unwrap()
    }

    #[tokio::test]
    async fn test_transport_failures_exhaust_exactly_ten_attempts() {
        let mut service = MockVerificationService::new();
        service
            .expect_verify()
            .times(10)
            .returning(|_| Err(VerificationError::Transport("connection refused".to_string())));

        let verifier = IdentifierVerifier::new(Arc::new(service));
        let outcome = verifier.verify(&identifier()).await;

        assert_eq!(
            outcome,
            VerificationOutcome::Rejected {
                attempts: 10,
                reason: RejectionReason::RetriesExhausted {
                    attempts: 10,
                    last_error: "Transport error: connection refused".to_string(),
                },
            }
        );
    }

    #[tokio::test]
    async fn test_authority_rejection_is_not_retried() {
        let mut service = MockVerificationService::new();
        service.expect_verify().times(1).returning(|_| {
            Ok(VerificationResponse::Rejected {
                reason: "digito verificador invalido".to_string(),
            })
        });

        let verifier = IdentifierVerifier::new(Arc::new(service));
        let outcome = verifier.verify(&identifier()).await;

        assert_eq!(outcome.attempts(), 1);
        assert!(matches!(
            outcome,
            VerificationOutcome::Rejected {
                reason: RejectionReason::Authority(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut service = MockVerificationService::new();
        service.expect_verify().returning(move |id| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(VerificationError::Transport("reset".to_string()))
            } else {
                Ok(VerificationResponse::Verified(json!({"rut": id.canonical()})))
            }
        });

        let verifier = IdentifierVerifier::new(Arc::new(service));
        let outcome = verifier.verify(&identifier()).await;

        assert_eq!(
            outcome,
            VerificationOutcome::Verified {
                attempts: 3,
                payload: json!({"rut": "12345678-K"}),
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let mut service = MockVerificationService::new();
        service
            .expect_verify()
            .times(1)
            .returning(|_| Err(VerificationError::MalformedResponse("not json".to_string())));

        let verifier = IdentifierVerifier::new(Arc::new(service))
            .with_policy(RetryPolicy::new(5).with_retryable(retry_transport_only));
        let outcome = verifier.verify(&identifier()).await;

        assert_eq!(outcome.attempts(), 1);
        assert!(matches!(
            outcome,
            VerificationOutcome::Rejected {
                reason: RejectionReason::NotRetryable(_),
                ..
            }
        ));
    }

    #[derive(Debug)]
    struct SlowService;

    #[async_trait]
    impl VerificationService for SlowService {
        async fn verify(
            &self,
            _identifier: &NationalIdentifier,
        ) -> Result<VerificationResponse, VerificationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(VerificationResponse::Verified(json!({})))
        }
    }

    #[tokio::test]
    async fn test_attempt_timeout_counts_as_failed_attempt() {
        let verifier = IdentifierVerifier::new(Arc::new(SlowService)).with_policy(
            RetryPolicy::new(2).with_attempt_timeout(Some(Duration::from_millis(20))),
        );

        let outcome = verifier.verify(&identifier()).await;

        match outcome {
            VerificationOutcome::Rejected {
                attempts,
                reason: RejectionReason::RetriesExhausted { last_error, .. },
            } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("timed out after 20 ms"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
