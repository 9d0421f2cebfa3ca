//! National identifier verification

pub mod identifier;
pub mod retry;
pub mod service;

pub use identifier::{DEFAULT_IDENTIFIER_LABELS, NationalIdentifier};
pub use retry::{
    Backoff, DEFAULT_MAX_ATTEMPTS, RetryPolicy, RetryPredicate, retry_all, retry_transport_only,
};
pub use service::{
    RejectionReason, VerificationError, VerificationOutcome, VerificationResponse,
    VerificationService,
};

#[cfg(test)]
pub use service::MockVerificationService;
