//! Identifier verification boundary

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use thiserror::Error;

use super::identifier::NationalIdentifier;

#[cfg(test)]
use mockall::automock;

/// Failure to obtain an answer from the verification authority
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Verification attempt timed out after {0} ms")]
    Timeout(u64),

    #[error("Malformed verification response: {0}")]
    MalformedResponse(String),
}

/// An answer from the verification authority
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResponse {
    Verified(Value),
    /// Structured rejection; authoritative and never retried
    Rejected { reason: String },
}

/// Remote authority that checks identifiers against their check digit
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VerificationService: Send + Sync + Debug {
    async fn verify(
        &self,
        identifier: &NationalIdentifier,
    ) -> Result<VerificationResponse, VerificationError>;
}

/// Why an identifier ended up rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// The authority answered that the identifier is invalid
    Authority(String),
    /// Every allowed attempt failed
    RetriesExhausted { attempts: u32, last_error: String },
    /// The error was classified as not worth retrying
    NotRetryable(String),
}

impl RejectionReason {
    pub fn message(&self) -> String {
        match self {
            Self::Authority(reason) => reason.clone(),
            Self::RetriesExhausted {
                attempts,
                last_error,
            } => format!("gave up after {} attempts: {}", attempts, last_error),
            Self::NotRetryable(error) => error.clone(),
        }
    }
}

/// Final result of verifying one identifier
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Verified { attempts: u32, payload: Value },
    Rejected { attempts: u32, reason: RejectionReason },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Verified { attempts, .. } | Self::Rejected { attempts, .. } => *attempts,
        }
    }
}
