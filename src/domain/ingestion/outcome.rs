//! Explicit per-page and per-document processing results

use serde::{Deserialize, Serialize};

use super::validation::GroupValidationReport;
use crate::domain::catalog::DocumentTypeId;
use crate::domain::document::{DocumentId, DocumentStatus, GroupId, VersionId};
use crate::domain::ingestion::job::JobId;

/// Result of processing one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    /// The document type is not analyzed; no extraction was requested
    NotAnalyzed,
    /// Extraction succeeded and every identifier verified
    Clean { corrected_fields: usize },
    /// At least one identifier failed verification
    Flagged { labels: Vec<String> },
    /// Extraction failed; the page was skipped
    Failed { reason: String },
}

impl PageOutcome {
    /// Whether this page makes its document rejected
    pub fn rejects_document(&self) -> bool {
        matches!(self, Self::Flagged { .. } | Self::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAnalyzed => "not_analyzed",
            Self::Clean { .. } => "clean",
            Self::Flagged { .. } => "flagged",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReport {
    pub page_number: u32,
    #[serde(flatten)]
    pub outcome: PageOutcome,
}

/// Document-level failure that prevented page processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "failure", content = "detail", rename_all = "snake_case")]
pub enum DocumentFailure {
    SourceMissing,
    RenderFailed(String),
    NoPages,
}

impl DocumentFailure {
    pub fn message(&self) -> String {
        match self {
            Self::SourceMissing => "source file not found".to_string(),
            Self::RenderFailed(error) => format!("rendering failed: {}", error),
            Self::NoPages => "rendering produced no pages".to_string(),
        }
    }
}

/// Aggregated result of processing one document version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub pages: Vec<PageReport>,
    /// Rendered payloads that could not be turned into pages
    pub invalid_payloads: Vec<String>,
    pub failure: Option<DocumentFailure>,
}

impl DocumentOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(failure: DocumentFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn record_page(&mut self, page_number: u32, outcome: PageOutcome) {
        self.pages.push(PageReport {
            page_number,
            outcome,
        });
    }

    pub fn record_invalid_payload(&mut self, reason: impl Into<String>) {
        self.invalid_payloads.push(reason.into());
    }

    pub fn fail(&mut self, failure: DocumentFailure) {
        self.failure = Some(failure);
    }

    /// Highest page number observed; zero when no page was produced
    pub fn page_count(&self) -> u32 {
        self.pages.iter().map(|p| p.page_number).max().unwrap_or(0)
    }

    pub fn flagged_labels(&self) -> Vec<String> {
        self.pages
            .iter()
            .filter_map(|p| match &p.outcome {
                PageOutcome::Flagged { labels } => Some(labels.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Status this outcome rolls up to before group validation
    pub fn status(&self) -> DocumentStatus {
        if self.failure.is_some() {
            return DocumentStatus::Unclassified;
        }

        let rejected = !self.invalid_payloads.is_empty()
            || self.pages.iter().any(|p| p.outcome.rejects_document());

        if rejected {
            DocumentStatus::Rejected
        } else {
            DocumentStatus::Ok
        }
    }
}

/// Per-document entry of a job summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub document_id: DocumentId,
    pub filename: String,
    pub version_id: VersionId,
    pub version_number: u32,
    pub classified_type: Option<DocumentTypeId>,
    pub status: DocumentStatus,
    pub outcome: DocumentOutcome,
}

/// Result of a completed ingestion job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub job_id: JobId,
    pub group_id: GroupId,
    pub documents: Vec<DocumentReport>,
    pub validation: GroupValidationReport,
}

impl BatchSummary {
    pub fn count_with_status(&self, status: DocumentStatus) -> usize {
        self.documents.iter().filter(|d| d.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_pages_roll_up_to_ok() {
        let mut outcome = DocumentOutcome::new();
        outcome.record_page(1, PageOutcome::NotAnalyzed);
        outcome.record_page(2, PageOutcome::Clean { corrected_fields: 1 });

        assert_eq!(outcome.status(), DocumentStatus::Ok);
        assert_eq!(outcome.page_count(), 2);
    }

    #[test]
    fn test_flagged_or_failed_page_rejects() {
        let mut outcome = DocumentOutcome::new();
        outcome.record_page(1, PageOutcome::Clean { corrected_fields: 0 });
        outcome.record_page(
            3,
            PageOutcome::Flagged {
                labels: vec!["RUT_DEUDOR".to_string()],
            },
        );

        assert_eq!(outcome.status(), DocumentStatus::Rejected);
        assert_eq!(outcome.page_count(), 3);
        assert_eq!(outcome.flagged_labels(), vec!["RUT_DEUDOR".to_string()]);

        let mut outcome = DocumentOutcome::new();
        outcome.record_page(
            1,
            PageOutcome::Failed {
                reason: "503".to_string(),
            },
        );
        assert_eq!(outcome.status(), DocumentStatus::Rejected);
    }

    #[test]
    fn test_invalid_payload_rejects() {
        let mut outcome = DocumentOutcome::new();
        outcome.record_page(1, PageOutcome::NotAnalyzed);
        outcome.record_invalid_payload("cover.png: missing page suffix");

        assert_eq!(outcome.status(), DocumentStatus::Rejected);
    }

    #[test]
    fn test_document_failure_is_unclassified() {
        let outcome = DocumentOutcome::failed(DocumentFailure::NoPages);

        assert_eq!(outcome.status(), DocumentStatus::Unclassified);
        assert_eq!(outcome.page_count(), 0);
    }

    #[test]
    fn test_page_report_serializes_flat() {
        let report = PageReport {
            page_number: 2,
            outcome: PageOutcome::Failed {
                reason: "timeout".to_string(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["page_number"], 2);
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "timeout");
    }
}
