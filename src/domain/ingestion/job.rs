//! Ingestion jobs and their lifecycle

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::BatchSummary;
use crate::domain::document::{DocumentId, GroupId};
use crate::domain::error::DomainError;
use crate::domain::id::define_id;

define_id!(
    /// Identifier of a queued unit of work
    JobId,
    "job"
);

/// Status of an ingestion job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Cancelled)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to an uploaded file in source storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub filename: String,
    pub filepath: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, filepath: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            filepath: filepath.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// A file of a group upload together with its pre-registered document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupUploadItem {
    pub document_id: DocumentId,
    pub file: SourceFile,
}

/// What a job ingests into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IngestionTarget {
    /// New documents added to a group
    AddToGroup {
        group_id: GroupId,
        items: Vec<GroupUploadItem>,
    },
    /// A new version of an existing document
    NewVersion {
        document_id: DocumentId,
        file: SourceFile,
        comment: Option<String>,
    },
}

impl IngestionTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddToGroup { .. } => "add_to_group",
            Self::NewVersion { .. } => "new_version",
        }
    }
}

/// A queued unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionJob {
    pub id: JobId,
    pub target: IngestionTarget,
    pub actor: String,
    pub submitted_at: DateTime<Utc>,
}

impl IngestionJob {
    pub fn new(target: IngestionTarget, actor: impl Into<String>) -> Self {
        Self {
            id: JobId::generate(),
            target,
            actor: actor.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Documents touched by this job
    pub fn document_ids(&self) -> Vec<DocumentId> {
        match &self.target {
            IngestionTarget::AddToGroup { items, .. } => {
                items.iter().map(|i| i.document_id.clone()).collect()
            }
            IngestionTarget::NewVersion { document_id, .. } => vec![document_id.clone()],
        }
    }
}

/// Immediate acknowledgment returned on submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAck {
    pub job_id: JobId,
    pub document_ids: Vec<DocumentId>,
}

/// Tracked state of a submitted job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    id: JobId,
    kind: String,
    status: JobStatus,
    document_ids: Vec<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<BatchSummary>,
    submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn pending(job: &IngestionJob) -> Self {
        Self {
            id: job.id.clone(),
            kind: job.target.kind().to_string(),
            status: JobStatus::Pending,
            document_ids: job.document_ids(),
            error: None,
            summary: None,
            submitted_at: job.submitted_at,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn document_ids(&self) -> &[DocumentId] {
        &self.document_ids
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn summary(&self) -> Option<&BatchSummary> {
        self.summary.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    fn transition(&mut self, target: JobStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::conflict(format!(
                "Job '{}' cannot move from {} to {}",
                self.id, self.status, target
            )));
        }
        self.status = target;
        Ok(())
    }

    pub fn mark_running(&mut self) -> Result<(), DomainError> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_completed(&mut self, summary: BatchSummary) -> Result<(), DomainError> {
        self.transition(JobStatus::Completed)?;
        self.summary = Some(summary);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_cancelled(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition(JobStatus::Cancelled)?;
        self.error = Some(reason.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_version_job() -> IngestionJob {
        IngestionJob::new(
            IngestionTarget::NewVersion {
                document_id: DocumentId::new("doc-1"),
                file: SourceFile::new("contrato.pdf", "uploads/contrato.pdf"),
                comment: None,
            },
            "ana",
        )
    }

    #[test]
    fn test_status_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Running));
    }

    #[test]
    fn test_record_lifecycle() {
        let job = new_version_job();
        let mut record = JobRecord::pending(&job);

        assert_eq!(record.kind(), "new_version");
        assert_eq!(record.document_ids(), &[DocumentId::new("doc-1")]);

        record.mark_running().unwrap();
        assert!(record.started_at().is_some());

        record.mark_failed("storage unavailable").unwrap();
        assert_eq!(record.status(), JobStatus::Failed);
        assert_eq!(record.error(), Some("storage unavailable"));
        assert!(record.finished_at().is_some());

        assert!(record.mark_cancelled("late").is_err());
    }

    #[test]
    fn test_group_job_lists_documents_in_order() {
        let job = IngestionJob::new(
            IngestionTarget::AddToGroup {
                group_id: GroupId::new("g-1"),
                items: vec![
                    GroupUploadItem {
                        document_id: DocumentId::new("doc-a"),
                        file: SourceFile::new("a.pdf", "a.pdf"),
                    },
                    GroupUploadItem {
                        document_id: DocumentId::new("doc-b"),
                        file: SourceFile::new("b.pdf", "b.pdf"),
                    },
                ],
            },
            "ana",
        );

        assert_eq!(
            job.document_ids(),
            vec![DocumentId::new("doc-a"), DocumentId::new("doc-b")]
        );
        assert_eq!(job.target.kind(), "add_to_group");
    }
}
