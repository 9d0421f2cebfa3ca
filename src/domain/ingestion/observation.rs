//! Persisted group validation issues

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::validation::{DocumentObservations, FieldIssue};
use crate::domain::catalog::DocumentTypeId;
use crate::domain::document::{DocumentId, GroupId, VersionId};
use crate::domain::error::DomainError;
use crate::domain::id::define_id;

#[cfg(test)]
use mockall::automock;

define_id!(
    /// Identifier of a persisted field issue
    ObservationId,
    "obs"
);

/// A field issue found for a document version, kept beyond the job that
/// found it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub id: ObservationId,
    pub group_id: GroupId,
    pub document_id: DocumentId,
    /// Current version when the issue was found; `None` if there was none
    pub version_id: Option<VersionId>,
    pub document_type_id: DocumentTypeId,
    pub issue: FieldIssue,
    pub recorded_at: DateTime<Utc>,
}

impl ObservationRecord {
    /// One record per issue of a validated document
    pub fn from_observations(
        group_id: &GroupId,
        version_id: Option<&VersionId>,
        observations: &DocumentObservations,
    ) -> Vec<Self> {
        let recorded_at = Utc::now();

        observations
            .issues
            .iter()
            .map(|issue| Self {
                id: ObservationId::generate(),
                group_id: group_id.clone(),
                document_id: observations.document_id.clone(),
                version_id: version_id.cloned(),
                document_type_id: observations.document_type_id.clone(),
                issue: issue.clone(),
                recorded_at,
            })
            .collect()
    }

    /// Records with the same key describe the same issue
    pub fn same_issue(&self, other: &Self) -> bool {
        self.document_id == other.document_id
            && self.version_id == other.version_id
            && self.issue.field_key == other.issue.field_key
            && self.issue.kind == other.issue.kind
    }
}

/// Append-only storage of validation issues.
///
/// An issue already recorded for the same document version, field and kind is
/// not stored twice, so revalidating a group is idempotent.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObservationRepository: Send + Sync + Debug {
    /// Returns how many records were new
    async fn append_all(&self, records: Vec<ObservationRecord>) -> Result<usize, DomainError>;

    /// Records of a document, oldest first
    async fn list_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<ObservationRecord>, DomainError>;
}
