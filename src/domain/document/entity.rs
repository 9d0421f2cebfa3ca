//! Document entity and aggregate status

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{DocumentTypeId, DocumentTypeSpec};
use crate::domain::error::DomainError;
use crate::domain::id::define_id;

define_id!(
    /// Identifier of a document group, owned by the group collaborator
    GroupId,
    "grp"
);

define_id!(
    /// Logical document identity across versions
    DocumentId,
    "doc"
);

/// Aggregate processing status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Not classified, or processing failed before any page was produced
    #[default]
    Unclassified,
    Processing,
    Ok,
    /// At least one page was flagged or failed
    Rejected,
    /// Processed, but group required-field configuration reports issues
    HasObservations,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Processing => "processing",
            Self::Ok => "ok",
            Self::Rejected => "rejected",
            Self::HasObservations => "has_observations",
        }
    }

    /// Whether group validation issues may downgrade this status
    pub fn accepts_observations(&self) -> bool {
        matches!(self, Self::Ok | Self::HasObservations)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unclassified" => Ok(Self::Unclassified),
            "processing" => Ok(Self::Processing),
            "ok" => Ok(Self::Ok),
            "rejected" => Ok(Self::Rejected),
            "has_observations" => Ok(Self::HasObservations),
            other => Err(DomainError::validation(format!(
                "Unknown document status '{}'",
                other
            ))),
        }
    }
}

/// A logical document belonging to exactly one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    group_id: GroupId,
    name: String,
    classified_type: Option<DocumentTypeId>,
    status: DocumentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Document {
    /// Registers a new document awaiting processing
    pub fn new(group_id: GroupId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::generate(),
            group_id,
            name: name.into(),
            classified_type: None,
            status: DocumentStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a document from persisted state
    pub fn restore(
        id: DocumentId,
        group_id: GroupId,
        name: String,
        classified_type: Option<DocumentTypeId>,
        status: DocumentStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            group_id,
            name,
            classified_type,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classified_type(&self) -> Option<&DocumentTypeId> {
        self.classified_type.as_ref()
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn classify(&mut self, document_type: Option<&DocumentTypeSpec>) {
        self.classified_type = document_type.map(|t| t.id.clone());
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: DocumentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
