//! Audit log entries

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::document::{DocumentId, VersionId};
use crate::domain::error::DomainError;
use crate::domain::id::define_id;

define_id!(
    /// Identifier of an audit log entry
    AuditEntryId,
    "aud"
);

/// Lifecycle action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Uploaded,
    Reuploaded,
    Downloaded,
    Deleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Reuploaded => "reuploaded",
            Self::Downloaded => "downloaded",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "uploaded" => Ok(Self::Uploaded),
            "reuploaded" => Ok(Self::Reuploaded),
            "downloaded" => Ok(Self::Downloaded),
            "deleted" => Ok(Self::Deleted),
            other => Err(DomainError::validation(format!(
                "Unknown audit action '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable audit record. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub document_id: DocumentId,
    pub version_id: Option<VersionId>,
    pub action: AuditAction,
    pub actor: String,
    pub comment: Option<String>,
    pub metadata: Value,
    pub recorded_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(document_id: DocumentId, action: AuditAction, actor: impl Into<String>) -> Self {
        Self {
            id: AuditEntryId::generate(),
            document_id,
            version_id: None,
            action,
            actor: actor.into(),
            comment: None,
            metadata: Value::Null,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_version(mut self, version_id: VersionId) -> Self {
        self.version_id = Some(version_id);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!(AuditAction::parse("reuploaded").unwrap(), AuditAction::Reuploaded);
        assert!(AuditAction::parse("renamed").is_err());
    }

    #[test]
    fn test_action_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AuditAction::Downloaded).unwrap(),
            "\"downloaded\""
        );
    }
}
