//! Group required-field validation report

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{DocumentTypeId, DocumentTypeSpec, FieldSpec};
use crate::domain::document::{DocumentId, GroupId};
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingRequiredField,
    InvalidFieldValue,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequiredField => "missing_required_field",
            Self::InvalidFieldValue => "invalid_field_value",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "missing_required_field" => Ok(Self::MissingRequiredField),
            "invalid_field_value" => Ok(Self::InvalidFieldValue),
            other => Err(DomainError::validation(format!(
                "Unknown issue type '{}'",
                other
            ))),
        }
    }
}

/// One required-field violation of a classified document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub field_key: String,
    pub label: String,
    pub message: String,
}

impl FieldIssue {
    pub fn missing(spec: &FieldSpec) -> Self {
        Self {
            kind: IssueKind::MissingRequiredField,
            field_key: spec.field_key.clone(),
            label: spec.label.clone(),
            message: format!("Missing required field: {}", spec.label),
        }
    }

    pub fn invalid(spec: &FieldSpec, detail: impl AsRef<str>) -> Self {
        Self {
            kind: IssueKind::InvalidFieldValue,
            field_key: spec.field_key.clone(),
            label: spec.label.clone(),
            message: format!("Invalid value for {}: {}", spec.label, detail.as_ref()),
        }
    }
}

/// Issues found for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentObservations {
    pub document_id: DocumentId,
    pub document_type_id: DocumentTypeId,
    pub issues: Vec<FieldIssue>,
}

/// Informational result of validating a group after ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupValidationReport {
    pub group_id: GroupId,
    pub documents: Vec<DocumentObservations>,
    /// Required document types no document in the group is classified as
    pub missing_document_types: Vec<DocumentTypeSpec>,
    /// Errors encountered while validating; never raised to the caller
    pub errors: Vec<String>,
}

impl GroupValidationReport {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            documents: Vec::new(),
            missing_document_types: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn issues_for(&self, document_id: &DocumentId) -> &[FieldIssue] {
        self.documents
            .iter()
            .find(|d| &d.document_id == document_id)
            .map(|d| d.issues.as_slice())
            .unwrap_or(&[])
    }

    pub fn issue_count(&self) -> usize {
        self.documents.iter().map(|d| d.issues.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_serializes_with_type_key() {
        let spec = FieldSpec::new("RUT_DEUDOR", "RUT deudor");
        let json = serde_json::to_value(FieldIssue::missing(&spec)).unwrap();

        assert_eq!(json["type"], "missing_required_field");
        assert_eq!(json["field_key"], "RUT_DEUDOR");
        assert_eq!(json["message"], "Missing required field: RUT deudor");
    }

    #[test]
    fn test_issue_kind_parse_matches_serialized_name() {
        for kind in [IssueKind::MissingRequiredField, IssueKind::InvalidFieldValue] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
            assert_eq!(IssueKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(IssueKind::parse("typo").is_err());
    }

    #[test]
    fn test_issues_for_unknown_document_is_empty() {
        let report = GroupValidationReport::new(GroupId::new("g-1"));
        assert!(report.issues_for(&DocumentId::new("doc-x")).is_empty());
        assert_eq!(report.issue_count(), 0);
    }
}
