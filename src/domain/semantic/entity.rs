//! Structured extraction results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::document::{DocumentId, GroupId, PageId, VersionId};
use crate::domain::id::define_id;

define_id!(
    /// Identifier of a semantic index record
    RecordId,
    "sem"
);

/// Suffix appended to identifier labels that failed verification
pub const REJECTED_LABEL_SUFFIX: &str = "_E";

/// One extracted field in layout order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutField {
    pub label: String,
    #[serde(default)]
    pub text: String,
    /// Bounding boxes as reported by the extraction service
    #[serde(default)]
    pub boxes: Vec<serde_json::Value>,
}

impl LayoutField {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            boxes: Vec::new(),
        }
    }

    /// Whether the label carries the failed-verification marker
    pub fn is_rejected(&self) -> bool {
        self.label.ends_with(REJECTED_LABEL_SUFFIX)
    }

    /// Label without the failed-verification marker
    pub fn base_label(&self) -> &str {
        self.label
            .strip_suffix(REJECTED_LABEL_SUFFIX)
            .unwrap_or(&self.label)
    }
}

/// Extraction result for a page, or for a whole version when `page_id` is absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticIndexRecord {
    pub id: RecordId,
    pub group_id: GroupId,
    pub document_id: Option<DocumentId>,
    pub version_id: VersionId,
    pub page_id: Option<PageId>,
    pub fields: Vec<LayoutField>,
    pub updated_at: DateTime<Utc>,
}

impl SemanticIndexRecord {
    pub fn for_page(
        group_id: GroupId,
        version_id: VersionId,
        page_id: PageId,
        fields: Vec<LayoutField>,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            group_id,
            document_id: None,
            version_id,
            page_id: Some(page_id),
            fields,
            updated_at: Utc::now(),
        }
    }

    pub fn for_document(group_id: GroupId, document_id: DocumentId, version_id: VersionId) -> Self {
        Self {
            id: RecordId::generate(),
            group_id,
            document_id: Some(document_id),
            version_id,
            page_id: None,
            fields: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_document_scope(&self) -> bool {
        self.page_id.is_none()
    }

    pub fn link_document(&mut self, document_id: DocumentId) {
        self.document_id = Some(document_id);
        self.updated_at = Utc::now();
    }

    pub fn replace_fields(&mut self, fields: Vec<LayoutField>) {
        self.fields = fields;
        self.updated_at = Utc::now();
    }
}
