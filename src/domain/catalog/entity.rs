//! Document type catalog entities

use serde::{Deserialize, Serialize};

use crate::domain::id::define_id;

define_id!(
    /// Identifier of a document type in the catalog
    DocumentTypeId,
    "dtype"
);

/// A classification bucket a document can be assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeSpec {
    pub id: DocumentTypeId,
    pub name: String,
    /// Whether documents of this type must be present in the group
    #[serde(default)]
    pub required: bool,
    /// Whether pages of documents of this type are sent to field extraction
    #[serde(default)]
    pub analyze: bool,
}

impl DocumentTypeSpec {
    pub fn new(id: impl Into<DocumentTypeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            required: false,
            analyze: false,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_analyze(mut self, analyze: bool) -> Self {
        self.analyze = analyze;
        self
    }
}

/// A field a classified document is expected to carry after extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Label produced by the extraction service
    pub field_key: String,
    /// Human readable name used in issue messages
    pub label: String,
    #[serde(default)]
    pub datatype: Option<String>,
    /// Regular expression the extracted text must match
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    pub fn new(field_key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field_key: field_key.into(),
            label: label.into(),
            datatype: None,
            pattern: None,
            required: true,
        }
    }

    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_defaults() {
        let spec = DocumentTypeSpec::new("1", "Contrato");
        assert!(!spec.required);
        assert!(!spec.analyze);

        let spec = spec.with_required(true).with_analyze(true);
        assert!(spec.required);
        assert!(spec.analyze);
    }

    #[test]
    fn test_field_spec_required_by_default_when_deserialized() {
        let spec: FieldSpec =
            serde_json::from_str(r#"{"field_key": "RUT_DEUDOR", "label": "RUT deudor"}"#).unwrap();
        assert!(spec.required);
        assert!(spec.pattern.is_none());
    }
}
