//! Semantic index: structured extraction results per page and version

pub mod entity;
pub mod repository;

pub use entity::{LayoutField, REJECTED_LABEL_SUFFIX, RecordId, SemanticIndexRecord};
pub use repository::SemanticIndexRepository;

#[cfg(test)]
pub use repository::MockSemanticIndexRepository;
