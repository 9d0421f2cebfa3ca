//! Document type catalog: normalization, snapshots and classification

pub mod entity;
pub mod matcher;
pub mod normalizer;
pub mod provider;
pub mod snapshot;

pub use entity::{DocumentTypeId, DocumentTypeSpec, FieldSpec};
pub use matcher::{CandidatePattern, Classification, DocumentTypeMatcher};
pub use normalizer::normalize;
pub use provider::{CatalogProvider, required_field_specs, resolve_snapshot};
pub use snapshot::{CatalogSnapshot, CatalogSource};

#[cfg(test)]
pub use provider::MockCatalogProvider;
