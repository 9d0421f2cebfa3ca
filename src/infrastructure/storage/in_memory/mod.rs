//! In-memory repository implementations

mod audit;
mod catalog;
mod documents;
mod observations;
mod semantic;

pub use audit::InMemoryAuditLog;
pub use catalog::{CatalogDefinition, GroupCatalog, InMemoryCatalog};
pub use documents::InMemoryDocumentStore;
pub use observations::InMemoryObservationStore;
pub use semantic::InMemorySemanticIndex;
