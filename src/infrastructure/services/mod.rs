//! Infrastructure services

mod audit_recorder;
mod group_validator;
mod identifier_verifier;
mod ingestion_coordinator;
mod job_queue;
mod page_processor;
mod version_manager;

pub use audit_recorder::AuditTrailRecorder;
pub use group_validator::GroupDocumentValidator;
pub use identifier_verifier::IdentifierVerifier;
pub use ingestion_coordinator::{IngestionCoordinator, PipelineServices};
pub use job_queue::{IngestionQueue, JobTracker, QueueConfig};
pub use page_processor::{PageContext, PageProcessor, RenderedPage};
pub use version_manager::VersionStateManager;
