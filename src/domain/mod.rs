//! Domain layer - Core business logic and entities

pub mod audit;
pub mod catalog;
pub mod document;
pub mod error;
pub mod extraction;
pub mod files;
pub(crate) mod id;
pub mod ingestion;
pub mod rendering;
pub mod semantic;
pub mod verification;

pub use audit::{AuditAction, AuditEntryId, AuditLogEntry, AuditLogRepository};
pub use catalog::{
    CatalogProvider, CatalogSnapshot, CatalogSource, Classification, DocumentTypeId,
    DocumentTypeMatcher, DocumentTypeSpec, FieldSpec, normalize,
};
pub use document::{
    Document, DocumentId, DocumentPage, DocumentRepository, DocumentStatus, DocumentVersion,
    GroupId, NewVersion, PageId, PageRepository, VersionId, VersionRepository,
};
pub use error::DomainError;
pub use extraction::{ExtractionRequest, ExtractionService};
pub use files::{PageImageStore, SourceFileStore};
pub use ingestion::{
    BatchSummary, DocumentOutcome, DocumentReport, EventPublisher, EventStatus,
    GroupValidationReport, IngestionJob, IngestionTarget, JobAck, JobId, JobRecord, JobStatus,
    ObservationRecord, ObservationRepository, PageOutcome, ProcessingEvent, SourceFile,
};
pub use rendering::{RenderService, RenderedPayload, SourceDocument};
pub use semantic::{LayoutField, SemanticIndexRecord, SemanticIndexRepository};
pub use verification::{
    NationalIdentifier, RetryPolicy, VerificationError, VerificationOutcome, VerificationResponse,
    VerificationService,
};
