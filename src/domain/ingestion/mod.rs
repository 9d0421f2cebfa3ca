//! Ingestion jobs, processing outcomes and notifications
//!
//! This module provides:
//! - `IngestionJob` and `JobRecord` describing queued units of work
//! - `PageOutcome`/`DocumentOutcome` explicit processing results
//! - `GroupValidationReport` produced after a batch, and `ObservationRecord`
//!   persisting its issues
//! - `EventPublisher` for completion notifications

pub mod event;
pub mod job;
pub mod observation;
pub mod outcome;
pub mod validation;

pub use event::{DocumentSnapshot, EventPublisher, EventStatus, ProcessingEvent};
pub use job::{
    GroupUploadItem, IngestionJob, IngestionTarget, JobAck, JobId, JobRecord, JobStatus,
    SourceFile,
};
pub use observation::{ObservationId, ObservationRecord, ObservationRepository};
pub use outcome::{
    BatchSummary, DocumentFailure, DocumentOutcome, DocumentReport, PageOutcome, PageReport,
};
pub use validation::{DocumentObservations, FieldIssue, GroupValidationReport, IssueKind};

#[cfg(test)]
pub use event::mock::RecordingEventPublisher;
#[cfg(test)]
pub use observation::MockObservationRepository;
