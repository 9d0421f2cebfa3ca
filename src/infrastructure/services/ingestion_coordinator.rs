//! Top-level orchestration of group uploads and re-uploads
//!
//! A job runs in three phases:
//! - the catalog snapshot is resolved once and compiled into a matcher
//! - every file is classified, versioned, rendered and processed page by page
//! - the group is validated and one completion event per document is emitted
//!
//! Page and document failures are recorded as outcomes and never abort the
//! job. Anything else propagates after the job's documents were flushed out
//! of `processing`.

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::{
    AuditTrailRecorder, GroupDocumentValidator, IdentifierVerifier, PageContext, PageProcessor,
    VersionStateManager,
};
use crate::domain::DomainError;
use crate::domain::catalog::{
    CatalogProvider, CatalogSnapshot, DocumentTypeId, DocumentTypeMatcher, resolve_snapshot,
};
use crate::domain::document::{
    Document, DocumentId, DocumentRepository, DocumentStatus, DocumentVersion, GroupId, NewVersion,
};
use crate::domain::extraction::ExtractionService;
use crate::domain::files::{PageImageStore, SourceFileStore};
use crate::domain::ingestion::{
    BatchSummary, DocumentFailure, DocumentOutcome, DocumentReport, EventPublisher, EventStatus,
    GroupUploadItem, GroupValidationReport, IngestionJob, IngestionTarget, ProcessingEvent,
    SourceFile,
};
use crate::domain::rendering::{RenderService, SourceDocument};
use crate::domain::semantic::{SemanticIndexRecord, SemanticIndexRepository};
use crate::domain::verification::{RetryPolicy, VerificationService};
use crate::infrastructure::storage::Repositories;

/// External collaborators of the pipeline
#[derive(Debug, Clone)]
pub struct PipelineServices {
    pub renderer: Arc<dyn RenderService>,
    pub extractor: Arc<dyn ExtractionService>,
    pub verifier: Arc<dyn VerificationService>,
    pub sources: Arc<dyn SourceFileStore>,
    pub images: Arc<dyn PageImageStore>,
    pub events: Arc<dyn EventPublisher>,
}

#[derive(Debug, Clone)]
pub struct IngestionCoordinator {
    documents: Arc<dyn DocumentRepository>,
    semantic: Arc<dyn SemanticIndexRepository>,
    catalog: Arc<dyn CatalogProvider>,
    sources: Arc<dyn SourceFileStore>,
    renderer: Arc<dyn RenderService>,
    events: Arc<dyn EventPublisher>,
    versions: VersionStateManager,
    page_processor: PageProcessor,
    validator: GroupDocumentValidator,
    audit: AuditTrailRecorder,
}

impl IngestionCoordinator {
    pub fn new(
        repositories: &Repositories,
        services: PipelineServices,
        policy: RetryPolicy,
        identifier_labels: impl IntoIterator<Item = String>,
    ) -> Self {
        let verifier = IdentifierVerifier::new(services.verifier).with_policy(policy);

        Self {
            documents: repositories.documents.clone(),
            semantic: repositories.semantic.clone(),
            catalog: repositories.catalog.clone(),
            sources: services.sources,
            renderer: services.renderer,
            events: services.events,
            versions: VersionStateManager::new(
                repositories.documents.clone(),
                repositories.versions.clone(),
            ),
            page_processor: PageProcessor::new(
                repositories.pages.clone(),
                repositories.semantic.clone(),
                services.extractor,
                services.images,
                verifier,
                identifier_labels,
            ),
            validator: GroupDocumentValidator::new(
                repositories.documents.clone(),
                repositories.versions.clone(),
                repositories.semantic.clone(),
                repositories.observations.clone(),
                repositories.catalog.clone(),
            ),
            audit: AuditTrailRecorder::new(repositories.audit.clone()),
        }
    }

    /// Registers one `processing` document per file and builds the job for them
    #[instrument(skip(self, files), fields(group_id = %group_id, files = files.len()))]
    pub async fn register_group_upload(
        &self,
        group_id: GroupId,
        files: Vec<SourceFile>,
        actor: &str,
    ) -> Result<IngestionJob, DomainError> {
        if files.is_empty() {
            return Err(DomainError::validation("A group upload needs at least one file"));
        }

        let mut items = Vec::with_capacity(files.len());
        for file in files {
            let document = self
                .documents
                .create(Document::new(group_id.clone(), file.filename.clone()))
                .await?;
            items.push(GroupUploadItem {
                document_id: document.id().clone(),
                file,
            });
        }

        let job = IngestionJob::new(IngestionTarget::AddToGroup { group_id, items }, actor);
        info!(job_id = %job.id, "Registered group upload");
        Ok(job)
    }

    /// Builds a re-upload job for an existing document
    pub async fn prepare_new_version(
        &self,
        document_id: DocumentId,
        file: SourceFile,
        comment: Option<String>,
        actor: &str,
    ) -> Result<IngestionJob, DomainError> {
        self.load_document(&document_id).await?;

        Ok(IngestionJob::new(
            IngestionTarget::NewVersion {
                document_id,
                file,
                comment,
            },
            actor,
        ))
    }

    /// Executes a job. On error the job's documents were already flushed.
    #[instrument(skip(self, job, cancel), fields(job_id = %job.id, kind = job.target.kind()))]
    pub async fn run(
        &self,
        job: &IngestionJob,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, DomainError> {
        let result = match &job.target {
            IngestionTarget::AddToGroup { group_id, items } => {
                self.run_group_upload(job, group_id, items, cancel).await
            }
            IngestionTarget::NewVersion {
                document_id,
                file,
                comment,
            } => {
                self.run_new_version(job, document_id, file, comment.as_deref(), cancel)
                    .await
            }
        };

        match result {
            Ok(summary) => {
                self.publish_completion(job, &summary).await;
                info!(
                    documents = summary.documents.len(),
                    ok = summary.count_with_status(DocumentStatus::Ok),
                    rejected = summary.count_with_status(DocumentStatus::Rejected),
                    observations = summary.count_with_status(DocumentStatus::HasObservations),
                    unclassified = summary.count_with_status(DocumentStatus::Unclassified),
                    "Ingestion job completed"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Ingestion job failed");
                self.abandon(job, &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Moves documents of an interrupted job out of `processing` and emits an
    /// `error` event for every document of the job
    pub async fn abandon(&self, job: &IngestionJob, reason: &str) {
        for document_id in job.document_ids() {
            let document = match self.documents.find_by_id(&document_id).await {
                Ok(Some(document)) => document,
                Ok(None) => continue,
                Err(e) => {
                    warn!(document_id = %document_id, error = %e, "Failed to load document while abandoning job");
                    continue;
                }
            };

            let document = if document.status() == DocumentStatus::Processing {
                match self.versions.mark_unclassified(document).await {
                    Ok(document) => document,
                    Err(e) => {
                        warn!(document_id = %document_id, error = %e, "Failed to flush document status");
                        continue;
                    }
                }
            } else {
                document
            };

            self.publish(job, &document, EventStatus::Error, Some(reason.to_string()))
                .await;
        }
    }

    async fn run_group_upload(
        &self,
        job: &IngestionJob,
        group_id: &GroupId,
        items: &[GroupUploadItem],
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, DomainError> {
        let mut documents = Vec::with_capacity(items.len());
        for item in items {
            documents.push(self.load_document(&item.document_id).await?);
        }
        for document in &documents {
            self.publish(job, document, EventStatus::Started, None).await;
        }

        let snapshot = resolve_snapshot(self.catalog.as_ref(), group_id).await?;
        let matcher = DocumentTypeMatcher::compile(&snapshot);
        debug!(source = ?snapshot.source(), candidates = matcher.len(), "Catalog snapshot resolved");

        let mut reports = Vec::with_capacity(items.len());
        for (item, mut document) in items.iter().zip(documents) {
            ensure_active(job, cancel)?;

            let classification = matcher.classify(&item.file.filename);
            let analyze = classification.document_type().is_some_and(|t| t.analyze);
            info!(
                document_id = %document.id(),
                filename = %item.file.filename,
                document_type = ?classification.document_type().map(|t| &t.name),
                analyze,
                "Classified document"
            );

            document.classify(classification.document_type());
            let document = self.documents.update(document).await?;

            let content = self.read_source(&item.file).await;
            let version = self
                .versions
                .create_version(
                    document.id(),
                    version_request(&item.file, &job.actor, None, content.as_ref()),
                )
                .await?;
            self.audit.record_uploaded(&version, &job.actor).await;

            reports.push(
                self.process_version(document, &version, content, analyze)
                    .await?,
            );
        }

        let validation = self.validator.validate_group(group_id, &snapshot).await;
        apply_observations(&mut reports, &validation);

        Ok(BatchSummary {
            job_id: job.id.clone(),
            group_id: group_id.clone(),
            documents: reports,
            validation,
        })
    }

    async fn run_new_version(
        &self,
        job: &IngestionJob,
        document_id: &DocumentId,
        file: &SourceFile,
        comment: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, DomainError> {
        let mut document = self.load_document(document_id).await?;
        let group_id = document.group_id().clone();

        let snapshot = resolve_snapshot(self.catalog.as_ref(), &group_id).await?;
        let analyze = self.analyze_flag(&snapshot, document.classified_type()).await;
        ensure_active(job, cancel)?;

        let previous_status = document.status();
        document.set_status(DocumentStatus::Processing);
        let document = self.documents.update(document).await?;
        self.publish(job, &document, EventStatus::Started, None).await;

        let content = self.read_source(file).await;
        let request = version_request(file, &job.actor, comment, content.as_ref());
        let version = match self.versions.create_version(document.id(), request).await {
            Ok(version) => version,
            Err(e) => {
                let mut document = document;
                document.set_status(previous_status);
                if let Err(restore_error) = self.documents.update(document).await {
                    warn!(error = %restore_error, "Failed to restore document status");
                }
                return Err(e);
            }
        };
        self.audit
            .record_reuploaded(&version, &job.actor, comment)
            .await;

        let mut reports = vec![
            self.process_version(document, &version, content, analyze)
                .await?,
        ];

        let validation = self.validator.validate_group(&group_id, &snapshot).await;
        apply_observations(&mut reports, &validation);

        Ok(BatchSummary {
            job_id: job.id.clone(),
            group_id,
            documents: reports,
            validation,
        })
    }

    /// Renders and processes one version, then rolls its outcome up into the document
    #[instrument(
        skip(self, document, version, content),
        fields(document_id = %document.id(), version_number = version.version_number)
    )]
    async fn process_version(
        &self,
        document: Document,
        version: &DocumentVersion,
        content: Option<Bytes>,
        analyze: bool,
    ) -> Result<DocumentReport, DomainError> {
        let mut outcome = DocumentOutcome::new();

        match content {
            None => outcome.fail(DocumentFailure::SourceMissing),
            Some(content) => {
                let source = SourceDocument::new(&version.filename, &version.mime_type, content);

                match self.renderer.render(&source).await {
                    Err(e) => {
                        warn!(error = %e, "Rendering failed");
                        outcome.fail(DocumentFailure::RenderFailed(e.to_string()));
                    }
                    Ok(payloads) if payloads.is_empty() => {
                        warn!("Rendering produced no pages");
                        outcome.fail(DocumentFailure::NoPages);
                    }
                    Ok(payloads) => {
                        let pages = self
                            .page_processor
                            .ingest_render_output(&version.id, payloads, &mut outcome)
                            .await;

                        if pages.is_empty() {
                            warn!("No rendered page could be stored");
                            outcome.fail(DocumentFailure::NoPages);
                        } else {
                            let context = PageContext {
                                group_id: document.group_id().clone(),
                                document_id: document.id().clone(),
                                version_id: version.id.clone(),
                                analyze,
                            };
                            self.page_processor
                                .process_pages(&context, &pages, &mut outcome)
                                .await?;
                        }
                    }
                }
            }
        }

        let document = self
            .versions
            .complete_version(document, version, &outcome)
            .await?;

        if outcome.failure.is_none() {
            self.ensure_document_record(&document, version).await;
        }

        Ok(DocumentReport {
            document_id: document.id().clone(),
            filename: version.filename.clone(),
            version_id: version.id.clone(),
            version_number: version.version_number,
            classified_type: document.classified_type().cloned(),
            status: document.status(),
            outcome,
        })
    }

    async fn ensure_document_record(&self, document: &Document, version: &DocumentVersion) {
        let record = SemanticIndexRecord::for_document(
            document.group_id().clone(),
            document.id().clone(),
            version.id.clone(),
        );

        match self.semantic.insert_if_absent(record).await {
            Ok(true) => debug!(version_id = %version.id, "Created document index record"),
            Ok(false) => {}
            Err(e) => warn!(version_id = %version.id, error = %e, "Failed to create document index record"),
        }
    }

    /// Whether pages of the given type are extracted; unknown types are not
    async fn analyze_flag(
        &self,
        snapshot: &CatalogSnapshot,
        type_id: Option<&DocumentTypeId>,
    ) -> bool {
        let Some(type_id) = type_id else {
            return false;
        };

        if let Some(spec) = snapshot.find(type_id) {
            return spec.analyze;
        }

        match self.catalog.document_type(type_id).await {
            Ok(spec) => spec.is_some_and(|s| s.analyze),
            Err(e) => {
                warn!(document_type_id = %type_id, error = %e, "Failed to load document type");
                false
            }
        }
    }

    /// Reads the source upload. Unreadable sources count as missing.
    async fn read_source(&self, file: &SourceFile) -> Option<Bytes> {
        match self.sources.read(&file.filepath).await {
            Ok(Some(content)) => Some(content),
            Ok(None) => {
                warn!(filepath = %file.filepath, "Source file not found");
                None
            }
            Err(e) => {
                warn!(filepath = %file.filepath, error = %e, "Failed to read source file");
                None
            }
        }
    }

    async fn load_document(&self, document_id: &DocumentId) -> Result<Document, DomainError> {
        self.documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Document '{}' not found", document_id)))
    }

    async fn publish_completion(&self, job: &IngestionJob, summary: &BatchSummary) {
        for report in &summary.documents {
            let document = match self.documents.find_by_id(&report.document_id).await {
                Ok(Some(document)) => document,
                Ok(None) => continue,
                Err(e) => {
                    warn!(document_id = %report.document_id, error = %e, "Failed to load document for completion event");
                    continue;
                }
            };

            match &report.outcome.failure {
                Some(failure) => {
                    self.publish(job, &document, EventStatus::Error, Some(failure.message()))
                        .await
                }
                None => {
                    self.publish(job, &document, EventStatus::Completed, None)
                        .await
                }
            }
        }
    }

    async fn publish(
        &self,
        job: &IngestionJob,
        document: &Document,
        status: EventStatus,
        message: Option<String>,
    ) {
        let mut event = ProcessingEvent::new(job.id.clone(), document, status);
        if let Some(message) = message {
            event = event.with_message(message);
        }
        self.events.publish(event).await;
    }
}

fn ensure_active(job: &IngestionJob, cancel: &CancellationToken) -> Result<(), DomainError> {
    if cancel.is_cancelled() {
        return Err(DomainError::cancelled(format!("Job '{}' was cancelled", job.id)));
    }
    Ok(())
}

fn version_request(
    file: &SourceFile,
    actor: &str,
    comment: Option<&str>,
    content: Option<&Bytes>,
) -> NewVersion {
    let mut version = NewVersion::new(&file.filename, &file.filepath, actor)
        .with_comment(comment.map(str::to_string));

    if let Some(mime_type) = &file.mime_type {
        version = version.with_mime_type(mime_type);
    }
    if let Some(content) = content {
        version = version.with_content(content);
    }

    version
}

/// Mirrors the status changes group validation made in the repository
fn apply_observations(reports: &mut [DocumentReport], validation: &GroupValidationReport) {
    for report in reports.iter_mut() {
        if report.status.accepts_observations()
            && !validation.issues_for(&report.document_id).is_empty()
        {
            report.status = DocumentStatus::HasObservations;
        }
    }
}
