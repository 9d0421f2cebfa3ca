//! Post-batch validation of classified documents against required fields

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::domain::DomainError;
use crate::domain::catalog::{
    CatalogProvider, CatalogSnapshot, CatalogSource, DocumentTypeId, FieldSpec,
    required_field_specs,
};
use crate::domain::document::{
    Document, DocumentRepository, DocumentStatus, GroupId, VersionId, VersionRepository,
};
use crate::domain::ingestion::{
    DocumentObservations, FieldIssue, GroupValidationReport, ObservationRecord,
    ObservationRepository,
};
use crate::domain::semantic::{LayoutField, SemanticIndexRepository};

#[derive(Debug, Clone)]
pub struct GroupDocumentValidator {
    documents: Arc<dyn DocumentRepository>,
    versions: Arc<dyn VersionRepository>,
    semantic: Arc<dyn SemanticIndexRepository>,
    observations: Arc<dyn ObservationRepository>,
    catalog: Arc<dyn CatalogProvider>,
}

impl GroupDocumentValidator {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        versions: Arc<dyn VersionRepository>,
        semantic: Arc<dyn SemanticIndexRepository>,
        observations: Arc<dyn ObservationRepository>,
        catalog: Arc<dyn CatalogProvider>,
    ) -> Self {
        Self {
            documents,
            versions,
            semantic,
            observations,
            catalog,
        }
    }

    /// Checks every classified document of the group.
    ///
    /// Documents with issues move to `has_observations` unless they are
    /// already rejected or failed, and their issues are persisted. Errors end
    /// up in the report.
    #[instrument(skip(self, snapshot), fields(group_id = %group_id))]
    pub async fn validate_group(
        &self,
        group_id: &GroupId,
        snapshot: &CatalogSnapshot,
    ) -> GroupValidationReport {
        let mut report = GroupValidationReport::new(group_id.clone());

        let documents = match self.documents.list_by_group(group_id).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, "Failed to list group documents");
                report.errors.push(format!("Failed to list documents: {}", e));
                return report;
            }
        };

        for document in &documents {
            let Some(type_id) = document.classified_type() else {
                continue;
            };

            let found = self.document_issues(group_id, document, type_id).await;
            let (version_id, issues) = match found {
                Ok(found) => found,
                Err(e) => {
                    warn!(document_id = %document.id(), error = %e, "Failed to validate document");
                    report.errors.push(format!("{}: {}", document.id(), e));
                    continue;
                }
            };

            if issues.is_empty() {
                continue;
            }

            if let Err(e) = self.flag_observations(document).await {
                warn!(document_id = %document.id(), error = %e, "Failed to record observations");
                report.errors.push(format!("{}: {}", document.id(), e));
            }

            let observations = DocumentObservations {
                document_id: document.id().clone(),
                document_type_id: type_id.clone(),
                issues,
            };

            let records =
                ObservationRecord::from_observations(group_id, version_id.as_ref(), &observations);
            if let Err(e) = self.observations.append_all(records).await {
                warn!(document_id = %document.id(), error = %e, "Failed to persist observations");
                report.errors.push(format!("{}: {}", document.id(), e));
            }

            report.documents.push(observations);
        }

        if snapshot.source() == CatalogSource::Group {
            let present: HashSet<&DocumentTypeId> =
                documents.iter().filter_map(|d| d.classified_type()).collect();

            report.missing_document_types = snapshot
                .required_types()
                .filter(|t| !present.contains(&t.id))
                .cloned()
                .collect();
        }

        info!(
            documents_with_issues = report.documents.len(),
            issues = report.issue_count(),
            missing_types = report.missing_document_types.len(),
            "Group validation completed"
        );

        report
    }

    async fn document_issues(
        &self,
        group_id: &GroupId,
        document: &Document,
        type_id: &DocumentTypeId,
    ) -> Result<(Option<VersionId>, Vec<FieldIssue>), DomainError> {
        let specs = required_field_specs(self.catalog.as_ref(), group_id, type_id).await?;
        if specs.is_empty() {
            return Ok((None, Vec::new()));
        }

        let Some(version) = self.versions.find_current(document.id()).await? else {
            return Ok((None, specs.iter().map(FieldIssue::missing).collect()));
        };

        let mut fields: Vec<LayoutField> = self
            .semantic
            .list_page_records(&version.id)
            .await?
            .into_iter()
            .flat_map(|r| r.fields)
            .collect();

        if let Some(record) = self.semantic.find_document_record(&version.id).await? {
            fields.extend(record.fields);
        }

        Ok((Some(version.id), check_fields(&specs, &fields)))
    }

    /// Downgrades `ok` to `has_observations` against the stored status, so a
    /// concurrent rejection or reprocessing is never overwritten.
    async fn flag_observations(&self, document: &Document) -> Result<(), DomainError> {
        let changed = self
            .documents
            .set_status_if(
                document.id(),
                &[DocumentStatus::Ok],
                DocumentStatus::HasObservations,
            )
            .await?;

        if !changed {
            debug!(document_id = %document.id(), "Document status no longer accepts observations");
        }
        Ok(())
    }
}

/// Compares extracted fields with the required specs
fn check_fields(specs: &[FieldSpec], fields: &[LayoutField]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    for spec in specs {
        let present: Vec<&LayoutField> = fields
            .iter()
            .filter(|f| f.base_label() == spec.field_key && !f.text.trim().is_empty())
            .collect();

        if present.is_empty() {
            issues.push(FieldIssue::missing(spec));
            continue;
        }

        if let Some(field) = present.iter().find(|f| f.is_rejected()) {
            issues.push(FieldIssue::invalid(
                spec,
                format!("{} failed identifier verification", field.text),
            ));
            continue;
        }

        let Some(pattern) = spec.pattern.as_deref() else {
            continue;
        };

        match Regex::new(pattern) {
            Ok(regex) => {
                if !present.iter().any(|f| regex.is_match(f.text.trim())) {
                    issues.push(FieldIssue::invalid(
                        spec,
                        format!("'{}' does not match {}", present[0].text.trim(), pattern),
                    ));
                }
            }
            Err(e) => {
                warn!(field_key = %spec.field_key, pattern, error = %e, "Ignoring invalid field pattern");
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{DocumentTypeSpec, MockCatalogProvider};
    use crate::domain::document::{DocumentId, NewVersion, PageId};
    use crate::domain::ingestion::{IssueKind, MockObservationRepository};
    use crate::domain::semantic::SemanticIndexRecord;
    use crate::infrastructure::storage::{
        InMemoryCatalog, InMemoryDocumentStore, InMemoryObservationStore, InMemorySemanticIndex,
    };

    fn contrato() -> DocumentTypeSpec {
        DocumentTypeSpec::new("1", "Contrato").with_required(true)
    }

    fn finiquito() -> DocumentTypeSpec {
        DocumentTypeSpec::new("2", "Finiquito").with_required(true)
    }

    fn group() -> GroupId {
        GroupId::new("grp-1")
    }

    struct Fixture {
        store: Arc<InMemoryDocumentStore>,
        index: Arc<InMemorySemanticIndex>,
        observations: Arc<InMemoryObservationStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(InMemoryDocumentStore::new()),
                index: Arc::new(InMemorySemanticIndex::new()),
                observations: Arc::new(InMemoryObservationStore::new()),
            }
        }

        fn validator(&self, catalog: Arc<dyn CatalogProvider>) -> GroupDocumentValidator {
            GroupDocumentValidator::new(
                self.store.clone(),
                self.store.clone(),
                self.index.clone(),
                self.observations.clone(),
                catalog,
            )
        }

        async fn document(
            &self,
            spec: Option<&DocumentTypeSpec>,
            status: DocumentStatus,
            fields: Vec<LayoutField>,
        ) -> Document {
            let mut document = Document::new(group(), "archivo.pdf");
            document.classify(spec);
            document.set_status(status);
            let document = DocumentRepository::create(self.store.as_ref(), document)
                .await
                .unwrap();

            let version = self
                .store
                .create_current(
                    document.id(),
                    NewVersion::new("archivo.pdf", "grp-1/archivo.pdf", "ana"),
                )
                .await
                .unwrap();
            self.index
                .insert_if_absent(SemanticIndexRecord::for_page(
                    group(),
                    version.id,
                    PageId::generate(),
                    fields,
                ))
                .await
                .unwrap();

            document
        }

        async fn status_of(&self, document: &Document) -> DocumentStatus {
            DocumentRepository::find_by_id(self.store.as_ref(), document.id())
                .await
                .unwrap()
                .unwrap()
                .status()
        }
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(
            InMemoryCatalog::new()
                .with_group_types(group(), vec![contrato(), finiquito()])
                .with_group_fields(
                    group(),
                    contrato().id,
                    vec![
                        FieldSpec::new("RUT_DEUDOR", "RUT deudor").with_pattern(r"^\d+-[\dK]$"),
                        FieldSpec::new("FECHA", "Fecha"),
                        FieldSpec::new("NOTAS", "Notas").optional(),
                    ],
                ),
        )
    }

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot::from_group(vec![contrato(), finiquito()])
    }

    #[tokio::test]
    async fn test_complete_document_has_no_issues() {
        let f = Fixture::new();
        let document = f
            .document(
                Some(&contrato()),
                DocumentStatus::Ok,
                vec![
                    LayoutField::new("RUT_DEUDOR", "12345678-K"),
                    LayoutField::new("FECHA", "2024-01-31"),
                ],
            )
            .await;

        let report = f.validator(catalog()).validate_group(&group(), &snapshot()).await;

        assert_eq!(report.issue_count(), 0);
        assert!(report.errors.is_empty());
        assert_eq!(f.status_of(&document).await, DocumentStatus::Ok);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_fields_set_observations() {
        let f = Fixture::new();
        let document = f
            .document(
                Some(&contrato()),
                DocumentStatus::Ok,
                vec![LayoutField::new("RUT_DEUDOR", "12.345.678")],
            )
            .await;

        let report = f.validator(catalog()).validate_group(&group(), &snapshot()).await;

        let issues = report.issues_for(document.id());
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, IssueKind::InvalidFieldValue);
        assert_eq!(issues[1].kind, IssueKind::MissingRequiredField);
        assert_eq!(issues[1].message, "Missing required field: Fecha");
        assert_eq!(f.status_of(&document).await, DocumentStatus::HasObservations);
    }

    #[tokio::test]
    async fn test_rejected_identifier_is_an_issue_but_rejected_status_stays() {
        let f = Fixture::new();
        let document = f
            .document(
                Some(&contrato()),
                DocumentStatus::Rejected,
                vec![
                    LayoutField::new("RUT_DEUDOR_E", "12345678-K"),
                    LayoutField::new("FECHA", "2024-01-31"),
                ],
            )
            .await;

        let report = f.validator(catalog()).validate_group(&group(), &snapshot()).await;

        let issues = report.issues_for(document.id());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field_key, "RUT_DEUDOR");
        assert_eq!(f.status_of(&document).await, DocumentStatus::Rejected);
    }

    #[tokio::test]
    async fn test_unclassified_documents_are_skipped_and_missing_types_reported() {
        let f = Fixture::new();
        f.document(None, DocumentStatus::Unclassified, Vec::new()).await;
        f.document(
            Some(&contrato()),
            DocumentStatus::Ok,
            vec![
                LayoutField::new("RUT_DEUDOR", "1-9"),
                LayoutField::new("FECHA", "hoy"),
            ],
        )
        .await;

        let report = f.validator(catalog()).validate_group(&group(), &snapshot()).await;

        assert_eq!(report.issue_count(), 0);
        let missing: Vec<&str> = report
            .missing_document_types
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(missing, vec!["Finiquito"]);

        let global = CatalogSnapshot::from_global(vec![contrato(), finiquito()]);
        let report = f.validator(catalog()).validate_group(&group(), &global).await;
        assert!(report.missing_document_types.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_errors_are_reported_not_raised() {
        let f = Fixture::new();
        let document = f
            .document(Some(&contrato()), DocumentStatus::Ok, Vec::new())
            .await;

        let mut provider = MockCatalogProvider::new();
        provider
            .expect_group_field_specs()
            .returning(|_, _| Err(DomainError::storage("connection reset")));

        let report = f
            .validator(Arc::new(provider))
            .validate_group(&group(), &snapshot())
            .await;

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("connection reset"));
        assert_eq!(f.status_of(&document).await, DocumentStatus::Ok);
    }

    /// Rejects every listed document right after listing, as a concurrent
    /// job finishing in between would
    #[derive(Debug)]
    struct RejectingAfterList {
        inner: Arc<InMemoryDocumentStore>,
    }

    #[async_trait::async_trait]
    impl DocumentRepository for RejectingAfterList {
        async fn create(&self, document: Document) -> Result<Document, DomainError> {
            DocumentRepository::create(self.inner.as_ref(), document).await
        }

        async fn update(&self, document: Document) -> Result<Document, DomainError> {
            DocumentRepository::update(self.inner.as_ref(), document).await
        }

        async fn set_status_if(
            &self,
            id: &DocumentId,
            from: &[DocumentStatus],
            to: DocumentStatus,
        ) -> Result<bool, DomainError> {
            self.inner.set_status_if(id, from, to).await
        }

        async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, DomainError> {
            DocumentRepository::find_by_id(self.inner.as_ref(), id).await
        }

        async fn list_by_group(&self, group_id: &GroupId) -> Result<Vec<Document>, DomainError> {
            let listed = self.inner.list_by_group(group_id).await?;
            for document in &listed {
                let mut current = document.clone();
                current.set_status(DocumentStatus::Rejected);
                DocumentRepository::update(self.inner.as_ref(), current).await?;
            }
            Ok(listed)
        }
    }

    #[tokio::test]
    async fn test_concurrent_rejection_is_not_downgraded_to_observations() {
        let f = Fixture::new();
        let document = f
            .document(
                Some(&contrato()),
                DocumentStatus::Ok,
                vec![LayoutField::new("RUT_DEUDOR", "12345678-K")],
            )
            .await;

        let validator = GroupDocumentValidator::new(
            Arc::new(RejectingAfterList {
                inner: f.store.clone(),
            }),
            f.store.clone(),
            f.index.clone(),
            f.observations.clone(),
            catalog(),
        );
        let report = validator.validate_group(&group(), &snapshot()).await;

        assert_eq!(report.issues_for(document.id()).len(), 1);
        assert_eq!(f.status_of(&document).await, DocumentStatus::Rejected);
    }

    #[tokio::test]
    async fn test_set_status_if_only_changes_listed_statuses() {
        let f = Fixture::new();
        let document = f
            .document(Some(&contrato()), DocumentStatus::Processing, Vec::new())
            .await;

        let changed = f
            .store
            .set_status_if(
                document.id(),
                &[DocumentStatus::Ok],
                DocumentStatus::HasObservations,
            )
            .await
            .unwrap();
        assert!(!changed);
        assert_eq!(f.status_of(&document).await, DocumentStatus::Processing);

        let changed = f
            .store
            .set_status_if(
                document.id(),
                &[DocumentStatus::Processing],
                DocumentStatus::Ok,
            )
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(f.status_of(&document).await, DocumentStatus::Ok);
    }

    #[tokio::test]
    async fn test_issues_are_persisted_once_per_version() {
        let f = Fixture::new();
        let document = f
            .document(
                Some(&contrato()),
                DocumentStatus::Ok,
                vec![LayoutField::new("RUT_DEUDOR", "12.345.678")],
            )
            .await;
        let version = f.store.find_current(document.id()).await.unwrap().unwrap();

        let validator = f.validator(catalog());
        validator.validate_group(&group(), &snapshot()).await;
        let report = validator.validate_group(&group(), &snapshot()).await;
        assert_eq!(report.issues_for(document.id()).len(), 2);

        let records = f.observations.list_for_document(document.id()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.version_id.as_ref() == Some(&version.id)));
        assert_eq!(records[0].document_type_id, contrato().id);
        assert_eq!(records[0].issue.kind, IssueKind::InvalidFieldValue);
        assert_eq!(records[1].issue.field_key, "FECHA");
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported_not_raised() {
        let f = Fixture::new();
        let document = f
            .document(Some(&contrato()), DocumentStatus::Ok, Vec::new())
            .await;

        let mut observations = MockObservationRepository::new();
        observations
            .expect_append_all()
            .returning(|_| Err(DomainError::storage("disk full")));
        let validator = GroupDocumentValidator::new(
            f.store.clone(),
            f.store.clone(),
            f.index.clone(),
            Arc::new(observations),
            catalog(),
        );

        let report = validator.validate_group(&group(), &snapshot()).await;

        assert_eq!(report.issues_for(document.id()).len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("disk full"));
        assert_eq!(f.status_of(&document).await, DocumentStatus::HasObservations);
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let specs = vec![FieldSpec::new("FOLIO", "Folio").with_pattern("([")];
        let fields = vec![LayoutField::new("FOLIO", "123")];

        assert!(check_fields(&specs, &fields).is_empty());
    }
}
