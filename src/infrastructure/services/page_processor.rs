//! Per-page processing: render output ingestion, extraction dispatch and
//! identifier correction

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use super::IdentifierVerifier;
use crate::domain::DomainError;
use crate::domain::document::{DocumentId, DocumentPage, GroupId, PageRepository, VersionId};
use crate::domain::extraction::{ExtractionRequest, ExtractionService};
use crate::domain::files::PageImageStore;
use crate::domain::ingestion::{DocumentOutcome, PageOutcome};
use crate::domain::rendering::{RenderedPayload, parse_page_number};
use crate::domain::semantic::{LayoutField, REJECTED_LABEL_SUFFIX, SemanticIndexRepository};
use crate::domain::verification::{NationalIdentifier, VerificationOutcome};
use crate::infrastructure::metrics;

/// A decoded page image written to page storage
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page_number: u32,
    pub filename: String,
    pub image_path: String,
    pub content: Bytes,
}

/// What every page of one version shares
#[derive(Debug, Clone)]
pub struct PageContext {
    pub group_id: GroupId,
    pub document_id: DocumentId,
    pub version_id: VersionId,
    /// Whether the classified type asks for field extraction
    pub analyze: bool,
}

/// Result of rewriting identifier fields of one layout
#[derive(Debug, Default)]
struct Corrections {
    fields: Vec<LayoutField>,
    changed: usize,
    flagged: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PageProcessor {
    pages: Arc<dyn PageRepository>,
    semantic: Arc<dyn SemanticIndexRepository>,
    extractor: Arc<dyn ExtractionService>,
    images: Arc<dyn PageImageStore>,
    verifier: IdentifierVerifier,
    identifier_labels: HashSet<String>,
}

impl PageProcessor {
    pub fn new(
        pages: Arc<dyn PageRepository>,
        semantic: Arc<dyn SemanticIndexRepository>,
        extractor: Arc<dyn ExtractionService>,
        images: Arc<dyn PageImageStore>,
        verifier: IdentifierVerifier,
        identifier_labels: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            pages,
            semantic,
            extractor,
            images,
            verifier,
            identifier_labels: identifier_labels.into_iter().collect(),
        }
    }

    /// Decodes rendered payloads and writes them to page storage.
    ///
    /// Payloads without a `_p<N>` suffix, with undecodable content or with a
    /// page number already seen are recorded on `outcome` and produce no
    /// page. Pages come back ordered by page number.
    #[instrument(skip(self, payloads, outcome), fields(version_id = %version_id, payloads = payloads.len()))]
    pub async fn ingest_render_output(
        &self,
        version_id: &VersionId,
        payloads: Vec<RenderedPayload>,
        outcome: &mut DocumentOutcome,
    ) -> Vec<RenderedPage> {
        let mut pages: BTreeMap<u32, RenderedPage> = BTreeMap::new();

        for payload in payloads {
            let Some(page_number) = parse_page_number(&payload.filename) else {
                warn!(filename = %payload.filename, "Rendered image has no page suffix");
                outcome.record_invalid_payload(format!(
                    "{}: missing _p<N> page suffix",
                    payload.filename
                ));
                continue;
            };

            if pages.contains_key(&page_number) {
                warn!(filename = %payload.filename, page_number, "Duplicate rendered page");
                outcome.record_invalid_payload(format!(
                    "{}: duplicate page {}",
                    payload.filename, page_number
                ));
                continue;
            }

            let content = match STANDARD.decode(payload.content_base64.trim()) {
                Ok(content) => Bytes::from(content),
                Err(e) => {
                    warn!(filename = %payload.filename, error = %e, "Rendered image is not valid base64");
                    outcome.record_invalid_payload(format!(
                        "{}: invalid base64: {}",
                        payload.filename, e
                    ));
                    continue;
                }
            };

            let image_path = match self
                .images
                .store(version_id, &payload.filename, content.clone())
                .await
            {
                Ok(path) => path,
                Err(e) => {
                    warn!(filename = %payload.filename, error = %e, "Failed to store page image");
                    outcome.record_invalid_payload(format!(
                        "{}: image not stored: {}",
                        payload.filename, e
                    ));
                    continue;
                }
            };

            pages.insert(
                page_number,
                RenderedPage {
                    page_number,
                    filename: payload.filename,
                    image_path,
                    content,
                },
            );
        }

        pages.into_values().collect()
    }

    /// Processes pages sequentially, recording each result on `outcome`
    pub async fn process_pages(
        &self,
        context: &PageContext,
        pages: &[RenderedPage],
        outcome: &mut DocumentOutcome,
    ) -> Result<(), DomainError> {
        for page in pages {
            let page_outcome = self.process_page(context, page).await?;
            outcome.record_page(page.page_number, page_outcome);
        }
        Ok(())
    }

    /// Creates the page row, then extracts and corrects it when the type is analyzed.
    ///
    /// Extraction failures become `PageOutcome::Failed`; storage errors propagate.
    #[instrument(
        skip(self, context, page),
        fields(document_id = %context.document_id, page_number = page.page_number)
    )]
    pub async fn process_page(
        &self,
        context: &PageContext,
        page: &RenderedPage,
    ) -> Result<PageOutcome, DomainError> {
        let row = self
            .pages
            .create(DocumentPage::new(
                context.version_id.clone(),
                page.page_number,
                page.image_path.clone(),
            ))
            .await?;

        if !context.analyze {
            metrics::record_page(PageOutcome::NotAnalyzed.as_str());
            return Ok(PageOutcome::NotAnalyzed);
        }

        let request = ExtractionRequest {
            group_id: context.group_id.clone(),
            document_id: context.document_id.clone(),
            version_id: context.version_id.clone(),
            page_id: row.id.clone(),
            page_number: page.page_number,
            image_filename: page.filename.clone(),
            image: page.content.clone(),
        };

        if let Err(e) = self.extractor.extract(&request).await {
            warn!(error = %e, "Extraction failed, skipping page");
            let outcome = PageOutcome::Failed {
                reason: e.to_string(),
            };
            metrics::record_page(outcome.as_str());
            return Ok(outcome);
        }

        let Some(mut record) = self.semantic.find_by_page(&row.id).await? else {
            warn!(page_id = %row.id, "Extraction reported success but left no record");
            metrics::record_page("clean");
            return Ok(PageOutcome::Clean {
                corrected_fields: 0,
            });
        };

        let needs_link = record.document_id.as_ref() != Some(&context.document_id);
        if needs_link {
            record.link_document(context.document_id.clone());
        }

        let corrections = self.correct_identifiers(record.fields.clone()).await;

        if corrections.changed > 0 {
            record.replace_fields(corrections.fields.clone());
        }
        if needs_link || corrections.changed > 0 {
            self.semantic.update(record).await?;
        }
        if corrections.changed > 0 {
            self.pages.update_layout(&row.id, corrections.fields).await?;
        }

        let outcome = if corrections.flagged.is_empty() {
            PageOutcome::Clean {
                corrected_fields: corrections.changed,
            }
        } else {
            PageOutcome::Flagged {
                labels: corrections.flagged,
            }
        };

        info!(outcome = outcome.as_str(), "Page processed");
        metrics::record_page(outcome.as_str());
        Ok(outcome)
    }

    async fn correct_identifiers(&self, mut fields: Vec<LayoutField>) -> Corrections {
        let mut changed = 0;
        let mut flagged = Vec::new();

        for field in fields.iter_mut() {
            if !self.identifier_labels.contains(&field.label) {
                continue;
            }

            let Some(identifier) = NationalIdentifier::parse(&field.text) else {
                debug!(label = %field.label, "Field text is not an identifier");
                continue;
            };
            let canonical = identifier.canonical();

            match self.verifier.verify(&identifier).await {
                VerificationOutcome::Verified { .. } => {
                    if field.text != canonical {
                        field.text = canonical;
                        changed += 1;
                    }
                }
                VerificationOutcome::Rejected { attempts, reason } => {
                    warn!(
                        label = %field.label,
                        attempts,
                        reason = %reason.message(),
                        "Identifier failed verification"
                    );
                    flagged.push(field.label.clone());
                    field.label.push_str(REJECTED_LABEL_SUFFIX);
                    field.text = canonical;
                    changed += 1;
                }
            }
        }

        Corrections {
            fields,
            changed,
            flagged,
        }
    }
}
