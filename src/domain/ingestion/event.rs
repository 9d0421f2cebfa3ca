//! Processing notifications

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::job::JobId;
use crate::domain::catalog::DocumentTypeId;
use crate::domain::document::{Document, DocumentId, DocumentStatus, GroupId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Started,
    Completed,
    Error,
}

/// Document state carried by an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    pub name: String,
    pub status: DocumentStatus,
    pub classified_type: Option<DocumentTypeId>,
}

impl From<&Document> for DocumentSnapshot {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id().clone(),
            name: document.name().to_string(),
            status: document.status(),
            classified_type: document.classified_type().cloned(),
        }
    }
}

/// Progress notification for one document of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingEvent {
    pub job_id: JobId,
    pub group_id: GroupId,
    pub document: DocumentSnapshot,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub emitted_at: DateTime<Utc>,
}

impl ProcessingEvent {
    pub fn new(job_id: JobId, document: &Document, status: EventStatus) -> Self {
        Self {
            job_id,
            group_id: document.group_id().clone(),
            document: DocumentSnapshot::from(document),
            status,
            message: None,
            emitted_at: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Outbound delivery of processing events
#[async_trait]
pub trait EventPublisher: Send + Sync + Debug {
    /// Delivery is best effort; failures are the publisher's concern
    async fn publish(&self, event: ProcessingEvent);
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::RwLock;

    /// Records every published event
    #[derive(Debug, Default)]
    pub struct RecordingEventPublisher {
        events: RwLock<Vec<ProcessingEvent>>,
    }

    impl RecordingEventPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<ProcessingEvent> {
            self.events.read().unwrap().clone()
        }

        pub fn statuses_for(&self, document_id: &DocumentId) -> Vec<EventStatus> {
            self.events()
                .into_iter()
                .filter(|e| &e.document.id == document_id)
                .map(|e| e.status)
                .collect()
        }
    }

    #[async_trait]
    impl EventPublisher for RecordingEventPublisher {
        async fn publish(&self, event: ProcessingEvent) {
            self.events.write().unwrap().push(event);
        }
    }
}
