//! In-process fan-out of processing events

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::domain::ingestion::{EventPublisher, ProcessingEvent};

const DEFAULT_CAPACITY: usize = 256;

/// Publishes events to every subscriber of a broadcast channel.
///
/// Slow subscribers lose the oldest events once the channel is full.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<ProcessingEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessingEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: ProcessingEvent) {
        info!(
            job_id = %event.job_id,
            group_id = %event.group_id,
            document_id = %event.document.id,
            status = ?event.status,
            document_status = %event.document.status,
            "Processing event"
        );

        if self.sender.send(event).is_err() {
            debug!("No subscribers for processing event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{Document, GroupId};
    use crate::domain::ingestion::{EventStatus, JobId};

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let publisher = BroadcastEventPublisher::default();
        let mut receiver = publisher.subscribe();
        let document = Document::new(GroupId::new("g-1"), "a.pdf");

        publisher
            .publish(ProcessingEvent::new(
                JobId::new("job-1"),
                &document,
                EventStatus::Started,
            ))
            .await;

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.status, EventStatus::Started);
        assert_eq!(&event.document.id, document.id());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_fail() {
        let publisher = BroadcastEventPublisher::new(1);
        let document = Document::new(GroupId::new("g-1"), "a.pdf");

        publisher
            .publish(ProcessingEvent::new(
                JobId::new("job-1"),
                &document,
                EventStatus::Error,
            ))
            .await;
    }
}
