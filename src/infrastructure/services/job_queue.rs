//! Bounded ingestion queue served by a fixed pool of workers

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::IngestionCoordinator;
use crate::config::PipelineConfig;
use crate::domain::DomainError;
use crate::domain::document::{DocumentId, GroupId};
use crate::domain::ingestion::{
    BatchSummary, IngestionJob, JobAck, JobId, JobRecord, JobStatus, SourceFile,
};
use crate::infrastructure::metrics;

/// Finished job records kept for status queries
pub const DEFAULT_RETAINED_JOBS: usize = 1024;

/// Queue sizing
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub workers: usize,
    pub capacity: usize,
    pub job_timeout: Option<Duration>,
    /// Finished records kept before the oldest are evicted
    pub retained_jobs: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            capacity: 64,
            job_timeout: None,
            retained_jobs: DEFAULT_RETAINED_JOBS,
        }
    }
}

impl From<&PipelineConfig> for QueueConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            capacity: config.queue_capacity.max(1),
            job_timeout: config.job_timeout(),
            retained_jobs: config.retained_jobs,
        }
    }
}

/// Status records and cancellation tokens of submitted jobs.
///
/// Only the `retained` most recently finished records are kept.
#[derive(Debug)]
pub struct JobTracker {
    records: RwLock<HashMap<JobId, JobRecord>>,
    finished: Mutex<VecDeque<JobId>>,
    tokens: RwLock<HashMap<JobId, CancellationToken>>,
    changed: Notify,
    retained: usize,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RETAINED_JOBS)
    }
}

impl JobTracker {
    pub fn new(retained: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            finished: Mutex::new(VecDeque::new()),
            tokens: RwLock::new(HashMap::new()),
            changed: Notify::new(),
            retained,
        }
    }

    fn register(&self, job: &IngestionJob) -> Result<CancellationToken, DomainError> {
        let token = CancellationToken::new();

        self.records
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?
            .insert(job.id.clone(), JobRecord::pending(job));
        self.tokens
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?
            .insert(job.id.clone(), token.clone());

        Ok(token)
    }

    pub fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(records.get(job_id).cloned())
    }

    fn update<F>(&self, job_id: &JobId, apply: F) -> Result<JobRecord, DomainError>
    where
        F: FnOnce(&mut JobRecord) -> Result<(), DomainError>,
    {
        let updated = {
            let mut records = self
                .records
                .write()
                .map_err(|_| DomainError::internal("Failed to acquire lock"))?;
            let record = records
                .get_mut(job_id)
                .ok_or_else(|| DomainError::not_found(format!("Job '{}' not found", job_id)))?;

            let was_terminal = record.status().is_terminal();
            apply(record)?;
            let updated = record.clone();

            if !was_terminal && updated.status().is_terminal() {
                self.evict_finished(&mut records, job_id)?;
            }
            updated
        };

        self.changed.notify_waiters();
        Ok(updated)
    }

    /// Records a job as finished and drops the oldest finished records
    /// beyond the retention limit
    fn evict_finished(
        &self,
        records: &mut HashMap<JobId, JobRecord>,
        job_id: &JobId,
    ) -> Result<(), DomainError> {
        let mut finished = self
            .finished
            .lock()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        finished.push_back(job_id.clone());
        while finished.len() > self.retained {
            if let Some(oldest) = finished.pop_front() {
                records.remove(&oldest);
                debug!(job_id = %oldest, "Evicted finished job record");
            }
        }
        Ok(())
    }

    fn token(&self, job_id: &JobId) -> Option<CancellationToken> {
        self.tokens
            .read()
            .ok()
            .and_then(|tokens| tokens.get(job_id).cloned())
    }

    fn release(&self, job_id: &JobId) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.remove(job_id);
        }
    }

    /// Cancels a job. Pending jobs become cancelled at once; running jobs
    /// are stopped by their worker.
    fn cancel(&self, job_id: &JobId) -> Result<JobRecord, DomainError> {
        let record = self
            .get(job_id)?
            .ok_or_else(|| DomainError::not_found(format!("Job '{}' not found", job_id)))?;

        if record.status().is_terminal() {
            return Err(DomainError::conflict(format!(
                "Job '{}' already {}",
                job_id,
                record.status()
            )));
        }

        if let Some(token) = self.token(job_id) {
            token.cancel();
        }

        if record.status() == JobStatus::Pending {
            return self.update(job_id, |r| r.mark_cancelled("Cancelled before start"));
        }

        Ok(record)
    }

    /// Resolves once the job reaches a terminal status
    async fn wait(&self, job_id: &JobId) -> Result<JobRecord, DomainError> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let record = self
                .get(job_id)?
                .ok_or_else(|| DomainError::not_found(format!("Job '{}' not found", job_id)))?;
            if record.status().is_terminal() {
                return Ok(record);
            }

            notified.await;
        }
    }
}

/// How a worker's run of a job ended
enum JobEnd {
    Finished(Result<BatchSummary, DomainError>),
    Cancelled,
    TimedOut(Duration),
}

/// Accepts jobs, acknowledges them immediately and runs them on workers.
///
/// Pages of a job run sequentially; distinct jobs run concurrently, one per
/// worker.
#[derive(Debug)]
pub struct IngestionQueue {
    coordinator: Arc<IngestionCoordinator>,
    tracker: Arc<JobTracker>,
    sender: RwLock<Option<mpsc::Sender<IngestionJob>>>,
    depth: Arc<AtomicUsize>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl IngestionQueue {
    /// Spawns the workers. Must be called inside a Tokio runtime.
    pub fn start(coordinator: Arc<IngestionCoordinator>, config: QueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let tracker = Arc::new(JobTracker::new(config.retained_jobs));
        let depth = Arc::new(AtomicUsize::new(0));

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    coordinator.clone(),
                    tracker.clone(),
                    receiver.clone(),
                    depth.clone(),
                    config.job_timeout,
                ))
            })
            .collect();

        info!(
            workers = config.workers.max(1),
            capacity = config.capacity,
            "Ingestion queue started"
        );

        Self {
            coordinator,
            tracker,
            sender: RwLock::new(Some(sender)),
            depth,
            workers: Mutex::new(workers),
        }
    }

    pub fn coordinator(&self) -> &IngestionCoordinator {
        &self.coordinator
    }

    /// Registers the group's documents and queues their processing
    #[instrument(skip(self, files), fields(group_id = %group_id))]
    pub async fn submit_group_upload(
        &self,
        group_id: GroupId,
        files: Vec<SourceFile>,
        actor: &str,
    ) -> Result<JobAck, DomainError> {
        let job = self
            .coordinator
            .register_group_upload(group_id, files, actor)
            .await?;
        self.enqueue(job).await
    }

    /// Queues a new version of an existing document
    #[instrument(skip(self, file, comment), fields(document_id = %document_id))]
    pub async fn submit_new_version(
        &self,
        document_id: DocumentId,
        file: SourceFile,
        comment: Option<String>,
        actor: &str,
    ) -> Result<JobAck, DomainError> {
        let job = self
            .coordinator
            .prepare_new_version(document_id, file, comment, actor)
            .await?;
        self.enqueue(job).await
    }

    pub fn status(&self, job_id: &JobId) -> Result<Option<JobRecord>, DomainError> {
        self.tracker.get(job_id)
    }

    pub fn cancel(&self, job_id: &JobId) -> Result<JobRecord, DomainError> {
        let record = self.tracker.cancel(job_id)?;
        info!(job_id = %job_id, status = %record.status(), "Job cancellation requested");
        Ok(record)
    }

    /// Waits until the job completes, fails or is cancelled
    pub async fn wait(&self, job_id: &JobId) -> Result<JobRecord, DomainError> {
        self.tracker.wait(job_id).await
    }

    /// Stops accepting jobs and waits for queued ones to drain
    pub async fn shutdown(&self) {
        let sender = self.sender.write().ok().and_then(|mut s| s.take());
        drop(sender);

        let workers = self
            .workers
            .lock()
            .map(|mut w| std::mem::take(&mut *w))
            .unwrap_or_default();

        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "Ingestion worker ended abnormally");
            }
        }

        info!("Ingestion queue stopped");
    }

    async fn enqueue(&self, job: IngestionJob) -> Result<JobAck, DomainError> {
        let ack = JobAck {
            job_id: job.id.clone(),
            document_ids: job.document_ids(),
        };

        let sender = self
            .sender
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?
            .clone();
        let Some(sender) = sender else {
            self.coordinator.abandon(&job, "Ingestion queue is shut down").await;
            return Err(DomainError::internal("Ingestion queue is shut down"));
        };

        self.tracker.register(&job)?;
        metrics::set_queue_depth(self.depth.fetch_add(1, Ordering::SeqCst) + 1);

        if let Err(mpsc::error::SendError(job)) = sender.send(job).await {
            metrics::set_queue_depth(self.depth.fetch_sub(1, Ordering::SeqCst) - 1);
            self.tracker.update(&job.id, |r| r.mark_cancelled("Ingestion queue is shut down"))?;
            self.coordinator.abandon(&job, "Ingestion queue is shut down").await;
            return Err(DomainError::internal("Ingestion queue is shut down"));
        }

        info!(job_id = %ack.job_id, documents = ack.document_ids.len(), "Job queued");
        Ok(ack)
    }
}

async fn worker_loop(
    worker: usize,
    coordinator: Arc<IngestionCoordinator>,
    tracker: Arc<JobTracker>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<IngestionJob>>>,
    depth: Arc<AtomicUsize>,
    job_timeout: Option<Duration>,
) {
    debug!(worker, "Ingestion worker started");

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        metrics::set_queue_depth(depth.fetch_sub(1, Ordering::SeqCst).saturating_sub(1));

        run_job(&coordinator, &tracker, job, job_timeout).await;
    }

    debug!(worker, "Ingestion worker stopped");
}

#[instrument(skip_all, fields(job_id = %job.id, kind = job.target.kind()))]
async fn run_job(
    coordinator: &IngestionCoordinator,
    tracker: &JobTracker,
    job: IngestionJob,
    job_timeout: Option<Duration>,
) {
    let Some(token) = tracker.token(&job.id) else {
        warn!("Dequeued job is not tracked");
        return;
    };

    if token.is_cancelled() {
        coordinator.abandon(&job, "Cancelled before start").await;
        tracker.release(&job.id);
        return;
    }

    // A cancel landing after the token check leaves the record terminal
    if let Err(e) = tracker.update(&job.id, |r| r.mark_running()) {
        warn!(error = %e, "Job cannot start");
        coordinator.abandon(&job, "Cancelled before start").await;
        tracker.release(&job.id);
        return;
    }

    let started = Instant::now();
    let end = tokio::select! {
        _ = token.cancelled() => JobEnd::Cancelled,
        end = execute(coordinator, &job, &token, job_timeout) => end,
    };

    let result = match end {
        JobEnd::Finished(Ok(summary)) => tracker.update(&job.id, |r| r.mark_completed(summary)),
        JobEnd::Finished(Err(DomainError::Cancelled { message })) => {
            tracker.update(&job.id, |r| r.mark_cancelled(message))
        }
        JobEnd::Finished(Err(e)) => tracker.update(&job.id, |r| r.mark_failed(e.to_string())),
        JobEnd::Cancelled => {
            coordinator.abandon(&job, "Job cancelled").await;
            tracker.update(&job.id, |r| r.mark_cancelled("Job cancelled"))
        }
        JobEnd::TimedOut(limit) => {
            let reason = format!("Job timed out after {} ms", limit.as_millis());
            warn!(reason = %reason, "Ingestion job timed out");
            coordinator.abandon(&job, &reason).await;
            tracker.update(&job.id, |r| r.mark_failed(reason))
        }
    };
    tracker.release(&job.id);

    match result {
        Ok(record) => {
            metrics::record_job(job.target.kind(), record.status().as_str(), started.elapsed());
            info!(status = %record.status(), elapsed_ms = started.elapsed().as_millis() as u64, "Job finished");
        }
        Err(e) => warn!(error = %e, "Failed to record job result"),
    }
}

async fn execute(
    coordinator: &IngestionCoordinator,
    job: &IngestionJob,
    token: &CancellationToken,
    job_timeout: Option<Duration>,
) -> JobEnd {
    match job_timeout {
        Some(limit) => match tokio::time::timeout(limit, coordinator.run(job, token)).await {
            Ok(result) => JobEnd::Finished(result),
            Err(_) => JobEnd::TimedOut(limit),
        },
        None => JobEnd::Finished(coordinator.run(job, token).await),
    }
}
