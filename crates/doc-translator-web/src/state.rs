use doc_translator_core::{
    AppConfig, CancellationToken, DocumentMetadata, DocumentTranslator, Error, ErrorKind, Lang,
    ProgressEvent, TranslationOutcome,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

/// Jobs older than this are dropped by the periodic sweep.
pub const JOB_MAX_AGE: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for JobError {
    fn from(e: &Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Latest observable state of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub progress: Option<ProgressEvent>,
    pub error: Option<JobError>,
}

/// Shared handle publishing [`JobUpdate`]s to SSE subscribers.
///
/// Cloned into the background run so the progress callback can publish
/// without touching the jobs map.
#[derive(Clone)]
pub struct JobChannel(Arc<watch::Sender<JobUpdate>>);

impl JobChannel {
    fn new() -> Self {
        let (tx, _) = watch::channel(JobUpdate {
            status: JobStatus::Running,
            progress: None,
            error: None,
        });
        Self(Arc::new(tx))
    }

    pub fn subscribe(&self) -> watch::Receiver<JobUpdate> {
        self.0.subscribe()
    }

    pub fn snapshot(&self) -> JobUpdate {
        self.0.borrow().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.0.borrow().status
    }

    pub fn record_progress(&self, event: &ProgressEvent) {
        self.0
            .send_modify(|update| update.progress = Some(event.clone()));
    }

    pub fn complete(&self) {
        self.0.send_modify(|update| update.status = JobStatus::Completed);
    }

    pub fn fail(&self, error: &Error) {
        let status = if error.kind() == ErrorKind::Cancelled {
            JobStatus::Cancelled
        } else {
            JobStatus::Failed
        };
        self.0.send_modify(|update| {
            update.status = status;
            update.error = Some(JobError::from(error));
        });
    }
}

/// One uploaded document and its translation run.
pub struct Job {
    pub filename: String,
    pub title: String,
    pub metadata: DocumentMetadata,
    pub target: Lang,
    pub total_pages: usize,
    pub outcome: Option<Arc<TranslationOutcome>>,
    pub cancel: CancellationToken,
    pub channel: JobChannel,
    pub created_at: Instant,
}

impl Job {
    pub fn new(
        filename: String,
        title: String,
        metadata: DocumentMetadata,
        target: Lang,
        total_pages: usize,
    ) -> Self {
        Self {
            filename,
            title,
            metadata,
            target,
            total_pages,
            outcome: None,
            cancel: CancellationToken::new(),
            channel: JobChannel::new(),
            created_at: Instant::now(),
        }
    }
}

/// Global application state
pub struct AppState {
    /// Jobs indexed by UUID
    jobs: RwLock<HashMap<Uuid, Job>>,
    pub translator: Arc<DocumentTranslator>,
}

impl AppState {
    pub fn new(config: AppConfig) -> doc_translator_core::Result<Self> {
        Ok(Self::with_translator(DocumentTranslator::new(config)?))
    }

    pub fn with_translator(translator: DocumentTranslator) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            translator: Arc::new(translator),
        }
    }

    pub async fn create_job(&self, job: Job) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.write().await.insert(id, job);
        id
    }

    /// Get a job by ID string.
    ///
    /// Returns `None` if the ID is not a valid UUID or the job doesn't exist.
    pub async fn get_job(&self, id: &str) -> Option<JobRef<'_>> {
        let uuid = Uuid::parse_str(id).ok()?;
        self.job(uuid).await
    }

    pub async fn job(&self, id: Uuid) -> Option<JobRef<'_>> {
        let jobs = self.jobs.read().await;
        jobs.contains_key(&id).then_some(JobRef { id, state: self })
    }

    pub async fn remove_job(&self, id: Uuid) -> Option<Job> {
        self.jobs.write().await.remove(&id)
    }

    /// Drop jobs older than `max_age`, cancelling any still running.
    pub async fn cleanup_old_jobs(&self, max_age: Duration) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        let now = Instant::now();

        jobs.retain(|_, job| {
            let keep = now.duration_since(job.created_at) < max_age;
            if !keep {
                job.cancel.cancel();
            }
            keep
        });
        before - jobs.len()
    }
}

/// A borrowed handle to a job.
///
/// Locks are taken only inside the synchronous closures, so no guard is ever
/// held across an `.await`.
pub struct JobRef<'a> {
    id: Uuid,
    state: &'a AppState,
}

impl JobRef<'_> {
    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub async fn with_job<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&Job) -> R,
    {
        let jobs = self.state.jobs.read().await;
        jobs.get(&self.id).map(f)
    }

    pub async fn with_job_mut<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Job) -> R,
    {
        let mut jobs = self.state.jobs.write().await;
        jobs.get_mut(&self.id).map(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use doc_translator_core::{CacheConfig, ChunkStatus};

    fn state() -> AppState {
        let config = AppConfig {
            cache: CacheConfig::disabled(),
            ..Default::default()
        };
        AppState::new(config).unwrap()
    }

    fn job() -> Job {
        Job::new(
            "report.pdf".to_string(),
            "report".to_string(),
            DocumentMetadata::default(),
            Lang::new("fr"),
            4,
        )
    }

    #[tokio::test]
    async fn test_job_lookup() {
        let state = state();
        let id = state.create_job(job()).await;

        let job_ref = state.get_job(&id.to_string()).await.unwrap();
        assert_eq!(job_ref.id(), id);
        let filename = job_ref.with_job(|j| j.filename.clone()).await.unwrap();
        assert_eq!(filename, "report.pdf");

        assert!(state.get_job("not-a-uuid").await.is_none());
        assert!(state.get_job(&Uuid::new_v4().to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_updates_reach_subscribers() {
        let channel = JobChannel::new();
        let mut rx = channel.subscribe();
        assert_eq!(channel.status(), JobStatus::Running);

        channel.record_progress(&ProgressEvent {
            chunk_index: 1,
            total_chunks: 2,
            pages_processed: 2,
            total_pages: 4,
            status: ChunkStatus::Success,
        });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().progress.as_ref().unwrap().chunk_index, 1);

        channel.fail(&Error::NoTranslatableContent);
        rx.changed().await.unwrap();
        let update = rx.borrow_and_update().clone();
        assert_eq!(update.status, JobStatus::Failed);
        assert_eq!(update.error.unwrap().kind, ErrorKind::NoTranslatableContent);
    }

    #[test]
    fn test_cancellation_is_not_a_failure() {
        let channel = JobChannel::new();
        channel.fail(&Error::Cancelled);
        assert_eq!(channel.status(), JobStatus::Cancelled);
        assert!(channel.status().is_finished());
    }

    #[tokio::test]
    async fn test_cleanup_cancels_expired_jobs() {
        let state = state();
        let id = state.create_job(job()).await;
        let token = state
            .job(id)
            .await
            .unwrap()
            .with_job(|j| j.cancel.clone())
            .await
            .unwrap();

        assert_eq!(state.cleanup_old_jobs(JOB_MAX_AGE).await, 0);
        assert!(!token.is_cancelled());

        assert_eq!(state.cleanup_old_jobs(Duration::ZERO).await, 1);
        assert!(token.is_cancelled());
        assert!(state.get_job(&id.to_string()).await.is_none());
    }
}
