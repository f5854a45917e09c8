//! In-memory registry of batch runs.
//!
//! Each batch runs on its own task; the registry is what status, results and
//! export handlers read from. A job's `BatchResult` is set once, when the run ends.
//! Only the newest `max_finished` finished jobs are kept; running jobs are never pruned.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;
use uuid::Uuid;

use crate::outreach::batch::{LogProgress, ProgressReporter};
use crate::outreach::models::{BatchResult, Contact, ContactFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub progress: f32,
    /// "First @ Company" of the contact currently being generated.
    pub current_contact: Option<String>,
    pub failures: Vec<ContactFailure>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<BatchResult>,
    pub cancel: CancellationToken,
}

impl BatchJob {
    fn new(total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Running,
            total,
            processed: 0,
            succeeded: 0,
            progress: 0.0,
            current_contact: None,
            failures: Vec::new(),
            error: None,
            created_at: Utc::now(),
            finished_at: None,
            result: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Shared handle to all batch jobs. Cheap to clone.
#[derive(Clone)]
pub struct BatchJobs {
    inner: Arc<RwLock<HashMap<Uuid, BatchJob>>>,
    tasks: TaskTracker,
    max_finished: usize,
}

impl BatchJobs {
    pub fn new(max_finished: usize) -> Self {
        Self {
            inner: Arc::default(),
            tasks: TaskTracker::new(),
            max_finished,
        }
    }

    /// Runs a batch on a tracked task so shutdown can wait for it.
    pub fn spawn<F>(&self, run: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(run);
    }

    /// Stops accepting new tasks and waits for every spawned batch to return.
    pub async fn wait_for_running(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    /// Registers a new running job and returns its id and cancellation token.
    pub async fn create(&self, total: usize) -> (Uuid, CancellationToken) {
        let job = BatchJob::new(total);
        let id = job.id;
        let cancel = job.cancel.clone();
        self.inner.write().await.insert(id, job);
        (id, cancel)
    }

    pub async fn get(&self, id: Uuid) -> Option<BatchJob> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Requests cancellation. Returns false if the job does not exist.
    pub async fn cancel(&self, id: Uuid) -> bool {
        match self.inner.read().await.get(&id) {
            Some(job) => {
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every job still running. Returns how many were signalled.
    pub async fn cancel_all(&self) -> usize {
        let jobs = self.inner.read().await;
        let mut count = 0;
        for job in jobs.values().filter(|j| j.status == JobStatus::Running) {
            job.cancel.cancel();
            count += 1;
        }
        count
    }

    /// Stores the final result, replacing whatever the job held before.
    pub async fn finish(&self, id: Uuid, result: BatchResult) {
        let mut jobs = self.inner.write().await;
        if let Some(job) = jobs.get_mut(&id) {
            job.status = if result.cancelled {
                JobStatus::Cancelled
            } else {
                JobStatus::Completed
            };
            job.processed = result.attempted;
            job.succeeded = result.succeeded();
            job.failures = result.failures.clone();
            job.current_contact = None;
            job.finished_at = Some(Utc::now());
            job.result = Some(result);
        }
        prune_finished(&mut jobs, self.max_finished);
    }

    /// Marks a job that could not run at all.
    pub async fn fail(&self, id: Uuid, message: String) {
        let mut jobs = self.inner.write().await;
        if let Some(job) = jobs.get_mut(&id) {
            job.status = JobStatus::Failed;
            job.error = Some(message);
            job.current_contact = None;
            job.finished_at = Some(Utc::now());
        }
        prune_finished(&mut jobs, self.max_finished);
    }

    async fn update(&self, id: Uuid, f: impl FnOnce(&mut BatchJob)) {
        if let Some(job) = self.inner.write().await.get_mut(&id) {
            f(job);
        }
    }
}

/// Drops the oldest finished jobs beyond `keep`.
fn prune_finished(jobs: &mut HashMap<Uuid, BatchJob>, keep: usize) {
    let mut finished: Vec<(DateTime<Utc>, Uuid)> = jobs
        .values()
        .filter_map(|job| job.finished_at.map(|at| (at, job.id)))
        .collect();
    if finished.len() <= keep {
        return;
    }

    finished.sort();
    let excess = finished.len() - keep;
    for (_, id) in finished.into_iter().take(excess) {
        jobs.remove(&id);
        debug!("Pruned finished batch {id}");
    }
}

/// Writes batch progress into the job registry, and logs it.
pub struct JobProgress {
    jobs: BatchJobs,
    id: Uuid,
}

impl JobProgress {
    pub fn new(jobs: BatchJobs, id: Uuid) -> Self {
        Self { jobs, id }
    }
}

#[async_trait]
impl ProgressReporter for JobProgress {
    async fn contact_started(&self, index: usize, total: usize, contact: &Contact) {
        LogProgress.contact_started(index, total, contact).await;
        let label = format!("{} @ {}", contact.first_name, contact.company);
        self.jobs
            .update(self.id, |job| job.current_contact = Some(label))
            .await;
    }

    async fn contact_succeeded(&self, index: usize, total: usize, progress: f32) {
        LogProgress.contact_succeeded(index, total, progress).await;
        self.jobs
            .update(self.id, |job| {
                job.processed = index + 1;
                job.succeeded += 1;
                job.progress = progress;
            })
            .await;
    }

    async fn contact_failed(&self, index: usize, total: usize, failure: &ContactFailure) {
        LogProgress.contact_failed(index, total, failure).await;
        let failure = failure.clone();
        self.jobs
            .update(self.id, |job| {
                job.processed = index + 1;
                job.failures.push(failure);
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outreach::testing::contact;

    fn failure(index: usize) -> ContactFailure {
        ContactFailure {
            index,
            email: "bob@initech.com".to_string(),
            first_name: "Bob".to_string(),
            company: "Initech".to_string(),
            message: "Failed to generate email 1: LLM returned empty content".to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_job_is_running_and_empty() {
        let jobs = BatchJobs::new(10);
        let (id, cancel) = jobs.create(3).await;
        let job = jobs.get(id).await.unwrap();

        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.total, 3);
        assert_eq!(job.processed, 0);
        assert!(job.result.is_none());
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_progress_events_update_job() {
        let jobs = BatchJobs::new(10);
        let (id, _) = jobs.create(2).await;
        let reporter = JobProgress::new(jobs.clone(), id);

        reporter
            .contact_started(0, 2, &contact("Ana", "Acme"))
            .await;
        assert_eq!(
            jobs.get(id).await.unwrap().current_contact.as_deref(),
            Some("Ana @ Acme")
        );

        reporter.contact_succeeded(0, 2, 0.5).await;
        reporter.contact_failed(1, 2, &failure(1)).await;

        let job = jobs.get(id).await.unwrap();
        assert_eq!(job.processed, 2);
        assert_eq!(job.succeeded, 1);
        assert!((job.progress - 0.5).abs() < f32::EPSILON);
        assert_eq!(job.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_finish_sets_result_and_status() {
        let jobs = BatchJobs::new(10);
        let (id, _) = jobs.create(1).await;
        jobs.finish(
            id,
            BatchResult {
                results: vec![],
                failures: vec![failure(0)],
                attempted: 1,
                cancelled: false,
            },
        )
        .await;

        let job = jobs.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.failures.len(), 1);
        assert!(job.finished_at.is_some());
        assert_eq!(job.result.unwrap().attempted, 1);
    }

    #[tokio::test]
    async fn test_cancel_trips_token() {
        let jobs = BatchJobs::new(10);
        let (id, cancel) = jobs.create(1).await;

        assert!(jobs.cancel(id).await);
        assert!(cancel.is_cancelled());
        assert!(!jobs.cancel(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_cancel_all_skips_finished_jobs() {
        let jobs = BatchJobs::new(10);
        let (_, running) = jobs.create(1).await;
        let (done_id, done) = jobs.create(1).await;
        jobs.finish(done_id, BatchResult::default()).await;

        assert_eq!(jobs.cancel_all().await, 1);
        assert!(running.is_cancelled());
        assert!(!done.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_result_marks_job_cancelled() {
        let jobs = BatchJobs::new(10);
        let (id, _) = jobs.create(3).await;
        jobs.finish(
            id,
            BatchResult {
                cancelled: true,
                ..BatchResult::default()
            },
        )
        .await;

        assert_eq!(jobs.get(id).await.unwrap().status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_pruning_drops_oldest_finished_and_keeps_running() {
        let jobs = BatchJobs::new(2);
        let (running, _) = jobs.create(1).await;
        let mut finished = Vec::new();
        for _ in 0..3 {
            let (id, _) = jobs.create(1).await;
            finished.push(id);
        }

        for id in &finished {
            jobs.finish(*id, BatchResult::default()).await;
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        assert!(jobs.get(finished[0]).await.is_none());
        assert!(jobs.get(finished[1]).await.is_some());
        assert!(jobs.get(finished[2]).await.is_some());
        assert_eq!(jobs.get(running).await.unwrap().status, JobStatus::Running);
        assert_eq!(jobs.inner.read().await.len(), 3);
    }

    #[tokio::test]
    async fn test_retention_bound_holds_across_many_batches() {
        let jobs = BatchJobs::new(5);
        for _ in 0..50 {
            let (id, _) = jobs.create(1).await;
            jobs.finish(id, BatchResult::default()).await;
        }
        let (failed, _) = jobs.create(1).await;
        jobs.fail(failed, "boom".to_string()).await;

        assert_eq!(jobs.inner.read().await.len(), 5);
    }

    #[tokio::test]
    async fn test_wait_for_running_lets_spawned_batch_finish() {
        let jobs = BatchJobs::new(10);
        let (id, _) = jobs.create(1).await;
        let registry = jobs.clone();
        jobs.spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            registry.finish(id, BatchResult::default()).await;
        });

        jobs.wait_for_running().await;
        assert_eq!(jobs.get(id).await.unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_fail_records_error() {
        let jobs = BatchJobs::new(10);
        let (id, _) = jobs.create(3).await;
        jobs.fail(id, "boom".to_string()).await;

        let job = jobs.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }
}
