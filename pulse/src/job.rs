use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::telemetry;

/// Unique identifier assigned to a submitted background job.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a background job.
///
/// `Done` and `Failed` are terminal: once reached, the record is never
/// mutated again.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time snapshot of a tracked job, returned from status queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: JobId,
    pub description: String,
    pub state: JobState,
    /// Progress units reported so far by the running callable.
    pub current: u64,
    /// Expected total units, as declared at submission.
    pub total: u64,
    /// Fault message, set only when `state` is `Failed`.
    pub error: Option<String>,
    /// Return value of the callable, set only when `state` is `Done`.
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct JobRecord {
    id: JobId,
    description: String,
    state: JobState,
    current: u64,
    total: u64,
    error: Option<String>,
    result: Option<Value>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    fn snapshot(&self) -> JobStatus {
        JobStatus {
            id: self.id,
            description: self.description.clone(),
            state: self.state,
            current: self.current,
            total: self.total,
            error: self.error.clone(),
            result: self.result.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

#[derive(Debug, Default)]
struct JobTable {
    jobs: HashMap<JobId, JobRecord>,
    // Insertion order, for terminal-record eviction.
    order: VecDeque<JobId>,
}

impl JobTable {
    /// Drop the oldest terminal records until we are back under `max_history`.
    /// Running jobs are never evicted.
    fn evict_terminal(&mut self, max_history: usize) {
        while self.jobs.len() > max_history {
            let Some(pos) = self
                .order
                .iter()
                .position(|id| self.jobs.get(id).is_some_and(|j| j.state.is_terminal()))
            else {
                break;
            };
            if let Some(id) = self.order.remove(pos) {
                self.jobs.remove(&id);
                tracing::debug!(job_id = %id, "evicted terminal job record");
            }
        }
    }
}

/// Configuration for the background job manager.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobManagerConfig {
    /// Maximum number of job records to retain. When exceeded, the oldest
    /// terminal records are evicted first; running jobs are never evicted.
    pub max_history: usize,
}

impl JobManagerConfig {
    /// Set the maximum retained history.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self { max_history: 1024 }
    }
}

/// Handle passed to a running callable for reporting progress.
///
/// Advancing the progress counter is the only mutation a callable may make
/// against its job; `state`, `error`, and `result` are set exclusively by
/// the manager's completion wrapper.
#[derive(Clone, Debug)]
pub struct ProgressHandle {
    id: JobId,
    table: Arc<Mutex<JobTable>>,
}

impl ProgressHandle {
    /// The job this handle reports for.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Increment the job's progress counter by `step`.
    ///
    /// Ignored once the job has reached a terminal state. The counter is not
    /// clamped to `total`; honoring the declared total is the callable's
    /// contract.
    pub async fn advance(&self, step: u64) {
        let mut table = self.table.lock().await;
        if let Some(record) = table.jobs.get_mut(&self.id) {
            if record.state == JobState::Running {
                record.current += step;
            }
        }
    }
}

/// Manager for long operations that run out-of-band.
///
/// Submitting a callable immediately returns a [`JobId`]; the work runs on
/// its own task while callers poll [`JobManager::status`] for progress and
/// terminal state. The manager exclusively owns every record — callables
/// only ever see a [`ProgressHandle`].
///
/// No cancellation, retry, or timeout is applied at this layer: a submitted
/// job runs to completion or to an uncaught fault.
#[derive(Clone, Debug)]
pub struct JobManager {
    config: JobManagerConfig,
    table: Arc<Mutex<JobTable>>,
}

impl JobManager {
    /// Create a manager with the given configuration.
    pub fn new(config: JobManagerConfig) -> Self {
        Self {
            config,
            table: Arc::new(Mutex::new(JobTable::default())),
        }
    }

    /// Submit a callable for background execution.
    ///
    /// The job is tracked in `Running` state before this returns, so an
    /// immediate status query always finds it. The call never blocks on the
    /// job's completion.
    pub async fn submit<F, Fut>(
        &self,
        description: impl Into<String>,
        total: u64,
        work: F,
    ) -> JobId
    where
        F: FnOnce(ProgressHandle) -> Fut,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let id = JobId::new();
        let description = description.into();

        {
            let mut table = self.table.lock().await;
            table.jobs.insert(
                id,
                JobRecord {
                    id,
                    description: description.clone(),
                    state: JobState::Running,
                    current: 0,
                    total,
                    error: None,
                    result: None,
                    created_at: Utc::now(),
                    finished_at: None,
                },
            );
            table.order.push_back(id);
            table.evict_terminal(self.config.max_history);
        }

        tracing::info!(job_id = %id, description = %description, total, "job submitted");
        telemetry::record_job_submitted();

        let handle = ProgressHandle {
            id,
            table: Arc::clone(&self.table),
        };
        let fut = work(handle);

        // The work runs on its own task; the watcher awaits its join handle
        // so that a panic still lands the record in `Failed`.
        let worker = tokio::spawn(fut);
        let table = Arc::clone(&self.table);
        let span = telemetry::job_span(&id.to_string(), &description);
        tokio::spawn(
            async move {
                let outcome = match worker.await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(err.to_string()),
                    Err(join_err) => Err(join_err.to_string()),
                };

                let mut table = table.lock().await;
                let Some(record) = table.jobs.get_mut(&id) else {
                    return;
                };
                // Exactly one terminal transition per job.
                if record.state.is_terminal() {
                    return;
                }
                record.finished_at = Some(Utc::now());
                match outcome {
                    Ok(value) => {
                        record.state = JobState::Done;
                        record.result = Some(value);
                        tracing::info!(job_id = %id, current = record.current, "job done");
                        telemetry::record_job_completed("done");
                    }
                    Err(message) => {
                        record.state = JobState::Failed;
                        record.error = Some(message.clone());
                        tracing::warn!(job_id = %id, error = %message, "job failed");
                        telemetry::record_job_completed("failed");
                    }
                }
            }
            .instrument(span),
        );

        id
    }

    /// Snapshot the state of a single job, if it is still tracked.
    pub async fn status(&self, id: JobId) -> Option<JobStatus> {
        let table = self.table.lock().await;
        table.jobs.get(&id).map(JobRecord::snapshot)
    }

    /// Snapshot every tracked job, oldest first.
    pub async fn jobs(&self) -> Vec<JobStatus> {
        let table = self.table.lock().await;
        table
            .order
            .iter()
            .filter_map(|id| table.jobs.get(id).map(JobRecord::snapshot))
            .collect()
    }

    /// The manager configuration.
    pub fn config(&self) -> &JobManagerConfig {
        &self.config
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new(JobManagerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    async fn wait_for_terminal(manager: &JobManager, id: JobId) -> JobStatus {
        for _ in 0..100 {
            if let Some(status) = manager.status(id).await {
                if status.state.is_terminal() {
                    return status;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not reach a terminal state");
    }

    #[tokio::test]
    async fn completed_job_records_result() {
        let manager = JobManager::default();
        let id = manager
            .submit("seed records", 3, |progress| async move {
                for _ in 0..3 {
                    progress.advance(1).await;
                }
                Ok(json!("done-value"))
            })
            .await;

        let status = wait_for_terminal(&manager, id).await;
        assert_eq!(status.state, JobState::Done);
        assert_eq!(status.current, 3);
        assert_eq!(status.result, Some(json!("done-value")));
        assert!(status.error.is_none());
        assert!(status.finished_at.is_some());
    }

    #[tokio::test]
    async fn failed_job_records_error() {
        let manager = JobManager::default();
        let id = manager
            .submit("doomed", 1, |_progress| async move {
                anyhow::bail!("connector unreachable")
            })
            .await;

        let status = wait_for_terminal(&manager, id).await;
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error.as_deref(), Some("connector unreachable"));
        assert!(status.result.is_none());
    }

    #[tokio::test]
    async fn panicking_job_ends_failed() {
        let manager = JobManager::default();
        let id = manager
            .submit("panics", 1, |_progress| async move { panic!("boom") })
            .await;

        let status = wait_for_terminal(&manager, id).await;
        assert_eq!(status.state, JobState::Failed);
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn status_of_unknown_job_is_none() {
        let manager = JobManager::default();
        assert!(manager.status(JobId::new()).await.is_none());
    }

    #[tokio::test]
    async fn eviction_drops_oldest_terminal_only() {
        let manager = JobManager::new(JobManagerConfig::default().with_max_history(2));

        let first = manager
            .submit("first", 0, |_p| async move { Ok(Value::Null) })
            .await;
        wait_for_terminal(&manager, first).await;

        // A running job that never finishes during the test.
        let (_tx, rx) = tokio::sync::oneshot::channel::<()>();
        let running = manager
            .submit("held open", 0, |_p| async move {
                let _ = rx.await;
                Ok(Value::Null)
            })
            .await;

        let second = manager
            .submit("second", 0, |_p| async move { Ok(Value::Null) })
            .await;
        wait_for_terminal(&manager, second).await;

        // Inserting a third record pushes us over max_history = 2; the oldest
        // terminal record goes, the running one stays.
        let third = manager
            .submit("third", 0, |_p| async move { Ok(Value::Null) })
            .await;
        wait_for_terminal(&manager, third).await;

        assert!(manager.status(first).await.is_none());
        assert!(manager.status(running).await.is_some());
        assert_eq!(
            manager.status(running).await.unwrap().state,
            JobState::Running
        );
    }

    #[tokio::test]
    async fn jobs_lists_in_submission_order() {
        let manager = JobManager::default();
        let a = manager
            .submit("a", 0, |_p| async move { Ok(Value::Null) })
            .await;
        let b = manager
            .submit("b", 0, |_p| async move { Ok(Value::Null) })
            .await;

        let listed: Vec<JobId> = manager.jobs().await.iter().map(|j| j.id).collect();
        assert_eq!(listed, vec![a, b]);
    }
}
