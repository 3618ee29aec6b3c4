//! Background job integration tests.
//!
//! Covers non-blocking submission, progress visibility while running,
//! terminal state exclusivity, and a throttled callable composing the job
//! manager with the rate limiter.

use std::sync::Arc;
use std::time::Duration;

use pulse::{JobManager, JobManagerConfig, JobState, RateLimiter};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::time::Instant;

async fn wait_for_terminal(manager: &JobManager, id: pulse::JobId) -> pulse::JobStatus {
    for _ in 0..200 {
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
async fn submit_returns_immediately_and_tracks_progress() {
    let manager = JobManager::default();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let (progressed_tx, progressed_rx) = oneshot::channel::<()>();

    let started = Instant::now();
    let id = manager
        .submit("seed notion db", 5, |progress| async move {
            progress.advance(1).await;
            progress.advance(1).await;
            let _ = progressed_tx.send(());
            // Hold the job open until the test releases it.
            let _ = release_rx.await;
            for _ in 0..3 {
                progress.advance(1).await;
            }
            Ok(json!("seeded 5 records"))
        })
        .await;
    // Submission duration is independent of the job's runtime.
    assert!(started.elapsed() < Duration::from_secs(1));

    progressed_rx.await.expect("job should report progress");
    let status = manager.status(id).await.expect("job is tracked");
    assert_eq!(status.state, JobState::Running);
    assert_eq!(status.current, 2);
    assert_eq!(status.total, 5);
    assert!(status.finished_at.is_none());

    release_tx.send(()).unwrap();
    let status = wait_for_terminal(&manager, id).await;
    assert_eq!(status.state, JobState::Done);
    assert_eq!(status.current, 5);
    assert_eq!(status.result, Some(json!("seeded 5 records")));
}

#[tokio::test]
async fn three_step_job_completes_with_result() {
    let manager = JobManager::default();
    let id = manager
        .submit("three steps", 3, |progress| async move {
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
}

#[tokio::test]
async fn faulting_job_ends_failed_with_error_only() {
    let manager = JobManager::default();
    let id = manager
        .submit("doomed export", 10, |progress| async move {
            progress.advance(1).await;
            anyhow::bail!("token expired")
        })
        .await;

    let status = wait_for_terminal(&manager, id).await;
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.error.as_deref(), Some("token expired"));
    assert!(status.result.is_none());
    assert_eq!(status.current, 1);
}

#[tokio::test]
async fn managers_track_jobs_independently() {
    // Registries are instance-owned, not process-global.
    let manager_a = JobManager::new(JobManagerConfig::default());
    let manager_b = JobManager::new(JobManagerConfig::default());

    let id = manager_a
        .submit("only in a", 0, |_p| async move { Ok(Value::Null) })
        .await;
    wait_for_terminal(&manager_a, id).await;

    assert!(manager_a.status(id).await.is_some());
    assert!(manager_b.status(id).await.is_none());
    assert!(manager_b.jobs().await.is_empty());
}

#[tokio::test]
async fn throttled_job_spaces_its_calls() {
    // A callable consulting the rate limiter before each outbound call, the
    // way connector-backed handlers throttle their requests.
    let manager = JobManager::default();
    let limiter = Arc::new(RateLimiter::with_interval(Duration::from_millis(20)));

    let started = Instant::now();
    let id = manager
        .submit("throttled sync", 4, {
            let limiter = Arc::clone(&limiter);
            move |progress| async move {
                for _ in 0..4 {
                    limiter.acquire().await;
                    progress.advance(1).await;
                }
                Ok(json!("synced"))
            }
        })
        .await;

    let status = wait_for_terminal(&manager, id).await;
    assert_eq!(status.state, JobState::Done);
    assert_eq!(status.current, 4);
    // Three inter-call gaps at >= 20ms each (minus scheduling slack).
    assert!(
        started.elapsed() >= Duration::from_millis(54),
        "throttled job finished in {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn concurrent_jobs_complete_independently() {
    let manager = JobManager::default();

    let quick = manager
        .submit("quick", 1, |progress| async move {
            progress.advance(1).await;
            Ok(json!("quick done"))
        })
        .await;
    let slow = manager
        .submit("slow", 1, |progress| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            progress.advance(1).await;
            Ok(json!("slow done"))
        })
        .await;
    let failing = manager
        .submit("failing", 1, |_p| async move { anyhow::bail!("nope") })
        .await;

    let quick = wait_for_terminal(&manager, quick).await;
    let slow = wait_for_terminal(&manager, slow).await;
    let failing = wait_for_terminal(&manager, failing).await;

    assert_eq!(quick.result, Some(json!("quick done")));
    assert_eq!(slow.result, Some(json!("slow done")));
    assert_eq!(failing.state, JobState::Failed);
    assert_eq!(manager.jobs().await.len(), 3);
}
