//! Tracing and telemetry instrumentation for pulse.
//!
//! Span helpers for the dispatch and job lifecycle, plus metric recording
//! functions that are no-ops unless the `metrics` feature is enabled.

use tracing::{info_span, Span};

/// Create a tracing span for a dispatch call.
///
/// The span carries the action name as a field for observability.
#[must_use]
pub fn dispatch_span(action: impl AsRef<str>) -> Span {
    info_span!(
        "pulse.dispatch",
        action = %action.as_ref(),
    )
}

/// Create a tracing span for a background job's lifetime.
///
/// The span carries the job id and description as fields.
#[must_use]
pub fn job_span(job_id: impl AsRef<str>, description: impl AsRef<str>) -> Span {
    info_span!(
        "pulse.job",
        job_id = %job_id.as_ref(),
        description = %description.as_ref(),
    )
}

/// Record a dispatch outcome for the given action.
///
/// `status` is the response status, or `"unknown"`/`"fault"` for the
/// dispatcher-synthesized error paths.
pub fn record_dispatch(action: &str, status: &str) {
    #[cfg(feature = "metrics")]
    crate::metrics::DISPATCHES_TOTAL
        .with_label_values(&[action, status])
        .inc();
    #[cfg(not(feature = "metrics"))]
    let _ = (action, status);
}

/// Record a dispatch timeout for the given action.
pub fn record_dispatch_timeout(action: &str) {
    #[cfg(feature = "metrics")]
    crate::metrics::DISPATCH_TIMEOUTS_TOTAL
        .with_label_values(&[action])
        .inc();
    #[cfg(not(feature = "metrics"))]
    let _ = action;
}

/// Record the wall-clock duration of a dispatch call.
pub fn record_dispatch_duration(action: &str, seconds: f64) {
    #[cfg(feature = "metrics")]
    crate::metrics::DISPATCH_DURATION_SECONDS
        .with_label_values(&[action])
        .observe(seconds);
    #[cfg(not(feature = "metrics"))]
    let _ = (action, seconds);
}

/// Record a background job submission.
pub fn record_job_submitted() {
    #[cfg(feature = "metrics")]
    crate::metrics::JOBS_SUBMITTED_TOTAL.inc();
}

/// Record a background job reaching a terminal state.
///
/// `state` is `"done"` or `"failed"`.
pub fn record_job_completed(state: &str) {
    #[cfg(feature = "metrics")]
    crate::metrics::JOBS_COMPLETED_TOTAL
        .with_label_values(&[state])
        .inc();
    #[cfg(not(feature = "metrics"))]
    let _ = state;
}
