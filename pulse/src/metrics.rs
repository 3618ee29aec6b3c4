//! Prometheus metrics instrumentation for pulse.
//!
//! All metrics are conditionally compiled behind the `metrics` feature flag.
//!
//! # Metrics
//!
//! ## Counters
//! - `pulse_dispatches_total` - Dispatch calls by action and outcome status
//! - `pulse_dispatch_timeouts_total` - Dispatch calls that hit the timeout
//! - `pulse_jobs_submitted_total` - Background jobs submitted
//! - `pulse_jobs_completed_total` - Background jobs reaching a terminal state
//!
//! ## Histograms
//! - `pulse_dispatch_duration_seconds` - Dispatch call duration in seconds
#![cfg(feature = "metrics")]

use prometheus::{exponential_buckets, Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::LazyLock;

/// Global Prometheus registry for pulse metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Counter for dispatch calls.
///
/// Labels:
/// - `action`: The dispatched action name
/// - `status`: The response status, or `unknown`/`fault` for synthesized errors
pub static DISPATCHES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new("pulse_dispatches_total", "Total number of dispatch calls");
    CounterVec::new(opts, &["action", "status"])
        .expect("pulse_dispatches_total metric creation failed")
});

/// Counter for dispatch calls that exceeded the configured timeout.
///
/// Labels:
/// - `action`: The dispatched action name
pub static DISPATCH_TIMEOUTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "pulse_dispatch_timeouts_total",
        "Total number of dispatch timeouts",
    );
    CounterVec::new(opts, &["action"])
        .expect("pulse_dispatch_timeouts_total metric creation failed")
});

/// Counter for background job submissions.
pub static JOBS_SUBMITTED_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    Counter::new(
        "pulse_jobs_submitted_total",
        "Total number of background jobs submitted",
    )
    .expect("pulse_jobs_submitted_total metric creation failed")
});

/// Counter for background jobs that reached a terminal state.
///
/// Labels:
/// - `state`: The terminal state (`done` or `failed`)
pub static JOBS_COMPLETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "pulse_jobs_completed_total",
        "Total number of background jobs completed",
    );
    CounterVec::new(opts, &["state"])
        .expect("pulse_jobs_completed_total metric creation failed")
});

/// Histogram of dispatch call durations in seconds.
///
/// Labels:
/// - `action`: The dispatched action name
pub static DISPATCH_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        "pulse_dispatch_duration_seconds",
        "Dispatch call duration in seconds",
    )
    .buckets(exponential_buckets(0.001, 2.0, 15).expect("bucket creation failed"));
    HistogramVec::new(opts, &["action"])
        .expect("pulse_dispatch_duration_seconds metric creation failed")
});

/// Register all pulse metrics with the global registry.
///
/// Safe to call once at startup; repeated registration returns an error from
/// prometheus, which is surfaced to the caller.
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(DISPATCHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DISPATCH_TIMEOUTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOBS_SUBMITTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOBS_COMPLETED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DISPATCH_DURATION_SECONDS.clone()))?;
    Ok(())
}
