//! Test fixtures for the pulse dispatch and job core.
//!
//! Provides an in-memory [`TestContext`] standing in for the shared memory
//! handle threaded into handlers, plus canned handlers covering the
//! dispatch outcomes tests care about: success, slowness, faults, and
//! invocation recording.

mod context;
mod handlers;

pub use context::TestContext;
pub use handlers::{FaultyHandler, PingHandler, RecordingHandler, SleepyHandler};
