//! Pulse - Command dispatch and background job core.
//!
//! A foundational crate providing bounded action orchestration, tracked
//! background jobs, and interval rate limiting for assistant-style
//! integrations. The concrete handlers (memory lookup, connectors, agents)
//! live in the embedding application; this crate routes to them, bounds
//! them in time, and tracks the work they run out-of-band.
//!
//! # Core Concepts
//!
//! - **Command**: A caller request naming an action and its parameters.
//!   Dispatched via [`Dispatcher::orchestrate`], which normalizes every
//!   outcome (success, handler fault, timeout, unknown action) into one
//!   [`Response`] shape.
//!
//! - **Registry**: The [`ActionRegistry`] maps action names to
//!   [`ActionHandler`] implementations, resolved at dispatch time with an
//!   explicit unknown-key error path.
//!
//! - **Jobs**: The [`JobManager`] wraps long operations in tracked units of
//!   execution with progress reporting (via [`ProgressHandle`]) and terminal
//!   state, queried without blocking through [`JobManager::status`].
//!
//! - **Rate limiting**: The [`RateLimiter`] serializes callers so no two
//!   completions are closer together than a configured minimum interval.
//!
//! # Feature Flags
//!
//! - `metrics` - Prometheus metrics support
//!
//! # Example
//!
//! ```ignore
//! use pulse::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(ActionRegistry::new());
//! registry.register_fn("ping", |_ctx, _params, _cancel| async {
//!     Ok(Response::ok("pong"))
//! });
//!
//! let dispatcher = Dispatcher::new(
//!     DispatcherConfig::default(),
//!     registry,
//!     Arc::new(memory_store),
//! );
//! let response = dispatcher.orchestrate(Command::new("ping")).await;
//! ```

/// Command and response value types.
///
/// The `command` module defines the [`Command`] input shape, the
/// [`Response`] output shape with its flattened domain fields, and the
/// [`Status`] classification.
pub mod command;

/// Bounded dispatch of commands to handlers.
///
/// The `dispatch` module provides the [`Dispatcher`], its
/// [`DispatcherConfig`], and the cooperative [`CancelToken`] handed to
/// handlers on every call.
pub mod dispatch;

/// Background job tracking and execution.
///
/// The `job` module provides the [`JobManager`] and its configuration,
/// the [`JobId`]/[`JobState`]/[`JobStatus`] record types, and the
/// [`ProgressHandle`] callables use to report progress.
pub mod job;

/// Fixed-interval rate limiting.
///
/// The `limiter` module provides the [`RateLimiter`] primitive for
/// throttling outbound calls from handlers.
pub mod limiter;

/// Action name to handler mapping.
///
/// The `registry` module provides the [`ActionRegistry`], the
/// [`ActionHandler`] trait, and the [`FnHandler`] closure adapter.
pub mod registry;

/// Tracing spans and metric recording helpers.
pub mod telemetry;

#[cfg(feature = "metrics")]
/// Prometheus metrics, enabled with the `metrics` feature.
pub mod metrics;

pub use command::{Command, Params, Response, Status};
pub use dispatch::{CancelToken, Dispatcher, DispatcherConfig};
pub use job::{JobId, JobManager, JobManagerConfig, JobState, JobStatus, ProgressHandle};
pub use limiter::RateLimiter;
pub use registry::{ActionHandler, ActionRegistry, FnHandler};
