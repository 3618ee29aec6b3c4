use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::Instrument;

use crate::command::{Command, Response};
use crate::registry::{ActionHandler, ActionRegistry};
use crate::telemetry;

/// Token for signaling cancellation to an in-flight handler.
///
/// The dispatcher cancels the token when a call times out. Cancellation is
/// cooperative: a handler that never checks the token keeps running,
/// abandoned, and its eventual result is discarded. Clones share state.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<CancelTokenInner>,
}

#[derive(Debug)]
struct CancelTokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelTokenInner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.notify.notified().await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the bounded dispatcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum wall-clock time to wait for a handler before returning a
    /// timeout error, in milliseconds.
    pub timeout_ms: u64,
}

impl DispatcherConfig {
    /// Create a configuration with the given timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Set the dispatch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// The dispatch timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

/// Bounded dispatcher routing commands to registered action handlers.
///
/// Each [`Dispatcher::orchestrate`] call resolves its handler, runs it on a
/// freshly spawned task, and waits at most the configured timeout for the
/// result. All four fault classes — unknown action, handler error, handler
/// panic, and timeout — are normalized into error [`Response`]s; nothing
/// propagates to the caller as a panic or error.
///
/// The `context` is the shared resource (e.g. the memory store) threaded
/// into every handler. Its internal thread-safety is its owner's
/// responsibility, not the dispatcher's.
pub struct Dispatcher<C>
where
    C: Send + Sync + 'static,
{
    config: DispatcherConfig,
    registry: Arc<ActionRegistry<C>>,
    context: Arc<C>,
}

impl<C> Dispatcher<C>
where
    C: Send + Sync + 'static,
{
    /// Create a dispatcher over the given registry and shared context.
    pub fn new(config: DispatcherConfig, registry: Arc<ActionRegistry<C>>, context: Arc<C>) -> Self {
        Self {
            config,
            registry,
            context,
        }
    }

    /// The dispatcher configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// The action registry backing this dispatcher.
    pub fn registry(&self) -> Arc<ActionRegistry<C>> {
        Arc::clone(&self.registry)
    }

    /// Dispatch a command and return its normalized response.
    ///
    /// Safe to call concurrently from many tasks; each call gets its own
    /// worker task. On timeout the worker is cancelled cooperatively (via
    /// the handler's [`CancelToken`]) and abandoned — this is a best-effort
    /// timeout, not a cancellation guarantee.
    pub async fn orchestrate(&self, command: Command) -> Response {
        let span = telemetry::dispatch_span(&command.action);
        self.orchestrate_inner(command).instrument(span).await
    }

    async fn orchestrate_inner(&self, command: Command) -> Response {
        let Command { action, params } = command;
        tracing::info!(action = %action, "orchestrating action");

        let Some(handler) = self.registry.resolve(&action) else {
            tracing::warn!(action = %action, "unknown action");
            telemetry::record_dispatch(&action, "unknown");
            return Response::error(format!("unknown action '{action}'"));
        };

        let cancel = CancelToken::new();
        let ctx = Arc::clone(&self.context);
        let worker_cancel = cancel.clone();
        let worker =
            tokio::spawn(async move { handler.handle(ctx, params, worker_cancel).await });

        let started = tokio::time::Instant::now();
        let response = match tokio::time::timeout(self.config.timeout(), worker).await {
            Ok(Ok(Ok(response))) => {
                tracing::info!(action = %action, status = %response.status, "action completed");
                telemetry::record_dispatch(&action, response.status.as_str());
                response
            }
            Ok(Ok(Err(err))) => {
                tracing::warn!(action = %action, error = %err, "handler returned error");
                telemetry::record_dispatch(&action, "fault");
                Response::error(err.to_string())
            }
            Ok(Err(join_err)) => {
                tracing::error!(action = %action, error = %join_err, "handler task failed");
                telemetry::record_dispatch(&action, "fault");
                Response::error(format!("handler for '{action}' failed: {join_err}"))
            }
            Err(_elapsed) => {
                // Cooperative only: the worker is signalled and abandoned,
                // never aborted. Its eventual result is discarded.
                cancel.cancel();
                let secs = self.config.timeout().as_secs_f64();
                tracing::warn!(action = %action, timeout_secs = secs, "action timed out");
                telemetry::record_dispatch_timeout(&action);
                Response::error(format!("{action} timed out after {secs}s"))
            }
        };
        telemetry::record_dispatch_duration(&action, started.elapsed().as_secs_f64());
        response
    }
}

impl<C> std::fmt::Debug for Dispatcher<C>
where
    C: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
