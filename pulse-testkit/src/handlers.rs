use async_trait::async_trait;
use parking_lot::Mutex;
use pulse::{ActionHandler, CancelToken, Params, Response};
use std::sync::Arc;
use std::time::Duration;

use crate::TestContext;

/// Handler that replies `{status: ok, message: "pong"}` immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct PingHandler;

#[async_trait]
impl ActionHandler<TestContext> for PingHandler {
    async fn handle(
        &self,
        _ctx: Arc<TestContext>,
        _params: Params,
        _cancel: CancelToken,
    ) -> anyhow::Result<Response> {
        Ok(Response::ok("pong"))
    }
}

/// Handler that sleeps for a fixed duration before replying.
///
/// Checks its [`CancelToken`] while sleeping, so a timed-out dispatch stops
/// the sleep early; the reply (if any) is discarded by the dispatcher
/// either way.
#[derive(Clone, Copy, Debug)]
pub struct SleepyHandler {
    pub duration: Duration,
}

impl SleepyHandler {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl ActionHandler<TestContext> for SleepyHandler {
    async fn handle(
        &self,
        _ctx: Arc<TestContext>,
        _params: Params,
        cancel: CancelToken,
    ) -> anyhow::Result<Response> {
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => Ok(Response::ok("finally awake")),
            _ = cancel.cancelled() => Ok(Response::error("cancelled")),
        }
    }
}

/// Handler that always fails with a fixed error message.
#[derive(Clone, Debug)]
pub struct FaultyHandler {
    pub message: String,
}

impl FaultyHandler {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ActionHandler<TestContext> for FaultyHandler {
    async fn handle(
        &self,
        _ctx: Arc<TestContext>,
        _params: Params,
        _cancel: CancelToken,
    ) -> anyhow::Result<Response> {
        anyhow::bail!("{}", self.message)
    }
}

/// Handler that records every invocation's parameters and replies with a
/// canned response.
#[derive(Clone)]
pub struct RecordingHandler {
    invocations: Arc<Mutex<Vec<Params>>>,
    response: Response,
}

impl RecordingHandler {
    pub fn new(response: Response) -> Self {
        Self {
            invocations: Arc::new(Mutex::new(Vec::new())),
            response,
        }
    }

    /// Parameters of every invocation so far, in call order.
    pub fn invocations(&self) -> Vec<Params> {
        self.invocations.lock().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().len()
    }

    pub fn assert_invocation_count_eq(&self, expected: usize) {
        let actual = self.invocation_count();
        assert_eq!(actual, expected, "Expected {expected} invocations, got {actual}");
    }
}

#[async_trait]
impl ActionHandler<TestContext> for RecordingHandler {
    async fn handle(
        &self,
        _ctx: Arc<TestContext>,
        params: Params,
        _cancel: CancelToken,
    ) -> anyhow::Result<Response> {
        self.invocations.lock().push(params);
        Ok(self.response.clone())
    }
}
