use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::command::{Params, Response};
use crate::dispatch::CancelToken;

/// Trait implemented by the function bound to an action.
///
/// Handlers receive the shared context threaded through by the embedding
/// application (never owned by the registry), the command parameters, and a
/// [`CancelToken`] the dispatcher cancels when the call times out. Honoring
/// the token is cooperative; handlers that ignore it simply run on,
/// abandoned.
#[async_trait]
pub trait ActionHandler<C>: Send + Sync
where
    C: Send + Sync + 'static,
{
    /// Perform the action and return a structured response.
    ///
    /// Any returned error is captured by the dispatcher and converted into
    /// an error response; it never reaches the dispatch caller as a fault.
    async fn handle(
        &self,
        ctx: Arc<C>,
        params: Params,
        cancel: CancelToken,
    ) -> anyhow::Result<Response>;
}

/// Adapter wrapping an async closure as an [`ActionHandler`].
pub struct FnHandler<F>(F);

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<C, F, Fut> ActionHandler<C> for FnHandler<F>
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Params, CancelToken) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Response>> + Send,
{
    async fn handle(
        &self,
        ctx: Arc<C>,
        params: Params,
        cancel: CancelToken,
    ) -> anyhow::Result<Response> {
        (self.0)(ctx, params, cancel).await
    }
}

/// Mapping from action names to their handlers.
///
/// The registry is populated at startup and read on every dispatch. Lookup
/// is O(1) by name; registering the same name twice replaces the previous
/// binding (last write wins). No validation of the handler happens at
/// registration time — a misbehaving handler surfaces as an error response
/// at dispatch time.
///
/// Registries are instance-owned and injectable so tests can build isolated
/// instances; there is no process-global registry.
pub struct ActionRegistry<C>
where
    C: Send + Sync + 'static,
{
    handlers: RwLock<HashMap<String, Arc<dyn ActionHandler<C>>>>,
}

impl<C> ActionRegistry<C>
where
    C: Send + Sync + 'static,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Bind `name` to `handler`, replacing any existing binding.
    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn ActionHandler<C>>) {
        let name = name.into();
        let replaced = self.handlers.write().insert(name.clone(), handler);
        if replaced.is_some() {
            tracing::warn!(action = %name, "replacing existing action handler");
        }
    }

    /// Bind `name` to an async closure.
    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Arc<C>, Params, CancelToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
    {
        self.register(name, Arc::new(FnHandler(f)));
    }

    /// Look up the handler bound to `name`.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ActionHandler<C>>> {
        self.handlers.read().get(name).cloned()
    }

    /// Whether a handler is bound to `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Names of all registered actions, in no particular order.
    pub fn action_names(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }
}

impl<C> Default for ActionRegistry<C>
where
    C: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for ActionRegistry<C>
where
    C: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions = self.action_names();
        actions.sort();
        f.debug_struct("ActionRegistry")
            .field("actions", &actions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Response;

    #[tokio::test]
    async fn resolve_returns_registered_handler() {
        let registry = ActionRegistry::<()>::new();
        registry.register_fn("ping", |_ctx, _params, _cancel| async {
            Ok(Response::ok("pong"))
        });

        let handler = registry.resolve("ping").expect("handler registered");
        let response = handler
            .handle(Arc::new(()), Params::new(), CancelToken::new())
            .await
            .unwrap();
        assert_eq!(response, Response::ok("pong"));
    }

    #[test]
    fn resolve_unknown_returns_none() {
        let registry = ActionRegistry::<()>::new();
        assert!(registry.resolve("missing").is_none());
        assert!(!registry.contains("missing"));
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let registry = ActionRegistry::<()>::new();
        registry.register_fn("greet", |_ctx, _params, _cancel| async {
            Ok(Response::ok("first"))
        });
        registry.register_fn("greet", |_ctx, _params, _cancel| async {
            Ok(Response::ok("second"))
        });

        let handler = registry.resolve("greet").unwrap();
        let response = handler
            .handle(Arc::new(()), Params::new(), CancelToken::new())
            .await
            .unwrap();
        assert_eq!(response.message, "second");
        assert_eq!(registry.action_names().len(), 1);
    }
}
