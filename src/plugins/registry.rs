//! Name → handler registry.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use super::PluginError;
use super::context::ExecutionContext;
use crate::webhooks::InboundEvent;

/// Future returned by a plugin handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send>>;

/// A registered plugin handler.
pub type PluginHandler =
    Arc<dyn Fn(ExecutionContext, Arc<InboundEvent>) -> HandlerFuture + Send + Sync>;

/// Maps plugin names to handlers.
///
/// Populated during startup through `&mut` access, then frozen behind an
/// `Arc` and handed to the dispatcher. There is no removal.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    handlers: HashMap<String, PluginHandler>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`.
    ///
    /// Registering a name twice keeps the last handler.
    ///
    /// # Example
    ///
    /// ```
    /// use hookline::plugins::PluginRegistry;
    ///
    /// let mut registry = PluginRegistry::new();
    /// registry.register("noop", |_ctx, _event| async { Ok(()) });
    /// assert!(registry.resolve("noop").is_some());
    /// assert!(registry.resolve("missing").is_none());
    /// ```
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(ExecutionContext, Arc<InboundEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PluginError>> + Send + 'static,
    {
        let name = name.into();
        let handler: PluginHandler =
            Arc::new(move |ctx: ExecutionContext, event: Arc<InboundEvent>| -> HandlerFuture {
                Box::pin(handler(ctx, event))
            });

        if self.handlers.insert(name.clone(), handler).is_some() {
            debug!(plugin = %name, "Replaced previously registered plugin");
        }
    }

    /// Looks up the handler registered under `name`.
    pub fn resolve(&self, name: &str) -> Option<PluginHandler> {
        self.handlers.get(name).cloned()
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::test_utils::{RecordingClient, comment_event};
    use tokio_util::sync::CancellationToken;

    fn context(plugin: &str) -> ExecutionContext {
        ExecutionContext::new(
            plugin,
            tracing::Span::none(),
            Arc::new(AppConfig::default()),
            Arc::new(RecordingClient::new()),
            CancellationToken::new(),
        )
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = PluginRegistry::new();
        registry.register("size", |_ctx, _event| async { Ok(()) });
        registry.register("lgtm", |_ctx, _event| async { Ok(()) });

        assert_eq!(registry.names(), ["lgtm", "size"]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_last_handler() {
        let mut registry = PluginRegistry::new();
        registry.register("lgtm", |_ctx, _event| async {
            Err(PluginError::Failed("first".into()))
        });
        registry.register("lgtm", |_ctx, _event| async { Ok(()) });

        assert_eq!(registry.len(), 1);
        let handler = registry.resolve("lgtm").unwrap();
        let event = Arc::new(comment_event("acme", "widgets", "octocat", "/lgtm"));
        assert!(handler(context("lgtm"), event).await.is_ok());
    }

    #[tokio::test]
    async fn handler_receives_context() {
        let mut registry = PluginRegistry::new();
        registry.register("echo", |ctx: ExecutionContext, event: Arc<InboundEvent>| async move {
            if ctx.plugin() == "echo" && event.actor() == "octocat" {
                Ok(())
            } else {
                Err(PluginError::Failed("unexpected context".into()))
            }
        });

        let handler = registry.resolve("echo").unwrap();
        let event = Arc::new(comment_event("acme", "widgets", "octocat", "hi"));
        handler(context("echo"), event).await.unwrap();
    }
}
