//! Per-invocation execution context handed to plugin handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::config::AppConfig;
use crate::github::VcsClient;

/// Everything a handler invocation may use.
///
/// A fresh context is built for every (event, plugin) pair and dropped when
/// the handler returns. The configuration is a snapshot taken when the event
/// was dispatched; reloads during the handler's run are not visible to it.
pub struct ExecutionContext {
    plugin: String,
    span: Span,
    config: Arc<AppConfig>,
    client: Arc<dyn VcsClient>,
    cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new(
        plugin: impl Into<String>,
        span: Span,
        config: Arc<AppConfig>,
        client: Arc<dyn VcsClient>,
        cancel: CancellationToken,
    ) -> Self {
        ExecutionContext {
            plugin: plugin.into(),
            span,
            config,
            client,
            cancel,
        }
    }

    /// Name the handler was registered under.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Diagnostic span scoped to this event and plugin.
    ///
    /// The handler future already runs inside it; this is for work the
    /// handler spawns itself.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> &dyn VcsClient {
        self.client.as_ref()
    }

    /// Cancelled when the handler's deadline passes or the service is
    /// shutting down.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("plugin", &self.plugin)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
