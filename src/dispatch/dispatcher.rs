//! Routes decoded events to the plugins configured for their repository.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use super::supervise::supervise;
use crate::config::{AppConfig, ConfigAgent, RoutingConfig};
use crate::github::VcsClient;
use crate::plugins::{ExecutionContext, PluginHandler, PluginRegistry};
use crate::webhooks::InboundEvent;

/// Fans each event out to its routed plugins.
///
/// Every handler runs on its own task; the dispatcher never waits for one.
/// Tasks are tracked so shutdown can drain them. The dispatcher is shared
/// across request handlers behind an `Arc`.
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    routing: Arc<ConfigAgent<RoutingConfig>>,
    app: Arc<ConfigAgent<AppConfig>>,
    client: Arc<dyn VcsClient>,

    /// Bounds how many handlers run at once. Sized from the app config at
    /// construction; later changes need a restart.
    permits: Arc<Semaphore>,

    tracker: TaskTracker,
    shutdown: CancellationToken,
    accepting: AtomicBool,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<PluginRegistry>,
        routing: Arc<ConfigAgent<RoutingConfig>>,
        app: Arc<ConfigAgent<AppConfig>>,
        client: Arc<dyn VcsClient>,
    ) -> Self {
        Self::new_with_shutdown(registry, routing, app, client, CancellationToken::new())
    }

    /// Creates a dispatcher whose handlers are cancelled along with
    /// `shutdown`.
    pub fn new_with_shutdown(
        registry: Arc<PluginRegistry>,
        routing: Arc<ConfigAgent<RoutingConfig>>,
        app: Arc<ConfigAgent<AppConfig>>,
        client: Arc<dyn VcsClient>,
        shutdown: CancellationToken,
    ) -> Self {
        let max_concurrent = app
            .current()
            .max_concurrent_handlers
            .min(Semaphore::MAX_PERMITS);
        info!(
            plugins = ?registry.names(),
            max_concurrent,
            "Creating dispatcher"
        );

        Dispatcher {
            registry,
            routing,
            app,
            client,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            tracker: TaskTracker::new(),
            shutdown,
            accepting: AtomicBool::new(true),
        }
    }

    /// Returns the shutdown token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Launches every plugin routed to the event's repository.
    ///
    /// Routing and app configuration are each read once, so one event sees a
    /// single consistent snapshot of both. Organization-level plugins come
    /// first, then repository-level ones. A name listed more than once runs
    /// once. Names with no registered handler are skipped.
    ///
    /// Returns the number of handlers launched. Must be called from within a
    /// tokio runtime.
    #[instrument(skip(self, event), fields(repo = %event.repo(), event = %event.kind()))]
    pub fn dispatch(&self, event: InboundEvent) -> usize {
        if !self.accepting.load(Ordering::Acquire) {
            warn!("Dispatcher is shutting down, dropping event");
            return 0;
        }

        let routing = self.routing.current();
        let config = self.app.current();
        let event = Arc::new(event);

        let mut seen = HashSet::new();
        let mut launched = 0;
        for name in routing.plugins_for(event.repo()) {
            if !seen.insert(name) {
                continue;
            }
            let Some(handler) = self.registry.resolve(name) else {
                debug!(plugin = %name, "No plugin registered under this name, skipping");
                continue;
            };
            self.launch(name, handler, Arc::clone(&event), Arc::clone(&config));
            launched += 1;
        }

        if launched == 0 {
            debug!("No plugins routed for event");
        }
        launched
    }

    fn launch(
        &self,
        name: &str,
        handler: PluginHandler,
        event: Arc<InboundEvent>,
        config: Arc<AppConfig>,
    ) {
        let span = info_span!(
            "plugin",
            plugin = %name,
            repo = %event.repo(),
            actor = %event.actor(),
            event = %event.kind(),
        );
        let cancel = self.shutdown.child_token();
        let deadline = config.handler_timeout;
        let ctx = ExecutionContext::new(
            name,
            span.clone(),
            config,
            Arc::clone(&self.client),
            cancel.clone(),
        );
        let permits = Arc::clone(&self.permits);
        let plugin = name.to_string();

        self.tracker.spawn(
            async move {
                let outcome = supervise(handler, ctx, event, permits, deadline, cancel).await;
                outcome.log(&plugin);
            }
            .instrument(span),
        );
    }

    /// Runs `future` as a tracked task, so shutdown and [`wait_idle`] account
    /// for it.
    ///
    /// [`wait_idle`]: Dispatcher::wait_idle
    pub fn spawn_tracked<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(future);
    }

    /// Number of tracked tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every tracked task has finished.
    ///
    /// Tasks spawned while waiting are waited for too.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        if self.accepting.load(Ordering::Acquire) {
            self.tracker.reopen();
        }
    }

    /// Stops accepting events and drains in-flight handlers.
    ///
    /// Handlers still running after `grace` are cancelled and aborted.
    /// Returns `true` if everything finished within the grace period.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.accepting.store(false, Ordering::Release);
        self.tracker.close();
        info!(
            in_flight = self.tracker.len(),
            grace_secs = grace.as_secs(),
            "Draining in-flight handlers"
        );

        let drained = tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok();
        if !drained {
            warn!(
                in_flight = self.tracker.len(),
                "Grace period elapsed, cancelling remaining handlers"
            );
            self.shutdown.cancel();
            self.tracker.wait().await;
        }

        info!("Dispatcher stopped");
        drained
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("in_flight", &self.tracker.len())
            .field("accepting", &self.accepting.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
