//! Runs a single handler invocation to completion, timeout, or cancellation.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, warn};

use crate::plugins::{ExecutionContext, PluginError, PluginHandler};
use crate::webhooks::InboundEvent;

/// How a handler invocation ended.
#[derive(Debug)]
pub enum HandlerOutcome {
    Completed,
    Failed(PluginError),
    Panicked(String),
    TimedOut(Duration),
    /// Cancelled by shutdown, before or during the run.
    Cancelled,
}

impl HandlerOutcome {
    /// Logs the outcome. Failures stop here; nothing is retried.
    pub fn log(&self, plugin: &str) {
        match self {
            HandlerOutcome::Completed => debug!(plugin, "Handler completed"),
            HandlerOutcome::Failed(e) => error!(
                plugin,
                error = %e,
                retriable = e.is_retriable(),
                "Handler failed"
            ),
            HandlerOutcome::Panicked(message) => {
                error!(plugin, panic = %message, "Handler panicked")
            }
            HandlerOutcome::TimedOut(deadline) => warn!(
                plugin,
                timeout_secs = deadline.as_secs(),
                "Handler exceeded its deadline, aborted"
            ),
            HandlerOutcome::Cancelled => warn!(plugin, "Handler cancelled by shutdown"),
        }
    }
}

/// Runs `handler` once.
///
/// Waits for a concurrency permit, then runs the handler on its own task so a
/// panic stays contained there. The handler is aborted when `deadline`
/// passes or `cancel` fires; its context token is cancelled first so
/// cooperative handlers can observe it.
pub(super) async fn supervise(
    handler: PluginHandler,
    ctx: ExecutionContext,
    event: Arc<InboundEvent>,
    permits: Arc<Semaphore>,
    deadline: Duration,
    cancel: CancellationToken,
) -> HandlerOutcome {
    let _permit = tokio::select! {
        permit = permits.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return HandlerOutcome::Cancelled,
        },
        _ = cancel.cancelled() => return HandlerOutcome::Cancelled,
    };

    let span = ctx.span().clone();
    // The handler is invoked inside the task so a panic while building its
    // future is contained too.
    let mut task = tokio::spawn(async move { handler(ctx, event).await }.instrument(span));

    tokio::select! {
        joined = &mut task => match joined {
            Ok(Ok(())) => HandlerOutcome::Completed,
            Ok(Err(e)) => HandlerOutcome::Failed(e),
            Err(e) if e.is_panic() => HandlerOutcome::Panicked(panic_message(e.into_panic())),
            Err(_) => HandlerOutcome::Cancelled,
        },
        _ = tokio::time::sleep(deadline) => {
            cancel.cancel();
            task.abort();
            let _ = task.await;
            HandlerOutcome::TimedOut(deadline)
        }
        _ = cancel.cancelled() => {
            task.abort();
            let _ = task.await;
            HandlerOutcome::Cancelled
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
