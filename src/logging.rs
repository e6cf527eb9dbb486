//! Tracing subscriber setup.
//!
//! Logs are emitted as JSON lines. The level filter sits behind a reload
//! layer so `log_level` from the app configuration can be re-applied each
//! time that configuration is reloaded.

use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::config::LogLevel;

type FilterLayer = reload::Layer<EnvFilter, Registry>;

/// Handle for changing the active level after [`init`].
#[derive(Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Swaps in a filter for `level`. Failures are logged, not returned.
    pub fn set_level(&self, level: LogLevel) {
        if let Err(e) = self.handle.reload(filter_for(level)) {
            warn!(error = %e, level = %level, "Failed to apply log level");
        }
    }

    /// The active filter, rendered as directives.
    pub fn current_filter(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("filter", &self.current_filter())
            .finish()
    }
}

/// Installs the global subscriber at `level`.
///
/// Fails if a global subscriber is already set.
pub fn init(level: LogLevel) -> Result<LogHandle, TryInitError> {
    let (filter, handle) = filter_layer(level);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_current_span(true))
        .try_init()?;
    Ok(handle)
}

fn filter_layer(level: LogLevel) -> (FilterLayer, LogHandle) {
    let (layer, handle) = reload::Layer::new(filter_for(level));
    (layer, LogHandle { handle })
}

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::new(level.as_directive())
}
