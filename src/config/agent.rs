//! Hot-reloading configuration agent.
//!
//! A [`ConfigAgent`] owns the authoritative snapshot of one configuration
//! document. The snapshot is published by swapping a whole `Arc<T>`, never by
//! mutating fields, so a reader that obtained a snapshot through
//! [`ConfigAgent::current`] keeps a fully consistent view even while a reload
//! is in flight.
//!
//! # Lifecycle
//!
//! 1. [`ConfigAgent::start`] loads the file once. Failure is returned to the
//!    caller, which treats it as fatal.
//! 2. On success the snapshot is published and a background task re-reads the
//!    file every [`DEFAULT_REFRESH_INTERVAL`].
//! 3. A failed refresh is logged; the previous snapshot remains current and
//!    the loop keeps going.
//! 4. The loop exits when the shutdown token is cancelled or the agent is
//!    dropped.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::error::ConfigError;

/// How often the backing file is re-read.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// A configuration document that can be parsed from YAML text.
///
/// Implementations apply defaults and validate recognized fields. Parsing
/// must not touch shared state; it only produces a candidate value.
pub trait ConfigDocument: Sized + Send + Sync + 'static {
    /// Short name used in log lines (e.g., `"app"`, `"plugins"`).
    const NAME: &'static str;

    /// Parses and validates a document.
    fn from_yaml(text: &str) -> Result<Self, ConfigError>;
}

/// Callback invoked with each newly published snapshot.
pub type PublishObserver<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Tuning knobs for a [`ConfigAgent`].
pub struct AgentOptions<T> {
    interval: Duration,
    observer: Option<PublishObserver<T>>,
}

impl<T> Default for AgentOptions<T> {
    fn default() -> Self {
        AgentOptions {
            interval: DEFAULT_REFRESH_INTERVAL,
            observer: None,
        }
    }
}

impl<T> AgentOptions<T> {
    /// Overrides the refresh period. A zero interval disables the refresh loop.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Registers a callback run after every successful publish, including the
    /// initial one.
    pub fn on_publish(mut self, observer: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }
}

/// Owns the current snapshot of a configuration document.
pub struct ConfigAgent<T> {
    path: PathBuf,
    current: ArcSwap<T>,
    interval: Duration,
    observer: Option<PublishObserver<T>>,
}

impl<T: ConfigDocument> ConfigAgent<T> {
    /// Reads and parses the document at `path`.
    ///
    /// Does not publish anything; the result is only a candidate.
    pub fn load(path: &Path) -> Result<T, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        T::from_yaml(&text)
    }

    /// Creates an agent holding `initial` without touching the filesystem and
    /// without starting a refresh loop.
    pub fn new(path: impl Into<PathBuf>, initial: T, options: AgentOptions<T>) -> Self {
        let agent = ConfigAgent {
            path: path.into(),
            current: ArcSwap::from_pointee(initial),
            interval: options.interval,
            observer: options.observer,
        };
        agent.notify(&agent.current.load_full());
        agent
    }

    /// Loads the document once and starts the refresh loop with default
    /// options.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        path: impl Into<PathBuf>,
        shutdown: CancellationToken,
    ) -> Result<Arc<Self>, ConfigError> {
        Self::start_with(path, AgentOptions::default(), shutdown)
    }

    /// Loads the document once and starts the refresh loop.
    ///
    /// Returns the load error if the initial read fails; no loop is started
    /// in that case.
    pub fn start_with(
        path: impl Into<PathBuf>,
        options: AgentOptions<T>,
        shutdown: CancellationToken,
    ) -> Result<Arc<Self>, ConfigError> {
        let path = path.into();
        let initial = Self::load(&path)?;
        info!(config = T::NAME, path = %path.display(), "Loaded configuration");

        let agent = Arc::new(Self::new(path, initial, options));
        if !agent.interval.is_zero() {
            spawn_refresh_loop(Arc::downgrade(&agent), agent.interval, shutdown);
        }
        Ok(agent)
    }

    /// Returns the latest published snapshot.
    pub fn current(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Atomically replaces the current snapshot.
    pub fn publish(&self, value: T) {
        let value = Arc::new(value);
        self.current.store(Arc::clone(&value));
        self.notify(&value);
    }

    /// Re-reads the backing file and publishes the result.
    ///
    /// On error the current snapshot is left untouched.
    pub fn refresh(&self) -> Result<(), ConfigError> {
        let value = Self::load(&self.path)?;
        self.publish(value);
        debug!(config = T::NAME, path = %self.path.display(), "Reloaded configuration");
        Ok(())
    }

    fn notify(&self, value: &T) {
        if let Some(observer) = &self.observer {
            observer(value);
        }
    }
}

impl<T> fmt::Debug for ConfigAgent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigAgent")
            .field("path", &self.path)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

fn spawn_refresh_loop<T: ConfigDocument>(
    agent: Weak<ConfigAgent<T>>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial load already happened.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(agent) = agent.upgrade() else {
                break;
            };
            if let Err(e) = agent.refresh() {
                error!(
                    config = T::NAME,
                    path = %agent.path.display(),
                    error = %e,
                    "Error reloading configuration, keeping previous snapshot"
                );
            }
        }

        debug!(config = T::NAME, "Configuration refresh loop stopped");
    });
}
