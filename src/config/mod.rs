//! Hot-reloaded configuration.
//!
//! Two documents are managed, each by its own [`ConfigAgent`]:
//!
//! - [`AppConfig`] - deployment settings (`config.yaml`)
//! - [`RoutingConfig`] - which plugins run for which org/repo (`plugins.yaml`)
//!
//! Both are loaded once at startup (failure is fatal) and re-read every
//! minute afterwards (failure is logged and the previous snapshot kept).

mod agent;
mod app;
mod error;
mod routing;

pub use agent::{AgentOptions, ConfigAgent, ConfigDocument, DEFAULT_REFRESH_INTERVAL};
pub use app::{
    AppConfig, DEFAULT_HANDLER_TIMEOUT, DEFAULT_MAX_CONCURRENT_HANDLERS,
    DEFAULT_SHUTDOWN_TIMEOUT, LogLevel,
};
pub use error::ConfigError;
pub use routing::{RoutingConfig, routing_keys};
