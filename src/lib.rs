//! Hookline - a GitHub webhook bot that fans events out to pluggable handlers.
//!
//! Deliveries arrive at the HTTP receiver, are decoded into typed events, and
//! each event is handed to every plugin the routing configuration enables for
//! its organization or repository. Both configuration files are hot-reloaded.

pub mod config;
pub mod dispatch;
pub mod github;
pub mod logging;
pub mod plugins;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;
