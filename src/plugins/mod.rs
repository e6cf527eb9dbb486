//! Plugins: named async handlers invoked for routed webhook events.
//!
//! Builtin plugins register themselves into a [`PluginRegistry`] through
//! [`builtin_registry`] before the server starts. The registry is then frozen
//! and shared with the dispatcher.

mod context;
pub mod lgtm;
mod registry;

use thiserror::Error;

use crate::github::GitHubApiError;

pub use context::ExecutionContext;
pub use registry::{HandlerFuture, PluginHandler, PluginRegistry};

/// Errors a plugin handler may return.
///
/// The dispatcher logs these and drops them; nothing is reported back to
/// the webhook sender.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Api(#[from] GitHubApiError),

    #[error("{0}")]
    Failed(String),
}

impl PluginError {
    /// Whether the failure was transient. Only logged for now.
    pub fn is_retriable(&self) -> bool {
        match self {
            PluginError::Api(e) => e.is_retriable(),
            PluginError::Failed(_) => false,
        }
    }
}

/// Builds a registry holding every builtin plugin.
pub fn builtin_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    lgtm::register(&mut registry);
    registry
}
