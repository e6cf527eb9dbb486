//! HTTP server for the webhook bot.
//!
//! This module implements the HTTP server that:
//! - Accepts webhooks from GitHub, validates the envelope, and acknowledges
//!   them before any processing happens
//! - Provides liveness probes
//!
//! # Endpoints
//!
//! - `POST /hook` - Accepts GitHub webhook deliveries (returns 200 OK)
//! - `GET /hook` - Liveness probe on the webhook path
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

pub mod health;
pub mod webhook;

pub use health::{health_handler, hook_probe_handler};
pub use webhook::{WebhookError, hook_handler};

use crate::config::{AppConfig, ConfigAgent};
use crate::dispatch::Dispatcher;
use crate::webhooks::DecoderTable;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    dispatcher: Arc<Dispatcher>,

    /// Source of the webhook secret, read on every delivery.
    app_config: Arc<ConfigAgent<AppConfig>>,

    decoders: DecoderTable,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        app_config: Arc<ConfigAgent<AppConfig>>,
        decoders: DecoderTable,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                dispatcher,
                app_config,
                decoders,
            }),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    pub fn app_config(&self) -> &ConfigAgent<AppConfig> {
        &self.inner.app_config
    }

    pub fn decoders(&self) -> &DecoderTable {
        &self.inner.decoders
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/hook", get(hook_probe_handler).post(hook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
