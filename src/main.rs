use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use hookline::config::{AgentOptions, AppConfig, ConfigAgent, ConfigError, RoutingConfig};
use hookline::dispatch::Dispatcher;
use hookline::github::{GitHubApiError, OctocrabClient};
use hookline::logging;
use hookline::plugins::builtin_registry;
use hookline::server::{AppState, build_router};
use hookline::webhooks::DecoderTable;

#[derive(Parser)]
#[command(name = "hookline", about = "GitHub webhook bot with pluggable handlers")]
struct Options {
    /// Address the webhook receiver listens on
    #[arg(long, default_value = "0.0.0.0:3000")]
    listen_address: SocketAddr,

    /// Path to the plugin routing file
    #[arg(long, default_value = "plugins.yaml")]
    plugin_config: PathBuf,

    /// Path to the application config file
    #[arg(long, default_value = "config.yaml")]
    config_path: PathBuf,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to load {name} configuration: {source}")]
    Config {
        name: &'static str,
        #[source]
        source: ConfigError,
    },

    #[error("failed to build GitHub client: {0}")]
    Client(#[from] GitHubApiError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let options = Options::parse();

    match run(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fatal error");
            eprintln!("hookline: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(options: Options) -> Result<(), StartupError> {
    let shutdown = CancellationToken::new();

    // The first app config load decides the initial level; the observer keeps
    // it in sync on every reload afterwards.
    let initial = ConfigAgent::<AppConfig>::load(&options.config_path).map_err(|source| {
        StartupError::Config {
            name: "app",
            source,
        }
    })?;
    let log = match logging::init(initial.log_level) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("hookline: logging already initialized: {e}");
            None
        }
    };

    let mut app_options = AgentOptions::default();
    if let Some(log) = log {
        app_options = app_options.on_publish(move |config: &AppConfig| log.set_level(config.log_level));
    }
    let app_config = ConfigAgent::start_with(&options.config_path, app_options, shutdown.clone())
        .map_err(|source| StartupError::Config {
            name: "app",
            source,
        })?;
    let config = app_config.current();
    if config.webhook_secret.is_none() {
        warn!("No webhook_secret configured, accepting unsigned deliveries");
    }

    let client = Arc::new(OctocrabClient::from_config(&config)?);

    let routing = ConfigAgent::<RoutingConfig>::start(&options.plugin_config, shutdown.clone())
        .map_err(|source| StartupError::Config {
            name: "plugins",
            source,
        })?;

    let registry = Arc::new(builtin_registry());
    info!(plugins = ?registry.names(), "Registered plugins");

    let dispatcher = Arc::new(Dispatcher::new_with_shutdown(
        registry,
        routing,
        Arc::clone(&app_config),
        client,
        shutdown.child_token(),
    ));

    let app = build_router(AppState::new(
        Arc::clone(&dispatcher),
        Arc::clone(&app_config),
        DecoderTable::github(),
    ));

    let listener = tokio::net::TcpListener::bind(options.listen_address)
        .await
        .map_err(|source| StartupError::Bind {
            addr: options.listen_address,
            source,
        })?;
    info!(addr = %options.listen_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    let grace = app_config.current().shutdown_timeout;
    if !dispatcher.shutdown(grace).await {
        warn!("Some handlers did not finish before the shutdown timeout");
    }
    shutdown.cancel();
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
