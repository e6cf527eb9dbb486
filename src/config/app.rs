//! Deployment-level application settings (`config.yaml`).
//!
//! ```yaml
//! log_level: debug
//! token: ghp_xxx
//! base_url: https://github.example.com/api/v3
//! shutdown_timeout: 10
//! webhook_secret: s3cret
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;

use super::agent::ConfigDocument;
use super::error::ConfigError;

/// Default grace period for draining in-flight work at shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for a single plugin handler invocation.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(300);

/// Default bound on concurrently running plugin handlers.
pub const DEFAULT_MAX_CONCURRENT_HANDLERS: usize = 64;

/// Log verbosity.
///
/// Accepts the usual severity names. `warning` is an alias for `warn`, and
/// `fatal`/`panic` collapse to `error` since nothing logs above that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as an `EnvFilter` directive.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" | "fatal" | "panic" => Ok(LogLevel::Error),
            other => Err(ConfigError::invalid(
                "log_level",
                format!("not a valid logging level: {other:?}"),
            )),
        }
    }
}

/// Application configuration snapshot.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_level: LogLevel,

    /// Credential for the hosting service API.
    pub token: Option<String>,

    /// API endpoint; `None` means the public github.com API.
    pub base_url: Option<String>,

    /// Grace period for draining in-flight handlers at shutdown.
    pub shutdown_timeout: Duration,

    /// Shared secret for webhook signatures. Signatures are only enforced
    /// when this is set.
    pub webhook_secret: Option<String>,

    /// Deadline for a single handler invocation.
    pub handler_timeout: Duration,

    pub max_concurrent_handlers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: LogLevel::default(),
            token: None,
            base_url: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            webhook_secret: None,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
            max_concurrent_handlers: DEFAULT_MAX_CONCURRENT_HANDLERS,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("handler_timeout", &self.handler_timeout)
            .field("max_concurrent_handlers", &self.max_concurrent_handlers)
            .finish()
    }
}

/// Raw document shape. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAppConfig {
    log_level: Option<String>,
    token: Option<String>,
    base_url: Option<String>,
    shutdown_timeout: Option<u64>,
    webhook_secret: Option<String>,
    handler_timeout: Option<u64>,
    max_concurrent_handlers: Option<usize>,
}

impl ConfigDocument for AppConfig {
    const NAME: &'static str = "app";

    fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawAppConfig = if text.trim().is_empty() {
            RawAppConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };

        let log_level = match raw.log_level.as_deref() {
            None | Some("") => LogLevel::default(),
            Some(level) => level.parse()?,
        };

        let base_url = non_empty(raw.base_url);
        if let Some(url) = &base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::invalid(
                "base_url",
                format!("expected an http(s) URL, got {url:?}"),
            ));
        }

        let handler_timeout = match raw.handler_timeout {
            Some(0) => {
                return Err(ConfigError::invalid(
                    "handler_timeout",
                    "must be at least one second",
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_HANDLER_TIMEOUT,
        };

        let max_concurrent_handlers = match raw.max_concurrent_handlers {
            Some(0) => {
                return Err(ConfigError::invalid(
                    "max_concurrent_handlers",
                    "must be at least 1",
                ));
            }
            Some(n) if n > Semaphore::MAX_PERMITS => {
                return Err(ConfigError::invalid(
                    "max_concurrent_handlers",
                    format!("must be at most {}", Semaphore::MAX_PERMITS),
                ));
            }
            Some(n) => n,
            None => DEFAULT_MAX_CONCURRENT_HANDLERS,
        };

        Ok(AppConfig {
            log_level,
            token: non_empty(raw.token),
            base_url,
            shutdown_timeout: raw
                .shutdown_timeout
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
            webhook_secret: non_empty(raw.webhook_secret),
            handler_timeout,
            max_concurrent_handlers,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
