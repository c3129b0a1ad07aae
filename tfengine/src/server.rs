//! Server module for serving resource providers over HTTP
//!
//! Binds the listener, mounts the provider endpoints and runs until the
//! process receives Ctrl-C.

use crate::api::router;
use crate::error::{EngineError, Result};
use crate::provider::ProviderMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// Log level for the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(EngineError::InvalidConfiguration(format!(
                "unknown log level {other:?}"
            ))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server configuration for serving providers
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen: SocketAddr,
    /// Upper bound for a single provider call. `None` waits forever.
    pub operation_timeout: Option<Duration>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Log level
    pub log_level: LogLevel,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            operation_timeout: Some(Duration::from_secs(300)),
            max_body_size: 32 << 20, // 32MB
            log_level: LogLevel::Info,
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    /// Set the per-operation timeout
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    pub fn without_operation_timeout(mut self) -> Self {
        self.operation_timeout = None;
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the log level
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

/// Main entry point: bind `config.listen` and serve until Ctrl-C
pub async fn serve(providers: ProviderMap, config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.listen).await?;
    serve_with_listener(listener, providers, config).await
}

/// Serve on an already bound listener
pub async fn serve_with_listener(
    listener: TcpListener,
    providers: ProviderMap,
    config: ServerConfig,
) -> Result<()> {
    let addr = listener.local_addr()?;
    let mut names: Vec<&String> = providers.keys().collect();
    names.sort();
    info!("Listening on {} with providers {:?}", addr, names);

    let app = router(providers, &config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available; run until the task is dropped
        std::future::pending::<()>().await;
    }
}
