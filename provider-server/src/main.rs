use anyhow::Context as _;
use clap::Parser;
use provider_server::{initialize_providers, ServerFile};
use std::net::SocketAddr;
use std::path::PathBuf;
use tfengine::{LogLevel, ServerConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "provider-server", version, about = "Serve resource providers over HTTP")]
struct Cli {
    /// Server configuration file (HCL). Without one a single `null` provider is served.
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "PROVIDER_SERVER_LISTEN")]
    listen: Option<SocketAddr>,

    /// trace, debug, info, warn or error. RUST_LOG takes precedence.
    #[arg(long, env = "PROVIDER_SERVER_LOG")]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => ServerFile::load(path)
            .with_context(|| format!("loading server configuration {}", path.display()))?,
        None => ServerFile::with_null_provider(),
    };

    let mut config = file.server_config(ServerConfig::new());
    if let Some(listen) = cli.listen {
        config = config.with_listen(listen);
    }
    if let Some(level) = cli.log_level {
        config = config.with_log_level(level);
    }

    init_tracing(config.log_level);

    let providers = match initialize_providers(&file.providers).await {
        Ok(providers) => providers,
        Err(e) => {
            error!("Failed to initialize providers: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = tfengine::serve(providers, config).await {
        error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}

fn init_tracing(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
