//! OAuth2 authenticating reverse proxy.
//!
//! ```text
//!     Client ──▶ rate limit ──▶ route ──▶ [token ▶ user-info ▶ teams ▶ headers] ──▶ Backend
//!                                                    │
//!                                            Identity provider
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use auth_proxy::config::{load_with_overrides, ConfigOverrides};
use auth_proxy::observability::{logging, metrics};
use auth_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "auth-proxy")]
#[command(about = "OAuth2 authenticating reverse proxy with team-based access control", long_about = None)]
struct Cli {
    /// TOML configuration file; the embedded default is used when omitted
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listening port
    #[arg(long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Backend for paths no route matches
    #[arg(long, env = "SERVER_DEFAULT_TARGET")]
    default_target: Option<String>,

    /// Backend timeout in seconds
    #[arg(long, env = "SERVER_TIMEOUT")]
    timeout: Option<u64>,

    /// Sustained requests per second; non-positive keeps the default
    #[arg(long, env = "RATE_LIMIT", allow_hyphen_values = true)]
    rate_limit: Option<i64>,

    /// Burst capacity; non-positive keeps the default
    #[arg(long, env = "BURST_LIMIT", allow_hyphen_values = true)]
    burst_limit: Option<i64>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            default_target: self.default_target.clone(),
            timeout_secs: self.timeout,
            rate_limit: self.rate_limit,
            burst_limit: self.burst_limit,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_with_overrides(cli.config.as_deref(), &cli.overrides())?;

    logging::init(&config.observability);
    tracing::info!(
        name = %config.application.name,
        version = %config.application.version,
        "Starting"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        metrics::init_metrics()
    } else {
        None
    };

    let bind_address = config.server.bind_address();
    tracing::info!(
        bind_address = %bind_address,
        routes = config.routes.len(),
        default_target = config.server.default_target.as_deref().unwrap_or("none"),
        timeout_secs = config.server.timeout_secs,
        "Configuration loaded"
    );

    let server = HttpServer::new(config, metrics_handle)?;
    let listener = TcpListener::bind(&bind_address).await?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    shutdown.on_signal();

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
