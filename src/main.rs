//! Request validation server.
//!
//! Serves the routes declared in a TOML file, validating each request
//! against its route's section schemas and answering with the validated
//! sections.
//!
//! ```text
//!  Client Request
//!     │
//!     ▼
//!  TraceLayer → TimeoutLayer → route match → validation stage → echo handler
//!                                               │
//!                                               └─ 400 ValidationError
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_validator::config::loader::load_config;
use request_validator::observability::{logging, metrics};
use request_validator::{AppConfig, ValidationServer};

#[derive(Parser)]
#[command(name = "request-validator")]
#[command(about = "Validate HTTP request sections against declarative schemas", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_tracing(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        max_body_bytes = config.limits.max_body_bytes,
        request_timeout_secs = config.limits.request_timeout_secs,
        "Configuration loaded"
    );

    let server = ValidationServer::new(config)?;
    if cli.check {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    if server.config().observability.metrics_enabled {
        match server.config().observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %server.config().observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
