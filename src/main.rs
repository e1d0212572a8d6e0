//! path-proxy server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                     PATH PROXY                        │
//!                     │                                                       │
//!  GET /proxy/<token> │  ┌─────────┐   ┌─────────┐   ┌────────────┐           │
//!  ───────────────────┼─▶│  http   │──▶│ routing │──▶│ dispatcher │───────────┼──▶ Origin
//!                     │  │ server  │   │ +codec  │   │            │           │
//!                     │  └─────────┘   └─────────┘   └─────┬──────┘           │
//!                     │                                    │                  │
//!  rewritten response │  ┌──────────────────────────┐      │                  │
//!  ◀──────────────────┼──│ response rewriter        │◀─────┘                  │
//!                     │  │ (Location + HTML links)  │                         │
//!                     │  └──────────────────────────┘                         │
//!                     │                                                       │
//!                     │  config · observability · security · lifecycle        │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use path_proxy::config::{load_config, ProxyConfig};
use path_proxy::observability::{logging, metrics};
use path_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "path-proxy")]
#[command(about = "Rewriting HTTP proxy addressed by base64url tokens in the path", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on; overrides the configured bind port.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(port) = args.port {
        config = config.with_port(port);
    }

    logging::init(&config.observability);

    tracing::info!("path-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        prefix = %config.proxy.prefix,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        static_files = config.static_files.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Proxy listening");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
