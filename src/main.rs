//! Response header middleware server.
//!
//! ```text
//!  client ──▶ trace ──▶ response headers ──▶ timeout ──▶ upstream / status
//!                        │        ▲
//!                 early  │        │  late (always)
//!                        ▼        │
//!                     response shell
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use response_headers::config::{load_config, watcher::ConfigWatcher, FilterConfig};
use response_headers::observability::{logging, metrics};
use response_headers::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "response-headers")]
#[command(about = "HTTP server that injects configured response headers", long_about = None)]
struct Cli {
    /// TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Property for {{PROP:name}} placeholders, overriding the config file.
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_property)]
    properties: Vec<(String, String)>,

    /// Print the compiled directives as JSON and exit.
    #[arg(long)]
    check: bool,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FilterConfig::default(),
    };
    logging::init_logging(&config.observability.log_level);

    let overrides: HashMap<String, String> = cli.properties.into_iter().collect();

    if cli.check {
        let filter = config.build_filter(&overrides);
        println!("{}", serde_json::to_string_pretty(filter.directives())?);
        return Ok(());
    }

    tracing::info!("response-headers v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = ?config.upstream.as_ref().map(|u| &u.address),
        directives = config.headers.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::with_properties(config, overrides);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
