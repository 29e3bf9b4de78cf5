//! Gateway dispatch host.
//!
//! Loads the TOML configuration, serves the gateway pipeline and keeps the
//! route table current on file changes and SIGHUP.

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gateway_dispatch::config::watcher::{reload_into, ConfigWatcher};
use gateway_dispatch::config::{load_config, GatewayConfig};
use gateway_dispatch::http::BackendTls;
use gateway_dispatch::lifecycle::{Shutdown, Signal, Signals};
use gateway_dispatch::observability::{init_logging, init_metrics};
use gateway_dispatch::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "gateway-dispatch", version, about = "Rule-based HTTP gateway dispatch")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,

    /// Reload the configuration when the file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };
    if cli.check {
        if let Err(e) = BackendTls::from_config(&config.gateway.tls) {
            eprintln!("invalid backend TLS settings: {e}");
            std::process::exit(1);
        }
        println!(
            "configuration OK: {} rule(s), gateway {}",
            config.gateway.rules.len(),
            if config.gateway.enabled { "enabled" } else { "disabled" }
        );
        return Ok(());
    }

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gateway-dispatch starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rules = config.gateway.rules.len(),
        enabled = config.gateway.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let (update_tx, update_rx) = mpsc::unbounded_channel::<GatewayConfig>();
    let _watcher = if cli.watch {
        match ConfigWatcher::new(&cli.config, update_tx.clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::error!(error = %e, "Config watcher failed to start; reload via SIGHUP only");
                None
            }
        }
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let signals = tokio::spawn(handle_signals(
        cli.config.clone(),
        update_tx,
        shutdown.clone(),
    ));

    let server = HttpServer::new(config)?;
    server.run(listener, update_rx, shutdown.subscribe()).await?;

    signals.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Turn OS signals into reloads and shutdown.
async fn handle_signals(path: PathBuf, update_tx: mpsc::UnboundedSender<GatewayConfig>, shutdown: Shutdown) {
    let mut signals = match Signals::new() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return;
        }
    };
    loop {
        match signals.recv().await {
            Signal::Reload => reload(&path, &update_tx),
            Signal::Shutdown => {
                shutdown.trigger("signal");
                return;
            }
        }
    }
}

fn reload(path: &Path, update_tx: &mpsc::UnboundedSender<GatewayConfig>) {
    tracing::info!(path = %path.display(), "SIGHUP received, reloading configuration");
    reload_into(path, update_tx);
}
