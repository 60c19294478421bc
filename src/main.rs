//! Artemisa Server
//!
//! # Architecture Overview
//!
//! ```text
//!     Client line          ┌──────────────────────────────────────────────────┐
//!     ─────────────────────┼─▶ net::listener ─▶ net::tls ─▶ net::connection   │
//!                          │                                    │             │
//!                          │                                    ▼             │
//!     Reply                │                              routing::router     │
//!     ◀────────────────────┼──────────── http::response ◀───────┘             │
//!                          │                                                  │
//!                          │  extensions::registry ── Startup + modules       │
//!                          │  config · lifecycle · observability              │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use artemisa::config::{load_config, ServerConfig};
use artemisa::extensions::watcher::ExtensionWatcher;
use artemisa::lifecycle::signals::shutdown_signal;
use artemisa::{observability, Server, Shutdown};

#[derive(Parser)]
#[command(name = "artemisa")]
#[command(about = "Extensible line-protocol server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listening port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the host name the bind address is resolved from.
    #[arg(long)]
    host: Option<String>,

    /// Override the host root holding System/ and the modules directory.
    #[arg(short, long)]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(host) = cli.host {
        config.listener.host = host;
    }
    if let Some(root) = cli.root {
        config.extensions.root = root;
    }

    observability::init(&config.observability.log_level)?;
    tracing::info!("Artemisa Server {}", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        root = %config.extensions.root.display(),
        tls = config.tls.is_some(),
        "Configuration loaded"
    );

    let server = Arc::new(Server::with_default_catalog(config)?);
    if !server.startup() {
        tracing::error!("Startup error. Closing server.");
        return Err("startup module failed".into());
    }

    let _watcher = if server.config().extensions.watch {
        let watcher = ExtensionWatcher::new(
            server.registry().clone(),
            server.config().extensions.unit_extension.clone(),
        );
        Some(watcher.run()?)
    } else {
        None
    };

    let listener = server.bind().await?;

    let shutdown = Shutdown::new();
    let serving = tokio::spawn(Arc::clone(&server).serve(listener, shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();
    serving.await?;

    if !server.tracker().wait_for_drain(Duration::from_secs(10)).await {
        tracing::warn!(
            active = server.tracker().active_count(),
            "Connections still open at shutdown"
        );
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
