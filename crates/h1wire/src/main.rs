//! h1wire: demo server on top of h1wire-core.
//!
//! # Usage
//!
//! ```text
//! h1wire --port 42069
//! h1wire --config h1wire.toml --workers 4
//! ```

mod handlers;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use h1wire_core::{Server, ServerConfig};
use tracing::info;

// Use mimalloc for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "h1wire", about = "One request per connection HTTP/1.1 server")]
struct Cli {
    /// TOML config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind.
    #[arg(long)]
    host: Option<String>,

    /// Runtime worker threads.
    #[arg(long)]
    workers: Option<usize>,

    /// Initial per-connection read buffer size in bytes.
    #[arg(long)]
    buffer_size: Option<usize>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServerConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.hostname = host;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(size) = self.buffer_size {
            config.read_buffer_size = size;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,h1wire=debug,h1wire_core=debug".into()),
        )
        .init();

    let config = Cli::parse().into_config()?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run(config))
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let server = Server::bind(config, handlers::demo).await?;
    info!(addr = %server.local_addr(), "server started");

    shutdown_signal().await?;
    info!("shutdown signal received");

    server.close().await?;
    info!("server gracefully stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("installing CTRL+C handler")?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("installing CTRL+C handler")
}
