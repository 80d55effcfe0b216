//! Tabular Serve - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, ServeConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Serve a pre-trained tabular model over HTTP
#[derive(Debug, Parser)]
#[command(name = "tabular-serve", version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, short, env = "TABSERVE_CONFIG")]
    config: Option<PathBuf>,

    /// ONNX model artifact
    #[arg(long, short)]
    model: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ServeConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(model) = args.model {
        config.model.path = model;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_logging(&config.logging)?;

    info!("=== Tabular Serve v{} ===", env!("CARGO_PKG_VERSION"));
    run_server(config).await
}
