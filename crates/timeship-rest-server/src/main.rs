// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Timeship REST API server binary

use clap::Parser;
use std::path::PathBuf;
use timeship_rest_server::{config, Server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory tree to serve (defaults to the working directory)
    #[arg(long, env = "TIMESHIP_ROOT")]
    root: Option<PathBuf>,

    /// Listen address, e.g. ":8080" or "127.0.0.1:9090"
    #[arg(long, env = "TIMESHIP_ADDRESS", default_value = ":8080")]
    address: String,

    /// Prefix under which API routes live
    #[arg(long, env = "TIMESHIP_API_PREFIX", default_value = "/api")]
    api_prefix: String,

    /// Comma-separated list of allowed CORS origins
    #[arg(
        long,
        env = "TIMESHIP_CORS_ALLOWED_ORIGINS",
        default_value = "http://localhost:8080"
    )]
    cors_allowed_origins: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    let config = ServerConfig {
        root,
        bind_addr: config::parse_listen_addr(&args.address)?,
        api_prefix: args.api_prefix,
        cors_allowed_origins: config::parse_origins(&args.cors_allowed_origins),
    };

    tracing::info!("Starting Timeship REST API server");

    let server = Server::new(config)?;
    server.run().await?;

    Ok(())
}
