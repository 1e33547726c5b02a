//! bandrelay server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use bandrelay_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        ttl_secs = config.cache_ttl_secs,
        concurrency = config.batch_concurrency,
        relay = config.api_base_url.is_some(),
        "Starting bandrelay server on stdio transport"
    );

    let shutdown = CancellationToken::new();
    let state = Arc::new(state::AppState::from_config(&config, shutdown.clone()).await?);

    let handler = handler::McpRelayServer::new(Arc::clone(&state));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;
    let cancel_server = server.cancellation_token();

    tokio::select! {
        quit = server.waiting() => {
            quit?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, cancelling in-flight batches");
            shutdown.cancel();
            cancel_server.cancel();
        }
    }

    state.cache.settle_evictions().await;
    tracing::info!("bandrelay server stopped");

    Ok(())
}
