// ABOUTME: Server binary loading configuration, wiring resources and serving the HTTP API
// ABOUTME: Cancels in-flight agent exchanges and drains connections on Ctrl-C
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![recursion_limit = "256"]

//! # Algecom API Server Binary
//!
//! Starts the REST API with Facebook login, the Messenger webhook and the
//! Gemini sales agent.

use std::net::SocketAddr;
use std::sync::Arc;

use algecom_server::{
    config::ServerConfig, logging, resources::ServerResources, routes::build_router,
};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "algecom-server")]
#[command(about = "Algecom API - AI sales agent for Facebook pages backed by Google Sheets")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting Algecom API");
    info!("{}", config.summary());

    let port = config.http_port;
    let resources = Arc::new(ServerResources::from_config(config));
    let shutdown = resources.shutdown.clone();
    let app = build_router(resources);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP server listening on http://{addr}");
    display_available_endpoints(port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown requested, cancelling in-flight exchanges");
    shutdown.cancel();
}

#[allow(clippy::cognitive_complexity)]
fn display_available_endpoints(port: u16) {
    let base = format!("http://127.0.0.1:{port}/v1");
    info!("=== Available API Endpoints ===");
    info!("   Greeting:          GET  {base}/");
    info!("   Facebook Login:    POST {base}/login/facebook?token=");
    info!("   Logout:            POST {base}/logout");
    info!("   Profile:           GET  {base}/user");
    info!("   Facebook Pages:    GET  {base}/user/facebook/pages");
    info!("   Connect Sheets:    POST {base}/user/connect/google/sheets");
    info!("   Businesses:        GET  {base}/businesses");
    info!("   Create Business:   POST {base}/business/create");
    info!("   Business Chat:     POST {base}/business/{{uid}}/chat/test");
    info!("   Public Chat:       POST {base}/chat/test");
    info!("   Webhook:           GET|POST {base}/facebook/webhook");
    info!("   Token Sweeps:      GET  {base}/cronjob/refresh/{{facebook,google}}/tokens");
    info!("=== End of Endpoint List ===");
}
