//! freezer-daemon: freezes and thaws pod containers on request.
//!
//! This daemon runs privileged on each node and:
//! - Connects once to the node's container runtime (fatal on failure)
//! - Authenticates callers with a Kubernetes TokenReview
//! - Pauses or resumes the calling pod's user containers

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use freezer_daemon::server::{AppState, create_router};
use freezer_daemon::{Config, Engine, TokenReviewAuthenticator, runtime};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("freezer_daemon={}", config.log_level).parse()?),
        )
        .init();

    info!(
        "Starting freezer-daemon - runtime: {}, socket: {}, listen: {}",
        config.runtime_type,
        config.socket().display(),
        config.listen
    );

    let runtime = runtime::connect(config.runtime_type, &config.runtime_options())
        .await
        .with_context(|| format!("unable to create {} client", config.runtime_type))?;

    let authenticator = TokenReviewAuthenticator::from_env(config.token_audience.clone())
        .await
        .context("unable to create Kubernetes client")?;

    let app_state = Arc::new(AppState {
        engine: Arc::new(Engine::new(runtime)),
        authenticator: Arc::new(authenticator),
    });

    let router = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!("HTTP API listening on {}", config.listen);

    // Run server with graceful shutdown
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let ctrl_c = signal::ctrl_c();
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
