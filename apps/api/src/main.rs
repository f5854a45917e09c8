mod config;
mod errors;
mod llm_client;
mod outreach;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::AnthropicProvider;
use crate::outreach::jobs::BatchJobs;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Outreach API v{}", env!("CARGO_PKG_VERSION"));
    info!("Model: {}", llm_client::MODEL);
    info!(
        "Batch cap: {} contacts, call timeout: {}s, pause between calls: {}ms",
        config.max_contacts_per_batch,
        config.model_call_timeout.as_secs(),
        config.email_call_pause.as_millis()
    );
    if config.anthropic_api_key.is_none() {
        warn!("ANTHROPIC_API_KEY not set; every batch request must supply api_key");
    }

    let jobs = BatchJobs::new(config.max_finished_batches);
    let state = AppState {
        config: config.clone(),
        jobs: jobs.clone(),
        models: Arc::new(AnthropicProvider),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(jobs.clone()))
        .await?;

    // A contact in flight makes at most six calls; give it that long to finish.
    let grace = config.model_call_timeout * 6 + config.email_call_pause * 5;
    if tokio::time::timeout(grace, jobs.wait_for_running()).await.is_err() {
        warn!("Batches still running after {}s; exiting anyway", grace.as_secs());
    }

    info!("Server stopped");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then asks running batches to stop at the next contact.
async fn shutdown_signal(jobs: BatchJobs) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    let cancelled = jobs.cancel_all().await;
    info!("Shutting down; asked {cancelled} running batches to stop after their current contact");
}
