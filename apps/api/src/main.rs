mod collaborators;
mod config;
mod errors;
mod ledger;
mod llm_client;
mod pipeline;
mod routes;
mod session;
mod simulation;
mod state;
mod structured;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::extraction::PlainTextExtractor;
use crate::collaborators::publish::{DisabledPublisher, Publisher, WebhookPublisher};
use crate::config::Config;
use crate::llm_client::AnthropicInvoker;
use crate::routes::build_router;
use crate::session::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing or out-of-range env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sharp Hire API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM backend
    let llm = AnthropicInvoker::new(
        config.anthropic_api_key.clone(),
        config.anthropic_api_url.clone(),
    )?;
    info!("LLM client initialized (model: {})", config.model);

    let pipeline = config.pipeline_settings();
    info!(
        "Pipeline: {} retries/stage, merge policy {:?}",
        pipeline.retry.max_retries, pipeline.merge_policy
    );

    let publisher: Arc<dyn Publisher> = match &config.publish_webhook_url {
        Some(url) => {
            info!("Publishing to {url}");
            Arc::new(WebhookPublisher::new(url.clone()))
        }
        None => Arc::new(DisabledPublisher),
    };

    let sessions = SessionStore::new();
    let idle_ttl = config.session_idle_ttl();
    tokio::spawn(
        sessions
            .clone()
            .run_expiry(idle_ttl, (idle_ttl / 4).max(Duration::from_secs(1))),
    );
    info!("Idle sessions expire after {}s", idle_ttl.as_secs());

    // Build app state
    let state = AppState {
        sessions,
        llm: Arc::new(llm),
        extractor: Arc::new(PlainTextExtractor),
        publisher,
        pipeline: Arc::new(pipeline),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
