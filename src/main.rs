//! RAGTrip - conversational travel-planning client
//!
//! Holds one chat session against a remote answering service and exposes
//! it to a front end over HTTP and Server-Sent Events.

mod api;
mod config;
mod disclosure;
mod runtime;
mod service;
mod state_machine;
mod transcript;

use api::{create_router, AppState};
use config::ClientConfig;
use disclosure::DisclosurePolicy;
use service::{HttpAnsweringService, LoggingService};
use state_machine::ConvContext;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragtrip=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ClientConfig::from_env()?;
    tracing::info!(
        service_url = %config.service_url,
        truncate_at = config.truncate_at,
        truncation_unit = ?config.truncation_unit,
        retrieval_mode = config.retrieval_mode,
        timeout_secs = ?config.request_timeout.map(|t| t.as_secs()),
        "Configuration loaded"
    );

    // Answering service
    let service = LoggingService::new(HttpAnsweringService::new(
        config.service_url.clone(),
        config.request_timeout,
    )?);

    // Session
    let session_id = uuid::Uuid::new_v4().to_string();
    let policy = DisclosurePolicy::new(config.truncate_at, config.truncation_unit);
    let (session, runtime_task) = runtime::start_session(
        ConvContext::new(session_id),
        config.retrieval_mode,
        policy,
        service,
    );

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(AppState::new(session))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("RAGTrip server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    runtime_task.abort();
    Ok(())
}
