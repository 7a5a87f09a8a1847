// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::chart_data_service::ChartDataService;
use crate::application::telemetry_source::TelemetrySource;
use crate::infrastructure::aggregate_source::AggregateSource;
use crate::infrastructure::config::{load_dashboard_config, BackendConfig};
use crate::infrastructure::feed_source::FeedSource;
use crate::infrastructure::http_client::build_client;
use crate::presentation::app_state::AppState;

/// Build the configured live backend adapter.
fn build_source(backend: &BackendConfig) -> anyhow::Result<Arc<dyn TelemetrySource>> {
    let client = build_client(backend.timeout()).context("Failed to build HTTP client")?;

    let source: Arc<dyn TelemetrySource> = match backend {
        BackendConfig::Feed(feed) => Arc::new(FeedSource::new(
            client,
            feed.base_url.clone(),
            feed.channel_id,
            feed.api_key.clone(),
            feed.max_results,
            feed.channel_label.clone(),
        )),
        BackendConfig::Aggregate(aggregate) => Arc::new(AggregateSource::new(
            client,
            aggregate.base_url.clone(),
            aggregate.channel_label.clone(),
        )),
    };
    Ok(source)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config().context("Failed to load dashboard configuration")?;

    // Live backend (infrastructure layer)
    let source = build_source(&config.backend)?;

    // Chart data service (application layer)
    let chart_service = ChartDataService::new(source.clone(), config.service.settings());
    tracing::info!(
        "Serving {} data, live backend: {}",
        chart_service.source_mode(),
        source.label()
    );

    let state = Arc::new(AppState { chart_service });

    // Build router (presentation layer)
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting envmon-dashboard on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
