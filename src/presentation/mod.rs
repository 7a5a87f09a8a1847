// Presentation layer - JSON API consumed by the dashboard front end
pub mod app_state;
pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    cache_stats, channel_info, clear_cache, get_charts, get_source, health_check, set_source,
    test_connection,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/charts", get(get_charts))
        .route("/api/source", get(get_source).put(set_source))
        .route("/api/cache", get(cache_stats).delete(clear_cache))
        .route("/api/connection", get(test_connection))
        .route("/api/channel", get(channel_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
