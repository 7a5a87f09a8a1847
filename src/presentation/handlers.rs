// HTTP request handlers
use crate::domain::filter::{Filter, Interval};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ChartQuery {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub region: Option<String>,
    pub interval: Option<Interval>,
}

#[derive(Deserialize)]
pub struct SourceModeRequest {
    pub mode: String,
}

#[derive(Serialize)]
pub struct CurrentSource {
    pub mode: String,
}

#[derive(Serialize)]
pub struct SourceModeResponse {
    pub accepted: bool,
    pub mode: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Chart dataset for a range; backend failures come back as demo data
/// tagged in `metadata.source`, only a malformed range is an error.
pub async fn get_charts(
    Query(query): Query<ChartQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let filter = match Filter::new(
        query.start,
        query.end,
        query.region,
        query.interval.unwrap_or_default(),
    ) {
        Ok(filter) => filter,
        Err(e) => {
            let body = ErrorBody { error: e.to_string() };
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let dataset = state.chart_service.get_chart_data(&filter).await;
    Json(&*dataset).into_response()
}

pub async fn get_source(State(state): State<Arc<AppState>>) -> Json<CurrentSource> {
    Json(CurrentSource {
        mode: state.chart_service.source_mode().to_string(),
    })
}

pub async fn set_source(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SourceModeRequest>,
) -> Json<SourceModeResponse> {
    let accepted = state.chart_service.set_source_mode(&request.mode);
    Json(SourceModeResponse {
        accepted,
        mode: state.chart_service.source_mode().to_string(),
    })
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chart_service.cache_stats())
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.chart_service.clear_cache();
    StatusCode::NO_CONTENT
}

pub async fn test_connection(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chart_service.test_connection().await)
}

/// Raw channel description from the live backend
pub async fn channel_info(State(state): State<Arc<AppState>>) -> Response {
    match state.chart_service.channel_info().await {
        Ok(Some(info)) => Json(info).into_response(),
        Ok(None) => {
            let body = ErrorBody {
                error: "backend publishes no channel description".to_string(),
            };
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Err(e) => {
            let body = ErrorBody {
                error: e.to_string(),
            };
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    }
}
