// Shared HTTP plumbing for backend adapters
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::domain::error::SourceError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(SourceError::from)
}

/// GET a URL and decode its JSON body.
///
/// Transport failures and non-2xx statuses are `Network`; a body that does not
/// match `T` is `Transform`.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, SourceError> {
    tracing::debug!("GET {}", url);

    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Network(format!(
            "backend responded with status {}: {}",
            status,
            body.trim()
        )));
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::test_support::serve;
    use axum::{http::StatusCode, routing::get, Router};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Reading {
        value: f64,
    }

    #[tokio::test]
    async fn test_status_and_shape_errors_are_classified() {
        let router = Router::new()
            .route("/ok", get(|| async { r#"{"value": 1.5}"# }))
            .route("/broken", get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }))
            .route("/garbage", get(|| async { "<html>" }));
        let base = serve(router).await;
        let client = crate::infrastructure::test_support::client();

        let ok: Reading = get_json(&client, &format!("{base}/ok")).await.unwrap();
        assert_eq!(ok.value, 1.5);

        let broken = get_json::<Reading>(&client, &format!("{base}/broken")).await;
        assert!(matches!(broken, Err(SourceError::Network(msg)) if msg.contains("502")));

        let garbage = get_json::<Reading>(&client, &format!("{base}/garbage")).await;
        assert!(matches!(garbage, Err(SourceError::Transform(_))));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_as_network_error() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                r#"{"value": 1.0}"#
            }),
        );
        let base = serve(router).await;
        let client = build_client(Duration::from_millis(300)).unwrap();

        let started = std::time::Instant::now();
        let result = get_json::<Reading>(&client, &format!("{base}/slow")).await;
        assert!(matches!(result, Err(SourceError::Network(_))));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_network_error() {
        let client = crate::infrastructure::test_support::client();
        let result = get_json::<Reading>(&client, "http://127.0.0.1:9/nothing").await;
        assert!(matches!(result, Err(SourceError::Network(_))));
    }
}
