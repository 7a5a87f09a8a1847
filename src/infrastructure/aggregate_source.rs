// REST telemetry API returning one aggregate per metric for a whole range
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use rand::Rng;
use serde::Deserialize;

use crate::application::telemetry_source::{ProbeReport, TelemetrySource};
use crate::domain::error::SourceError;
use crate::domain::filter::Filter;
use crate::domain::telemetry::{
    ChartDataset, DataOrigin, DatasetMetadata, MetricKind, MetricSeries, SeriesPoint,
};
use crate::domain::time::{format_period, generate_labels, slot_timestamps};
use crate::infrastructure::http_client::get_json;

/// Relative jitter applied around the per-slot share of a total.
const SLOT_JITTER: f64 = 0.1;

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    pressure: Option<f64>,
    #[serde(default)]
    insolation: Option<f64>,
}

impl AggregateResponse {
    fn value(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::Temperature => self.temperature,
            MetricKind::Humidity => self.humidity,
            MetricKind::Pressure => self.pressure,
            MetricKind::Insolation => self.insolation,
        }
    }

    fn present(&self) -> usize {
        MetricKind::ALL
            .into_iter()
            .filter(|&k| self.value(k).is_some())
            .count()
    }
}

/// Spread a range total evenly over the slots, each share jittered by up to
/// ±10%. A missing total leaves every slot absent.
fn distribute<R: Rng + ?Sized>(
    total: Option<f64>,
    slots: &[DateTime<FixedOffset>],
    rng: &mut R,
) -> MetricSeries {
    let share = total.map(|t| t / slots.len().max(1) as f64);
    let points = slots
        .iter()
        .map(|&ts| {
            let value = share.map(|s| {
                let jitter = rng.random_range(-SLOT_JITTER..=SLOT_JITTER) * s.abs();
                ((s + jitter) * 1000.0).round() / 1000.0
            });
            SeriesPoint::new(ts, value)
        })
        .collect();
    MetricSeries::new(points)
}

#[derive(Debug, Clone)]
pub struct AggregateSource {
    client: reqwest::Client,
    base_url: String,
    label: String,
}

impl AggregateSource {
    pub fn new(client: reqwest::Client, base_url: String, label: Option<String>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let label = label.unwrap_or_else(|| base_url.clone());
        Self {
            client,
            base_url,
            label,
        }
    }

    fn filtered_url(&self, filter: &Filter) -> String {
        let mut params: Vec<(&str, String)> = MetricKind::ALL
            .into_iter()
            .map(|k| ("required_telemetry", k.as_str().to_string()))
            .collect();
        params.push(("start_date", api_timestamp(filter.start())));
        params.push(("end_date", api_timestamp(filter.end())));
        if let Some(region) = filter.region() {
            params.push(("region", region.to_string()));
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}/filtered?{}", self.base_url, query)
    }

    fn normalize<R: Rng + ?Sized>(
        &self,
        response: AggregateResponse,
        filter: &Filter,
        rng: &mut R,
    ) -> Result<ChartDataset, SourceError> {
        if response.present() == 0 {
            return Err(SourceError::EmptyResult);
        }

        let (start, end) = (filter.start(), filter.end());
        let interval = filter.interval().resolve(start, end);
        let slots = slot_timestamps(start, end, interval);
        let labels = generate_labels(start, end, interval);

        let series: BTreeMap<MetricKind, MetricSeries> = MetricKind::ALL
            .into_iter()
            .map(|kind| (kind, distribute(response.value(kind), &slots, rng)))
            .collect();

        let mut metadata = DatasetMetadata::new(
            DataOrigin::Live,
            format_period(start, end),
            interval,
            slots.len(),
        );
        metadata.approximated = true;
        metadata.note = Some(format!(
            "Range totals from {} spread across {} slots",
            self.label,
            slots.len()
        ));
        metadata.channel_label = Some(self.label.clone());

        Ok(ChartDataset::new(series, labels, metadata))
    }
}

/// Backend expects naive UTC timestamps, e.g. `2024-01-01T00:00:00`.
fn api_timestamp(at: DateTime<FixedOffset>) -> String {
    at.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[async_trait]
impl TelemetrySource for AggregateSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_and_normalize(&self, filter: &Filter) -> Result<ChartDataset, SourceError> {
        let url = self.filtered_url(filter);
        let response: AggregateResponse = get_json(&self.client, &url).await?;
        self.normalize(response, filter, &mut rand::rng())
    }

    async fn probe(&self) -> Result<ProbeReport, SourceError> {
        let url = format!("{}/telemetry", self.base_url);
        let response: AggregateResponse = get_json(&self.client, &url).await?;

        Ok(ProbeReport {
            reachable: true,
            record_count: response.present(),
            last_record_timestamp: None,
            channel_label: self.label.clone(),
            insolation_sample: response.insolation.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::Interval;
    use crate::infrastructure::test_support::{client, serve};
    use axum::{extract::Query, routing::get, Router};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn filter(interval: Interval) -> Filter {
        Filter::new(
            ts("2024-01-01T00:00:00+03:00"),
            ts("2024-01-08T00:00:00+03:00"),
            Some("Санкт-Петербург".to_string()),
            interval,
        )
        .unwrap()
    }

    fn source(base_url: String) -> AggregateSource {
        AggregateSource::new(client(), base_url, Some("telemetry api".to_string()))
    }

    #[test]
    fn test_totals_are_spread_within_jitter() {
        let response: AggregateResponse = serde_json::from_str(
            r#"{"temperature": 140.0, "humidity": null, "pressure": 7091.0}"#,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let ds = source("http://unused".to_string())
            .normalize(response, &filter(Interval::Daily), &mut rng)
            .unwrap();

        assert_eq!(ds.labels.len(), 7);
        assert!(ds.is_aligned());
        assert!(ds.metadata.approximated);
        assert_eq!(ds.metadata.source, DataOrigin::Live);

        for point in &ds.metric(MetricKind::Temperature).unwrap().points {
            let v = point.value.unwrap();
            assert!((18.0..=22.0).contains(&v), "temperature share {v}");
        }
        assert_eq!(ds.metric(MetricKind::Humidity).unwrap().valid_points(), 0);
        assert_eq!(ds.metric(MetricKind::Insolation).unwrap().valid_points(), 0);
        assert_eq!(ds.metric(MetricKind::Pressure).unwrap().valid_points(), 7);
    }

    #[test]
    fn test_no_totals_is_empty_result() {
        let response: AggregateResponse = serde_json::from_str(r#"{"temperature": null}"#).unwrap();
        let result = source("http://unused".to_string()).normalize(
            response,
            &filter(Interval::Daily),
            &mut StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(SourceError::EmptyResult)));
    }

    #[test]
    fn test_string_totals_are_rejected() {
        let parsed = serde_json::from_str::<AggregateResponse>(r#"{"temperature": "21"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_filtered_url() {
        let url =
            source("http://api.local:8000/".to_string()).filtered_url(&filter(Interval::Daily));
        assert_eq!(
            url,
            "http://api.local:8000/filtered?required_telemetry=temperature\
             &required_telemetry=humidity&required_telemetry=pressure&required_telemetry=insolation\
             &start_date=2023-12-31T21%3A00%3A00&end_date=2024-01-07T21%3A00%3A00\
             &region=%D0%A1%D0%B0%D0%BD%D0%BA%D1%82-%D0%9F%D0%B5%D1%82%D0%B5%D1%80%D0%B1%D1%83%D1%80%D0%B3"
        );
    }

    #[tokio::test]
    async fn test_fetch_and_probe_against_backend() {
        let router = Router::new()
            .route(
                "/filtered",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    assert!(params.contains_key("start_date"));
                    r#"{"temperature": 70.0, "humidity": 420.0, "pressure": 7091.0, "insolation": 2.8}"#
                }),
            )
            .route(
                "/telemetry",
                get(|| async {
                    r#"{"temperature": 21.0, "humidity": 55.0, "pressure": null, "insolation": null}"#
                }),
            );
        let base = serve(router).await;
        let source = source(base);

        let ds = source.fetch_and_normalize(&filter(Interval::Hourly)).await.unwrap();
        assert_eq!(ds.labels.len(), 168);
        assert!(ds.series.values().all(|s| s.len() == 168));

        let report = source.probe().await.unwrap();
        assert_eq!(report.record_count, 2);
        assert_eq!(report.channel_label, "telemetry api");
        assert!(report.insolation_sample.is_empty());
        assert!(source.channel_info().await.unwrap().is_none());
    }
}
