// IoT channel feed source (ThingSpeak-style feeds.json)
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;

use crate::application::telemetry_source::{INSOLATION_SAMPLE_LEN, ProbeReport, TelemetrySource};
use crate::domain::error::SourceError;
use crate::domain::filter::Filter;
use crate::domain::telemetry::{
    ChartDataset, DataOrigin, DatasetMetadata, MetricKind, MetricSeries, SeriesPoint,
};
use crate::domain::time::{format_date_time, format_period, label_for};
use crate::infrastructure::http_client::get_json;

const INSOLATION_FIELD: &str = "field4";

/// Channel field carrying each metric.
const FIELD_MAPPING: [(MetricKind, &str); 4] = [
    (MetricKind::Temperature, "field1"),
    (MetricKind::Humidity, "field2"),
    (MetricKind::Pressure, "field3"),
    (MetricKind::Insolation, INSOLATION_FIELD),
];

const PROBE_RESULTS: usize = 5;

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    channel: Option<FeedChannel>,
    feeds: Vec<FeedRecord>,
}

#[derive(Debug, Deserialize)]
struct FeedChannel {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedRecord {
    created_at: DateTime<FixedOffset>,
    #[serde(flatten)]
    fields: HashMap<String, Value>,
}

impl FeedResponse {
    fn channel_name(&self) -> Option<&str> {
        self.channel
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }

    /// Most recent present insolation readings, oldest first.
    fn insolation_sample(&self, len: usize) -> Vec<f64> {
        let mut records: Vec<&FeedRecord> = self.feeds.iter().collect();
        records.sort_by_key(|r| r.created_at);
        let present: Vec<f64> = records
            .iter()
            .filter_map(|r| parse_field(r.fields.get(INSOLATION_FIELD)))
            .collect();
        present[present.len().saturating_sub(len)..].to_vec()
    }
}

/// Parse a channel field. Gaps stay gaps: null, empty, "null" and anything
/// non-numeric become `None`, never zero.
fn parse_field(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("null") {
                None
            } else {
                s.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

#[derive(Debug, Clone)]
pub struct FeedSource {
    client: reqwest::Client,
    base_url: String,
    channel_id: u64,
    api_key: Option<String>,
    max_results: usize,
    label: String,
}

impl FeedSource {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        channel_id: u64,
        api_key: Option<String>,
        max_results: usize,
        label: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel_id,
            api_key: api_key.filter(|k| !k.is_empty()),
            max_results,
            label: label.unwrap_or_else(|| format!("channel {}", channel_id)),
        }
    }

    fn channel_url(&self) -> String {
        let mut url = format!("{}/channels/{}.json", self.base_url, self.channel_id);
        if let Some(key) = &self.api_key {
            url.push_str(&format!("?api_key={}", urlencoding::encode(key)));
        }
        url
    }

    fn feeds_url(&self, results: usize, range: Option<&Filter>) -> String {
        let mut url = format!(
            "{}/channels/{}/feeds.json?results={}",
            self.base_url, self.channel_id, results
        );
        if let Some(filter) = range {
            for (name, at) in [("start", filter.start()), ("end", filter.end())] {
                let utc = at.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
                url.push_str(&format!("&{}={}", name, urlencoding::encode(&utc)));
            }
        }
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&api_key={}", urlencoding::encode(key)));
        }
        url
    }

    fn normalize(
        &self,
        response: FeedResponse,
        filter: &Filter,
    ) -> Result<ChartDataset, SourceError> {
        if response.feeds.is_empty() {
            return Err(SourceError::EmptyResult);
        }

        let channel_label = response.channel_name().unwrap_or(&self.label).to_string();
        let mut records = response.feeds;
        // Feed order is not guaranteed
        records.sort_by_key(|r| r.created_at);

        let offset = filter.offset();
        let interval = filter.interval().resolve(filter.start(), filter.end());
        let stamps: Vec<DateTime<FixedOffset>> = records
            .iter()
            .map(|r| r.created_at.with_timezone(&offset))
            .collect();

        let series: BTreeMap<MetricKind, MetricSeries> = FIELD_MAPPING
            .iter()
            .map(|&(kind, field)| {
                let points = records
                    .iter()
                    .zip(&stamps)
                    .map(|(record, &ts)| {
                        SeriesPoint::new(ts, parse_field(record.fields.get(field)))
                    })
                    .collect();
                (kind, MetricSeries::new(points))
            })
            .collect();

        let labels = stamps.iter().map(|&ts| label_for(ts, interval)).collect();

        let mut metadata = DatasetMetadata::new(
            DataOrigin::Live,
            format_period(filter.start(), filter.end()),
            interval,
            records.len(),
        );
        metadata.note = Some(format!("Live readings from {}", channel_label));
        metadata.channel_label = Some(channel_label);
        metadata.first_record = stamps.first().copied();
        metadata.last_record = stamps.last().copied();

        Ok(ChartDataset::new(series, labels, metadata))
    }
}

#[async_trait]
impl TelemetrySource for FeedSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_and_normalize(&self, filter: &Filter) -> Result<ChartDataset, SourceError> {
        if let Some(region) = filter.region() {
            tracing::debug!("Channel feeds are not regional, ignoring region {}", region);
        }

        let url = self.feeds_url(self.max_results, Some(filter));
        let response: FeedResponse = get_json(&self.client, &url).await?;
        if let Some(latest) = response.feeds.iter().map(|r| r.created_at).max() {
            tracing::debug!(
                "{} returned {} records, latest at {}",
                self.label,
                response.feeds.len(),
                format_date_time(latest.with_timezone(&filter.offset()))
            );
        }

        self.normalize(response, filter)
    }

    async fn probe(&self) -> Result<ProbeReport, SourceError> {
        let url = self.feeds_url(PROBE_RESULTS, None);
        let response: FeedResponse = get_json(&self.client, &url).await?;

        Ok(ProbeReport {
            reachable: true,
            record_count: response.feeds.len(),
            last_record_timestamp: response.feeds.iter().map(|r| r.created_at).max(),
            channel_label: response.channel_name().unwrap_or(&self.label).to_string(),
            insolation_sample: response.insolation_sample(INSOLATION_SAMPLE_LEN),
        })
    }

    async fn channel_info(&self) -> Result<Option<Value>, SourceError> {
        let info: Value = get_json(&self.client, &self.channel_url()).await?;
        Ok(Some(info))
    }
}
