// Source trait for live telemetry backends
use crate::domain::error::SourceError;
use crate::domain::filter::Filter;
use crate::domain::telemetry::ChartDataset;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;

/// Recent insolation readings included in a probe report.
pub const INSOLATION_SAMPLE_LEN: usize = 3;

/// Result of a lightweight reachability check against a backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub reachable: bool,
    pub record_count: usize,
    pub last_record_timestamp: Option<DateTime<FixedOffset>>,
    pub channel_label: String,
    /// Up to `INSOLATION_SAMPLE_LEN` recent insolation readings, oldest first
    pub insolation_sample: Vec<f64>,
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Human-readable name of the backend or channel
    fn label(&self) -> &str;

    /// Fetch the filter's range and shape it into a uniform, aligned dataset
    async fn fetch_and_normalize(&self, filter: &Filter) -> Result<ChartDataset, SourceError>;

    /// Fetch a handful of the most recent records for diagnostics
    async fn probe(&self) -> Result<ProbeReport, SourceError>;

    /// Raw channel description, for backends that publish one
    async fn channel_info(&self) -> Result<Option<Value>, SourceError> {
        Ok(None)
    }
}
