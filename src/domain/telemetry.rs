// Telemetry data domain models
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::filter::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Temperature,
    Humidity,
    Pressure,
    Insolation,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Temperature,
        MetricKind::Humidity,
        MetricKind::Pressure,
        MetricKind::Insolation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Humidity => "humidity",
            MetricKind::Pressure => "pressure",
            MetricKind::Insolation => "insolation",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reading at one slot. `None` is a sensor gap, not zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub value: Option<f64>,
}

impl SeriesPoint {
    pub fn new(timestamp: DateTime<FixedOffset>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct MetricSeries {
    pub points: Vec<SeriesPoint>,
}

impl MetricSeries {
    pub fn new(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn valid_points(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }
}

/// Where a dataset came from, as shown to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Live,
    Demo,
    Fallback,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub source: DataOrigin,
    pub period: String,
    pub generated_at: DateTime<Utc>,
    pub interval: Interval,
    pub record_count: usize,
    /// Live values spread from range aggregates rather than measured per slot.
    pub approximated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_record: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_record: Option<DateTime<FixedOffset>>,
}

impl DatasetMetadata {
    pub fn new(
        source: DataOrigin,
        period: String,
        interval: Interval,
        record_count: usize,
    ) -> Self {
        Self {
            source,
            period,
            generated_at: Utc::now(),
            interval,
            record_count,
            approximated: false,
            note: None,
            error: None,
            channel_label: None,
            first_record: None,
            last_record: None,
        }
    }
}

/// Everything one chart view needs: aligned series, axis labels, provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub series: BTreeMap<MetricKind, MetricSeries>,
    pub labels: Vec<String>,
    pub metadata: DatasetMetadata,
}

impl ChartDataset {
    pub fn new(
        series: BTreeMap<MetricKind, MetricSeries>,
        labels: Vec<String>,
        metadata: DatasetMetadata,
    ) -> Self {
        Self {
            series,
            labels,
            metadata,
        }
    }

    pub fn metric(&self, kind: MetricKind) -> Option<&MetricSeries> {
        self.series.get(&kind)
    }

    /// True if every series matches the label count and the timestamps of
    /// the first series.
    pub fn is_aligned(&self) -> bool {
        let mut rest = self.series.values();
        let Some(first) = rest.next() else {
            return true;
        };
        first.len() == self.labels.len()
            && rest.all(|s| {
                s.len() == first.len()
                    && s.points
                        .iter()
                        .zip(&first.points)
                        .all(|(a, b)| a.timestamp == b.timestamp)
            })
    }

    /// Largest number of non-absent points across metrics.
    pub fn max_valid_points(&self) -> usize {
        self.series
            .values()
            .map(MetricSeries::valid_points)
            .max()
            .unwrap_or(0)
    }
}
