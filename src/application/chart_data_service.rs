// Chart data service - Source selection, sufficiency checks, fallback and caching
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Duration;

use crate::application::chart_cache::{CacheStats, ChartCache, DEFAULT_TTL};
use crate::application::series_generator::SeriesGenerator;
use crate::application::telemetry_source::TelemetrySource;
use crate::domain::error::SourceError;
use crate::domain::filter::Filter;
use crate::domain::telemetry::{ChartDataset, DataOrigin};

/// A live dataset needs at least this many readings in one metric to be shown.
pub const DEFAULT_MIN_VALID_POINTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Live,
    Demo,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Live => f.write_str("live"),
            SourceMode::Demo => f.write_str("demo"),
        }
    }
}

impl FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(SourceMode::Live),
            "demo" => Ok(SourceMode::Demo),
            other => Err(format!("unknown source mode: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub initial_mode: SourceMode,
    pub cache_ttl: Duration,
    pub min_valid_points: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            initial_mode: SourceMode::default(),
            cache_ttl: DEFAULT_TTL,
            min_valid_points: DEFAULT_MIN_VALID_POINTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insolation_sample: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ChartDataService {
    source: Arc<dyn TelemetrySource>,
    generator: SeriesGenerator,
    cache: ChartCache,
    mode: RwLock<SourceMode>,
    min_valid_points: usize,
}

impl ChartDataService {
    pub fn new(source: Arc<dyn TelemetrySource>, settings: ServiceSettings) -> Self {
        Self {
            source,
            generator: SeriesGenerator::new(),
            cache: ChartCache::new(settings.cache_ttl),
            mode: RwLock::new(settings.initial_mode),
            min_valid_points: settings.min_valid_points,
        }
    }

    pub fn source_mode(&self) -> SourceMode {
        *self.mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch between live and demo data. Any switch empties the cache so
    /// datasets from the previous mode are never served. Unknown modes are
    /// rejected and leave everything untouched.
    pub fn set_source_mode(&self, mode: &str) -> bool {
        let mode = match mode.parse::<SourceMode>() {
            Ok(mode) => mode,
            Err(e) => {
                tracing::warn!("Rejected source mode change: {}", e);
                return false;
            }
        };

        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
        self.cache.clear();
        tracing::info!("Data source switched to {}", mode);
        true
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::debug!("Chart cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Dataset for a filter. Never fails: backend problems are replaced with
    /// demo data and described in the metadata.
    pub async fn get_chart_data(&self, filter: &Filter) -> Arc<ChartDataset> {
        let mode = self.source_mode();
        let key = ChartCache::key(mode, filter);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {}", key);
            return cached;
        }

        let dataset = match mode {
            SourceMode::Demo => self.generator.generate(filter),
            SourceMode::Live => self.fetch_live(filter).await,
        };

        let dataset = Arc::new(dataset);
        self.cache.insert(key, dataset.clone());
        dataset
    }

    async fn fetch_live(&self, filter: &Filter) -> ChartDataset {
        match self.source.fetch_and_normalize(filter).await {
            Ok(dataset) if dataset.max_valid_points() >= self.min_valid_points => dataset,
            Ok(dataset) => {
                tracing::warn!(
                    "{} returned only {} valid points per metric, using demo data",
                    self.source.label(),
                    dataset.max_valid_points()
                );
                let note = format!(
                    "Demo data shown: {} has fewer than {} readings for this period",
                    self.source.label(),
                    self.min_valid_points
                );
                self.substitute(filter, DataOrigin::Fallback, note, None)
            }
            Err(e) => {
                let origin = if e.is_visible() {
                    tracing::error!("Fetching from {} failed: {}", self.source.label(), e);
                    DataOrigin::Error
                } else {
                    tracing::warn!("Fetching from {} failed: {}", self.source.label(), e);
                    DataOrigin::Fallback
                };
                let note = format!("Demo data shown: {} is unavailable", self.source.label());
                self.substitute(filter, origin, note, Some(&e))
            }
        }
    }

    fn substitute(
        &self,
        filter: &Filter,
        origin: DataOrigin,
        note: String,
        error: Option<&SourceError>,
    ) -> ChartDataset {
        let mut dataset = self.generator.generate(filter);
        dataset.metadata.source = origin;
        dataset.metadata.note = Some(note);
        dataset.metadata.error = error.map(ToString::to_string);
        dataset.metadata.channel_label = Some(self.source.label().to_string());
        dataset
    }

    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.source.probe().await {
            Ok(report) => ConnectionStatus {
                success: report.reachable,
                channel_label: Some(report.channel_label),
                record_count: Some(report.record_count),
                last_update: report.last_record_timestamp,
                insolation_sample: Some(report.insolation_sample),
                error: None,
            },
            Err(e) => {
                tracing::warn!("Connection test against {} failed: {}", self.source.label(), e);
                ConnectionStatus {
                    success: false,
                    channel_label: None,
                    record_count: None,
                    last_update: None,
                    insolation_sample: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Backend's own channel description, if it publishes one.
    pub async fn channel_info(&self) -> Result<Option<Value>, SourceError> {
        self.source.channel_info().await.inspect_err(|e| {
            tracing::warn!("Channel info from {} unavailable: {}", self.source.label(), e);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::telemetry_source::ProbeReport;
    use crate::domain::filter::Interval;
    use crate::domain::telemetry::{DatasetMetadata, MetricKind, MetricSeries, SeriesPoint};
    use crate::domain::time::{add_hours, label_for};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Responder = Box<dyn Fn() -> Result<ChartDataset, SourceError> + Send + Sync>;

    struct StubSource {
        calls: AtomicUsize,
        respond: Responder,
    }

    impl StubSource {
        fn new(
            respond: impl Fn() -> Result<ChartDataset, SourceError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                respond: Box::new(respond),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TelemetrySource for StubSource {
        fn label(&self) -> &str {
            "stub channel"
        }

        async fn fetch_and_normalize(&self, _filter: &Filter) -> Result<ChartDataset, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)()
        }

        async fn probe(&self) -> Result<ProbeReport, SourceError> {
            Ok(ProbeReport {
                reachable: true,
                record_count: 5,
                last_record_timestamp: Some(ts("2024-01-07T23:00:00+03:00")),
                channel_label: self.label().to_string(),
                insolation_sample: vec![0.42, 0.0],
            })
        }
    }

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn week(interval: Interval) -> Filter {
        Filter::new(
            ts("2024-01-01T00:00:00+03:00"),
            ts("2024-01-08T00:00:00+03:00"),
            Some("Москва".to_string()),
            interval,
        )
        .unwrap()
    }

    /// A live feed-like dataset built from per-metric readings.
    fn live_dataset(readings: &[(MetricKind, Vec<Option<f64>>)]) -> ChartDataset {
        let len = readings.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let first = ts("2024-01-01T00:00:00+03:00");
        let stamps: Vec<_> = (0..len).map(|i| add_hours(first, i as i64)).collect();

        let series: BTreeMap<_, _> = MetricKind::ALL
            .into_iter()
            .map(|kind| {
                let values = readings
                    .iter()
                    .find(|(k, _)| *k == kind)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| vec![None; len]);
                let points = stamps
                    .iter()
                    .zip(values)
                    .map(|(t, v)| SeriesPoint::new(*t, v))
                    .collect();
                (kind, MetricSeries::new(points))
            })
            .collect();
        let labels = stamps.iter().map(|t| label_for(*t, Interval::Hourly)).collect();
        let metadata =
            DatasetMetadata::new(DataOrigin::Live, "period".to_string(), Interval::Hourly, len);
        ChartDataset::new(series, labels, metadata)
    }

    fn service(source: Arc<StubSource>, mode: SourceMode) -> ChartDataService {
        let settings = ServiceSettings {
            initial_mode: mode,
            ..ServiceSettings::default()
        };
        ChartDataService::new(source, settings)
    }

    #[tokio::test]
    async fn test_demo_mode_generates_without_touching_source() {
        let source = StubSource::new(|| Err(SourceError::EmptyResult));
        let service = service(source.clone(), SourceMode::Demo);

        let ds = service.get_chart_data(&week(Interval::Daily)).await;
        assert_eq!(ds.metadata.source, DataOrigin::Demo);
        assert_eq!(ds.labels.len(), 7);
        assert_eq!(ds.series.len(), 4);
        assert!(ds.series.values().all(|s| s.len() == 7));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let source = StubSource::new(|| {
            Ok(live_dataset(&[(
                MetricKind::Temperature,
                vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), None],
            )]))
        });
        let service = service(source.clone(), SourceMode::Live);
        let f = week(Interval::Hourly);

        let first = service.get_chart_data(&f).await;
        let second = service.get_chart_data(&f).await;

        assert_eq!(first.metadata.source, DataOrigin::Live);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_demo_cache_returns_identical_dataset() {
        let service = service(StubSource::new(|| Err(SourceError::EmptyResult)), SourceMode::Demo);
        let f = week(Interval::Daily);
        let first = service.get_chart_data(&f).await;
        let second = service.get_chart_data(&f).await;
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn test_mode_switch_invalidates_cache() {
        let source = StubSource::new(|| {
            Ok(live_dataset(&[(MetricKind::Humidity, vec![Some(50.0); 8])]))
        });
        let service = service(source.clone(), SourceMode::Live);
        let f = week(Interval::Hourly);

        service.get_chart_data(&f).await;
        assert_eq!(service.cache_stats().size, 1);

        assert!(service.set_source_mode("demo"));
        assert_eq!(service.cache_stats().size, 0);
        assert!(service.set_source_mode("LIVE"));
        assert_eq!(service.source_mode(), SourceMode::Live);

        service.get_chart_data(&f).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_mode_is_rejected() {
        let service = service(StubSource::new(|| Err(SourceError::EmptyResult)), SourceMode::Demo);
        service.get_chart_data(&week(Interval::Daily)).await;

        assert!(!service.set_source_mode("bogus"));
        assert_eq!(service.source_mode(), SourceMode::Demo);
        assert_eq!(service.cache_stats().size, 1);
    }

    #[tokio::test]
    async fn test_sparse_live_data_falls_back_to_demo() {
        let source = StubSource::new(|| {
            Ok(live_dataset(&[
                (MetricKind::Temperature, vec![Some(3.5), None, Some(4.0), None]),
                (MetricKind::Humidity, vec![None, None, None, None]),
            ]))
        });
        let service = service(source, SourceMode::Live);

        let ds = service.get_chart_data(&week(Interval::Daily)).await;
        assert_eq!(ds.metadata.source, DataOrigin::Fallback);
        assert!(ds.metadata.note.is_some());
        assert_eq!(ds.labels.len(), 7);
        assert!(ds.series.values().all(|s| s.valid_points() == 7));
    }

    #[tokio::test]
    async fn test_empty_result_is_a_quiet_fallback() {
        let service = service(StubSource::new(|| Err(SourceError::EmptyResult)), SourceMode::Live);
        let ds = service.get_chart_data(&week(Interval::Daily)).await;
        assert_eq!(ds.metadata.source, DataOrigin::Fallback);
        assert!(ds.metadata.error.is_some());
        assert_eq!(service.cache_stats().size, 1);
    }

    #[tokio::test]
    async fn test_network_failure_is_surfaced_as_error() {
        let service = service(
            StubSource::new(|| Err(SourceError::Network("connection refused".to_string()))),
            SourceMode::Live,
        );
        let ds = service.get_chart_data(&week(Interval::Daily)).await;
        assert_eq!(ds.metadata.source, DataOrigin::Error);
        assert!(ds.metadata.error.as_deref().unwrap().contains("connection refused"));
        assert!(ds.is_aligned());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let source = StubSource::new(|| {
            Ok(live_dataset(&[(MetricKind::Pressure, vec![Some(1000.0); 6])]))
        });
        let service = service(source.clone(), SourceMode::Live);
        let f = week(Interval::Hourly);

        service.get_chart_data(&f).await;
        service.clear_cache();
        service.get_chart_data(&f).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_connection_reports_probe() {
        let service = service(StubSource::new(|| Err(SourceError::EmptyResult)), SourceMode::Live);
        let status = service.test_connection().await;
        assert!(status.success);
        assert_eq!(status.channel_label.as_deref(), Some("stub channel"));
        assert_eq!(status.record_count, Some(5));
        assert_eq!(status.insolation_sample, Some(vec![0.42, 0.0]));
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_channel_info_defaults_to_none() {
        let service = service(StubSource::new(|| Err(SourceError::EmptyResult)), SourceMode::Live);
        assert!(service.channel_info().await.unwrap().is_none());
    }
}
