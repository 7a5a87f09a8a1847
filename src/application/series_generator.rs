// Series generator - Plausible synthetic telemetry for demo mode and fallbacks
use std::collections::BTreeMap;
use std::f64::consts::PI;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use rand::Rng;

use crate::domain::filter::Filter;
use crate::domain::telemetry::{
    ChartDataset, DataOrigin, DatasetMetadata, MetricKind, MetricSeries, SeriesPoint,
};
use crate::domain::time::{format_period, generate_labels, slot_timestamps};

/// Shape of one metric's synthetic signal.
#[derive(Debug, Clone, Copy)]
struct MetricProfile {
    base: f64,
    daily_amplitude: f64,
    seasonal_amplitude: f64,
    trend_per_step: f64,
    noise: f64,
    min: f64,
    max: f64,
}

impl MetricProfile {
    fn for_kind(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Temperature => Self {
                base: 18.0,
                daily_amplitude: 8.0,
                seasonal_amplitude: 12.0,
                trend_per_step: 0.02,
                noise: 0.5,
                min: -30.0,
                max: 35.0,
            },
            MetricKind::Humidity => Self {
                base: 65.0,
                daily_amplitude: 15.0,
                seasonal_amplitude: 10.0,
                trend_per_step: -0.01,
                noise: 2.0,
                min: 20.0,
                max: 100.0,
            },
            MetricKind::Pressure => Self {
                base: 1013.0,
                daily_amplitude: 5.0,
                seasonal_amplitude: 8.0,
                trend_per_step: 0.005,
                noise: 0.3,
                min: 950.0,
                max: 1050.0,
            },
            MetricKind::Insolation => Self {
                base: 0.4,
                daily_amplitude: 0.3,
                seasonal_amplitude: 0.2,
                trend_per_step: 0.001,
                noise: 0.05,
                min: 0.0,
                max: 1.2,
            },
        }
    }

    /// Deterministic part of the signal: calendar cycles plus trend.
    fn cyclic(&self, timestamp: DateTime<FixedOffset>, index: usize) -> f64 {
        let month = f64::from(timestamp.month0());
        let hour = f64::from(timestamp.hour());
        let day_of_week = f64::from(timestamp.weekday().num_days_from_sunday());

        let seasonal = ((month - 3.0) * PI / 6.0).sin() * self.seasonal_amplitude;
        let daily = ((hour - 12.0) * PI / 12.0).sin() * self.daily_amplitude;
        let weekly = (day_of_week * PI / 3.5).sin() * self.daily_amplitude * 0.3;
        let trend = index as f64 * self.trend_per_step;

        self.base + seasonal + daily + weekly + trend
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Clamp to the metric's physical range; insolation also follows daylight.
fn shape(kind: MetricKind, profile: &MetricProfile, raw: f64, hour: u32) -> f64 {
    match kind {
        MetricKind::Insolation => {
            let mut value = raw;
            if !(6..=20).contains(&hour) {
                value = (value * 0.1).max(0.0);
            }
            if (10..=16).contains(&hour) {
                value = (value * 1.2).min(1.0);
            }
            round_to(value.clamp(profile.min, profile.max), 3)
        }
        _ => round_to(raw.clamp(profile.min, profile.max), 2),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeriesGenerator;

impl SeriesGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a full demo dataset using the thread-local RNG.
    pub fn generate(&self, filter: &Filter) -> ChartDataset {
        self.generate_with_rng(filter, &mut rand::rng())
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(&self, filter: &Filter, rng: &mut R) -> ChartDataset {
        let (start, end) = (filter.start(), filter.end());
        let interval = filter.interval().resolve(start, end);
        let slots = slot_timestamps(start, end, interval);
        let labels = generate_labels(start, end, interval);

        let series: BTreeMap<MetricKind, MetricSeries> = MetricKind::ALL
            .into_iter()
            .map(|kind| (kind, Self::metric_series(kind, &slots, rng)))
            .collect();

        tracing::debug!(
            "Generated {} demo slots ({}) for {}",
            slots.len(),
            interval,
            filter.region().unwrap_or("default region")
        );

        let mut metadata = DatasetMetadata::new(
            DataOrigin::Demo,
            format_period(start, end),
            interval,
            slots.len(),
        );
        metadata.note = Some("Synthetic demo data".to_string());
        metadata.first_record = slots.first().copied();
        metadata.last_record = slots.last().copied();

        ChartDataset::new(series, labels, metadata)
    }

    fn metric_series<R: Rng + ?Sized>(
        kind: MetricKind,
        slots: &[DateTime<FixedOffset>],
        rng: &mut R,
    ) -> MetricSeries {
        let profile = MetricProfile::for_kind(kind);
        let points = slots
            .iter()
            .enumerate()
            .map(|(i, &ts)| {
                let noise = rng.random_range(-1.0..=1.0) * profile.noise;
                let value = shape(kind, &profile, profile.cyclic(ts, i) + noise, ts.hour());
                SeriesPoint::new(ts, Some(value))
            })
            .collect();
        MetricSeries::new(points)
    }
}
