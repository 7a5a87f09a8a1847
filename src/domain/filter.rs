// Query filter domain model
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::error::SourceError;
use super::time::{days_between, hours_between, is_valid_range};

/// Ranges up to this many hours resolve `auto` to hourly slots.
const AUTO_HOURLY_MAX_HOURS: u64 = 48;
/// Ranges up to this many days resolve `auto` to daily slots.
const AUTO_DAILY_MAX_DAYS: u64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Hourly,
    #[default]
    Daily,
    Monthly,
    Auto,
}

impl Interval {
    /// Turn `Auto` into a concrete granularity for the given range.
    pub fn resolve(self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Interval {
        match self {
            Interval::Auto => {
                if hours_between(start, end) <= AUTO_HOURLY_MAX_HOURS {
                    Interval::Hourly
                } else if days_between(start, end) <= AUTO_DAILY_MAX_DAYS {
                    Interval::Daily
                } else {
                    Interval::Monthly
                }
            }
            concrete => concrete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Hourly => "hourly",
            Interval::Daily => "daily",
            Interval::Monthly => "monthly",
            Interval::Auto => "auto",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated query for one chart request.
///
/// The UTC offset of `start` is the dashboard's calendar: slot alignment,
/// cyclic generator components and labels are all computed in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    region: Option<String>,
    interval: Interval,
}

impl Filter {
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        region: Option<String>,
        interval: Interval,
    ) -> Result<Self, SourceError> {
        if !is_valid_range(start, end) {
            return Err(SourceError::InvalidRange { start, end });
        }

        let region = region
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        // Keep both ends on one calendar
        let end = end.with_timezone(start.offset());

        Ok(Self {
            start,
            end,
            region,
            interval,
        })
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn offset(&self) -> FixedOffset {
        *self.start.offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_rejects_inverted_range() {
        let result = Filter::new(
            ts("2024-03-10T00:00:00+03:00"),
            ts("2024-03-01T00:00:00+03:00"),
            None,
            Interval::Daily,
        );
        assert!(matches!(result, Err(SourceError::InvalidRange { .. })));
    }

    #[test]
    fn test_accepts_empty_range_and_normalizes_region() {
        let at = ts("2024-03-10T12:00:00+03:00");
        let filter = Filter::new(at, at, Some("  Москва ".to_string()), Interval::Hourly).unwrap();
        assert_eq!(filter.region(), Some("Москва"));

        let blank = Filter::new(at, at, Some("   ".to_string()), Interval::Hourly).unwrap();
        assert_eq!(blank.region(), None);
    }

    #[test]
    fn test_end_is_moved_to_start_offset() {
        let filter = Filter::new(
            ts("2024-03-10T00:00:00+03:00"),
            ts("2024-03-10T21:00:00Z"),
            None,
            Interval::Daily,
        )
        .unwrap();
        assert_eq!(filter.end().offset(), filter.start().offset());
        assert_eq!(filter.end(), ts("2024-03-11T00:00:00+03:00"));
    }

    #[test]
    fn test_auto_interval_resolution() {
        let start = ts("2024-01-01T00:00:00Z");
        assert_eq!(
            Interval::Auto.resolve(start, ts("2024-01-02T12:00:00Z")),
            Interval::Hourly
        );
        assert_eq!(
            Interval::Auto.resolve(start, ts("2024-02-15T00:00:00Z")),
            Interval::Daily
        );
        assert_eq!(
            Interval::Auto.resolve(start, ts("2024-12-31T00:00:00Z")),
            Interval::Monthly
        );
        assert_eq!(
            Interval::Monthly.resolve(start, ts("2024-01-02T00:00:00Z")),
            Interval::Monthly
        );
    }
}
