// Error taxonomy for chart data acquisition
use chrono::{DateTime, FixedOffset};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("backend returned no records for the requested range")]
    EmptyResult,

    #[error("unexpected backend response: {0}")]
    Transform(String),

    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
}

impl SourceError {
    /// Whether the dashboard should show this failure as an error rather than
    /// a quiet substitution.
    pub fn is_visible(&self) -> bool {
        matches!(self, SourceError::Network(_) | SourceError::Transform(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Transform(err.to_string())
    }
}
