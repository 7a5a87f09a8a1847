// Dashboard configuration loaded with the config crate
use serde::Deserialize;
use std::time::Duration;

use crate::application::chart_cache::DEFAULT_TTL;
use crate::application::chart_data_service::{DEFAULT_MIN_VALID_POINTS, ServiceSettings, SourceMode};
use crate::infrastructure::http_client::DEFAULT_TIMEOUT;

const DEFAULT_CONFIG_PATH: &str = "config/dashboard";

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub service: ServiceConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub mode: SourceMode,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_min_valid_points")]
    pub min_valid_points: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
            min_valid_points: default_min_valid_points(),
        }
    }
}

impl ServiceConfig {
    pub fn settings(&self) -> ServiceSettings {
        ServiceSettings {
            initial_mode: self.mode,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            min_valid_points: self.min_valid_points,
        }
    }
}

/// Which live backend flavour to talk to. Exactly one is configured.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Feed(FeedSettings),
    Aggregate(AggregateSettings),
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        let secs = match self {
            BackendConfig::Feed(s) => s.timeout_secs,
            BackendConfig::Aggregate(s) => s.timeout_secs,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSettings {
    pub base_url: String,
    pub channel_id: u64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub channel_label: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregateSettings {
    pub base_url: String,
    #[serde(default)]
    pub channel_label: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_min_valid_points() -> usize {
    DEFAULT_MIN_VALID_POINTS
}

fn default_max_results() -> usize {
    8000
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Load `config/dashboard.{toml,yaml,json}` (or the path in `DASHBOARD_CONFIG`),
/// with `DASHBOARD__SECTION__KEY` environment overrides.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let path =
        std::env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let settings = config::Config::builder()
        .add_source(config::File::with_name(&path))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
