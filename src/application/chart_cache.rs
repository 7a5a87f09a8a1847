// In-memory read-through cache for chart datasets
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::time::{Duration, Instant};

use crate::application::chart_data_service::SourceMode;
use crate::domain::filter::Filter;
use crate::domain::telemetry::ChartDataset;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    dataset: Arc<ChartDataset>,
    created_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

/// Entries are replaced wholesale and expire after a fixed TTL.
/// Identical concurrent requests are not deduplicated; the last insert wins.
#[derive(Debug)]
pub struct ChartCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ChartCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Canonical key: mode, requested interval, range and region.
    pub fn key(mode: SourceMode, filter: &Filter) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            mode,
            filter.interval(),
            filter.start().to_rfc3339(),
            filter.end().to_rfc3339(),
            filter.region().unwrap_or_default()
        )
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh entry for `key`, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<Arc<ChartDataset>> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => Some(entry.dataset.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `dataset` under `key`, sweeping every expired entry first so
    /// one-off keys do not accumulate.
    pub fn insert(&self, key: String, dataset: Arc<ChartDataset>) {
        let entry = CacheEntry {
            dataset,
            created_at: Instant::now(),
        };
        let mut entries = self.lock();
        entries.retain(|_, e| e.created_at.elapsed() < self.ttl);
        entries.insert(key, entry);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Fresh entries only.
    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.created_at.elapsed() < self.ttl)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        CacheStats {
            size: keys.len(),
            keys,
        }
    }
}

impl Default for ChartCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
