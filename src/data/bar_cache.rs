//! In-memory bar cache keyed by symbol and resolution
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::data::resolution::Resolution;
use crate::data::store::FileStore;
use crate::error::{ChartError, Result};
use crate::types::Bar;

type BarsByResolution = HashMap<String, Arc<Vec<Bar>>>;

/// How long cache entries are kept.
///
/// Only `Unbounded` exists: entries live for the lifetime of the process.
/// Memory grows with symbols x resolutions x history length, which is fine
/// for a handful of DEX pairs but is the first thing to revisit for a larger
/// symbol set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
    #[default]
    Unbounded,
}

/// Two-level cache: symbol -> resolution label -> bars (ascending)
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, BarsByResolution>>,
    store: FileStore,
    retention: RetentionPolicy,
}

impl ResolutionCache {
    pub fn new(store: FileStore) -> Self {
        ResolutionCache {
            entries: RwLock::new(HashMap::new()),
            store,
            retention: RetentionPolicy::Unbounded,
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Cached bars, loading them from the resolution's bar file on a miss.
    /// A missing file is reported as `ChartError::BarsNotFound`.
    pub async fn get(&self, ticker: &str, resolution: &Resolution) -> Result<Arc<Vec<Bar>>> {
        let key = ticker.to_lowercase();

        if let Some(bars) = self.peek(&key, resolution.label()).await {
            return Ok(bars);
        }

        debug!("Loading bars from storage: {}/{}", key, resolution.label());
        let bars = self
            .store
            .load_bars(&key, resolution)
            .await
            .map_err(|e| match e {
                ChartError::FileNotFound(_) => {
                    ChartError::BarsNotFound(format!("{}/{}", key, resolution.label()))
                }
                other => other,
            })?;

        // Insert only if absent: a sync may have replaced the entry meanwhile
        let mut entries = self.entries.write().await;
        let cached = entries
            .entry(key)
            .or_default()
            .entry(resolution.label().to_string())
            .or_insert_with(|| Arc::new(bars))
            .clone();

        Ok(cached)
    }

    /// Cached bars without touching storage
    pub async fn peek(&self, ticker: &str, label: &str) -> Option<Arc<Vec<Bar>>> {
        let entries = self.entries.read().await;
        entries
            .get(&ticker.to_lowercase())
            .and_then(|by_resolution| by_resolution.get(label))
            .cloned()
    }

    /// Replace the whole bar sequence for one key
    pub async fn replace(&self, ticker: &str, label: &str, bars: Vec<Bar>) -> Arc<Vec<Bar>> {
        let bars = Arc::new(bars);
        let mut entries = self.entries.write().await;
        entries
            .entry(ticker.to_lowercase())
            .or_default()
            .insert(label.to_string(), Arc::clone(&bars));

        info!(
            "Cache updated: {}/{} ({} bars)",
            ticker.to_lowercase(),
            label,
            bars.len()
        );
        bars
    }

    /// Number of cached (symbol, resolution) entries
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries
            .values()
            .map(|by_resolution| by_resolution.len())
            .sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
