//! Incremental trade synchronization and bar regeneration
//!
//! One reconciliation cycle for a symbol:
//! 1. load the persisted trade history (absent means empty)
//! 2. take the newest trade time + 1ns as the watermark
//! 3. fetch trades at or after the watermark
//! 4. prepend them to the history
//! 5. persist the merged history
//! 6. split-adjust, aggregate every resolution, persist and cache the bars
//!
//! Stages run strictly in order and a failure aborts the cycle before the
//! cache is touched. Cycles for the same symbol are serialized.
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::data::bar_aggregator::BarAggregator;
use crate::data::bar_cache::ResolutionCache;
use crate::data::resolution::ResolutionTable;
use crate::data::split::SplitAdjuster;
use crate::data::store::FileStore;
use crate::dex::TradeSource;
use crate::error::{ChartError, Result};
use crate::symbols::SymbolTable;
use crate::types::{SymbolConfig, Trade};

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub watermark: DateTime<Utc>,
    pub existing_trades: usize,
    pub new_trades: usize,
    pub total_trades: usize,
    pub split_adjusted: usize,
    pub resolutions_updated: Vec<String>,
    pub duration_ms: i64,
}

/// Lower fetch bound for a newest-first history. One nanosecond past the
/// newest known trade so it is not fetched again.
pub fn watermark(trades: &[Trade]) -> DateTime<Utc> {
    trades
        .first()
        .map(|newest| newest.time + Duration::nanoseconds(1))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Put newly fetched trades (newest first) ahead of the existing history
pub fn merge_trades(mut fetched: Vec<Trade>, existing: Vec<Trade>) -> Vec<Trade> {
    fetched.extend(existing);
    fetched
}

pub struct SyncReconciler {
    source: Arc<dyn TradeSource>,
    store: FileStore,
    cache: Arc<ResolutionCache>,
    resolutions: Arc<ResolutionTable>,
    symbols: Arc<SymbolTable>,
    aggregator: BarAggregator,
    split: Option<SplitAdjuster>,
    locks: HashMap<String, Arc<Mutex<()>>>,
}

impl SyncReconciler {
    pub fn new(
        source: Arc<dyn TradeSource>,
        store: FileStore,
        cache: Arc<ResolutionCache>,
        resolutions: Arc<ResolutionTable>,
        symbols: Arc<SymbolTable>,
        aggregator: BarAggregator,
        split: Option<SplitAdjuster>,
    ) -> Self {
        let locks = symbols
            .configs()
            .map(|s| (s.key(), Arc::new(Mutex::new(()))))
            .collect();

        SyncReconciler {
            source,
            store,
            cache,
            resolutions,
            symbols,
            aggregator,
            split,
            locks,
        }
    }

    /// Run one reconciliation cycle for `ticker`
    pub async fn sync_symbol(&self, ticker: &str) -> Result<SyncReport> {
        let symbol = self
            .symbols
            .get(ticker)
            .cloned()
            .ok_or_else(|| ChartError::SymbolNotFound(ticker.to_string()))?;
        let key = symbol.key();

        let lock = self
            .locks
            .get(&key)
            .cloned()
            .ok_or_else(|| ChartError::SymbolNotFound(ticker.to_string()))?;
        let _guard = lock.lock().await;

        let run_id = Uuid::new_v4();
        let span = info_span!("sync", symbol = %key, run_id = %run_id);
        self.run_cycle(&symbol, run_id).instrument(span).await
    }

    async fn run_cycle(&self, symbol: &SymbolConfig, run_id: Uuid) -> Result<SyncReport> {
        let started = Utc::now();
        let key = symbol.key();
        info!("Syncing trades: {}", key);

        // 1. Load
        let existing = match self.store.load_trades(&key).await {
            Ok(trades) => trades,
            Err(ChartError::FileNotFound(_)) => {
                self.store.ensure_symbol_dir(&key).await.map_err(|e| {
                    error!("Failed to create directory for {}: {}", key, e);
                    e
                })?;
                Vec::new()
            }
            Err(e) => {
                error!("Sync failed loading trades ({}): {}", e.error_code(), e);
                return Err(e);
            }
        };
        debug!("Loaded existing trades: {}", existing.len());

        // 2. Watermark
        let since = watermark(&existing);

        // 3. Fetch
        let fetched = self
            .source
            .fetch_trades(&symbol.address, &symbol.base_address, since)
            .await
            .map_err(|e| {
                error!("Failed to retrieve trades ({}): {}", e.error_code(), e);
                e
            })?;

        if let Some(oldest_new) = fetched.last() {
            if oldest_new.time < since {
                warn!(
                    "Trade source returned trades before the watermark {}",
                    since
                );
            }
        }

        // 4. Merge
        let existing_count = existing.len();
        let new_count = fetched.len();
        let mut trades = merge_trades(fetched, existing);

        // 5. Persist
        self.store.save_trades(&key, &trades).await.map_err(|e| {
            error!("Trade file save failed ({}): {}", e.error_code(), e);
            e
        })?;
        info!(
            "Sync complete. Ticker: {}, Total Trades: {}, New: {}",
            key,
            trades.len(),
            new_count
        );

        // 6. Re-aggregate
        let split_adjusted = match &self.split {
            Some(split) => split.apply(&symbol.ticker, &mut trades),
            None => 0,
        };
        let resolutions_updated = self.regenerate_bars(&key, &trades).await?;

        Ok(SyncReport {
            run_id,
            symbol: key,
            timestamp: started,
            watermark: since,
            existing_trades: existing_count,
            new_trades: new_count,
            total_trades: trades.len(),
            split_adjusted,
            resolutions_updated,
            duration_ms: (Utc::now() - started).num_milliseconds(),
        })
    }

    /// Aggregate, persist and cache bars for every configured resolution.
    /// A resolution whose bar file cannot be written keeps its previous cache
    /// entry; the others still update.
    async fn regenerate_bars(&self, key: &str, trades: &[Trade]) -> Result<Vec<String>> {
        let mut updated = Vec::with_capacity(self.resolutions.len());
        let mut failed = 0;

        for resolution in self.resolutions.iter() {
            let bars = self.aggregator.aggregate(trades, resolution.bucket());
            debug!(
                "Generated {} bars for resolution {} ({} min)",
                bars.len(),
                resolution.label(),
                resolution.bucket_minutes()
            );

            match self.store.save_bars(key, resolution, &bars).await {
                Ok(()) => {
                    self.cache.replace(key, resolution.label(), bars).await;
                    updated.push(resolution.label().to_string());
                }
                Err(e) => {
                    error!(
                        "Failed to save bars for {} resolution {}: {}",
                        key,
                        resolution.label(),
                        e
                    );
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(ChartError::SyncIncomplete {
                symbol: key.to_string(),
                failed,
            });
        }
        Ok(updated)
    }

    /// Reconcile every configured symbol concurrently. One symbol failing
    /// does not affect the others.
    pub async fn sync_all(&self) -> Vec<(String, Result<SyncReport>)> {
        let tickers: Vec<String> = self.symbols.configs().map(|s| s.key()).collect();
        let results = join_all(tickers.iter().map(|ticker| self.sync_symbol(ticker))).await;

        let outcomes: Vec<(String, Result<SyncReport>)> =
            tickers.into_iter().zip(results).collect();
        let failures = outcomes.iter().filter(|(_, r)| r.is_err()).count();
        if failures > 0 {
            warn!(
                "Sync pass finished: {} of {} symbols failed",
                failures,
                outcomes.len()
            );
        } else {
            info!("Sync pass finished: {} symbols", outcomes.len());
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::resolution::Resolution;
    use crate::types::SymbolConfig;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;

    /// Serves trades from an in-memory "exchange", newest first
    #[derive(Default)]
    struct FakeSource {
        trades: StdMutex<Vec<Trade>>,
        calls: StdMutex<Vec<DateTime<Utc>>>,
        fail: StdMutex<bool>,
    }

    impl FakeSource {
        fn push(&self, trade: Trade) {
            let mut trades = self.trades.lock().unwrap();
            trades.insert(0, trade);
        }

        fn set_failing(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }
    }

    #[async_trait]
    impl TradeSource for FakeSource {
        async fn fetch_trades(
            &self,
            _token: &str,
            _base: &str,
            since: DateTime<Utc>,
        ) -> Result<Vec<Trade>> {
            self.calls.lock().unwrap().push(since);
            if *self.fail.lock().unwrap() {
                return Err(ChartError::TradeSourceError("connection reset".to_string()));
            }
            let trades = self.trades.lock().unwrap();
            Ok(trades.iter().filter(|t| t.time >= since).cloned().collect())
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        source: Arc<FakeSource>,
        store: FileStore,
        cache: Arc<ResolutionCache>,
        reconciler: SyncReconciler,
    }

    fn fixture(split: Option<SplitAdjuster>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let source = Arc::new(FakeSource::default());
        let cache = Arc::new(ResolutionCache::new(store.clone()));
        let resolutions = Arc::new(ResolutionTable::from_labels(&["30", "60"]));
        let symbols = Arc::new(SymbolTable::new(
            &[
                SymbolConfig::new("Halo", "HALO", "Halo Platform", "0x0", "0x1"),
                SymbolConfig::new("VET", "VET", "Vechain", "0x2", "0x1"),
            ],
            &resolutions.labels(),
        ));
        let reconciler = SyncReconciler::new(
            source.clone(),
            store.clone(),
            Arc::clone(&cache),
            resolutions,
            symbols,
            BarAggregator::default(),
            split,
        );

        Fixture {
            _dir: dir,
            source,
            store,
            cache,
            reconciler,
        }
    }

    #[test]
    fn test_watermark() {
        assert_eq!(watermark(&[]), DateTime::<Utc>::UNIX_EPOCH);

        let trades = vec![
            Trade::new(t0() + Duration::minutes(1), 1.0, 1.0),
            Trade::new(t0(), 1.0, 1.0),
        ];
        assert_eq!(
            watermark(&trades),
            t0() + Duration::minutes(1) + Duration::nanoseconds(1)
        );
    }

    #[test]
    fn test_merge_keeps_descending_order() {
        let existing = vec![
            Trade::new(t0() + Duration::minutes(1), 2.0, 1.0),
            Trade::new(t0(), 1.0, 1.0),
        ];
        let fetched = vec![
            Trade::new(t0() + Duration::minutes(3), 4.0, 1.0),
            Trade::new(t0() + Duration::minutes(2), 3.0, 1.0),
        ];

        let merged = merge_trades(fetched, existing);
        let prices: Vec<f64> = merged.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[tokio::test]
    async fn test_empty_history_and_empty_fetch() {
        let f = fixture(None);

        let report = f.reconciler.sync_symbol("HALO").await.unwrap();
        assert_eq!(report.total_trades, 0);
        assert_eq!(report.watermark, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(report.resolutions_updated, vec!["30", "60"]);

        assert!(f.store.symbol_dir("halo").is_dir());
        assert!(f.store.load_trades("halo").await.unwrap().is_empty());
        let bars = f.cache.peek("halo", "30").await.unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_incremental_sync_never_drops_or_duplicates() {
        let f = fixture(None);
        for minute in [0, 10, 35] {
            f.source.push(Trade::new(
                t0() + Duration::minutes(minute),
                1.0 + minute as f64,
                1.0,
            ));
        }

        let first = f.reconciler.sync_symbol("halo").await.unwrap();
        assert_eq!(first.new_trades, 3);
        let after_first = f.store.load_trades("halo").await.unwrap();

        for minute in [70, 95] {
            f.source.push(Trade::new(
                t0() + Duration::minutes(minute),
                1.0 + minute as f64,
                1.0,
            ));
        }
        let second = f.reconciler.sync_symbol("halo").await.unwrap();
        assert_eq!(second.existing_trades, 3);
        assert_eq!(second.new_trades, 2);
        assert_eq!(
            second.watermark,
            t0() + Duration::minutes(35) + Duration::nanoseconds(1)
        );

        let after_second = f.store.load_trades("halo").await.unwrap();
        assert_eq!(after_second.len(), 5);
        assert_eq!(&after_second[2..], after_first.as_slice());
        for pair in after_second.windows(2) {
            assert!(pair[0].time >= pair[1].time);
        }

        // Nothing new: history unchanged
        let third = f.reconciler.sync_symbol("halo").await.unwrap();
        assert_eq!(third.new_trades, 0);
        assert_eq!(f.store.load_trades("halo").await.unwrap(), after_second);
    }

    #[tokio::test]
    async fn test_bars_cached_and_persisted() {
        let f = fixture(None);
        for (minute, price) in [(0, 1.0), (10, 3.0), (20, 2.0), (40, 5.0)] {
            f.source
                .push(Trade::new(t0() + Duration::minutes(minute), price, 2.0));
        }

        f.reconciler.sync_symbol("HALO").await.unwrap();

        let cached = f.cache.peek("halo", "30").await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].open, 1.0);
        assert_eq!(cached[0].high, 3.0);
        assert_eq!(cached[0].close, 2.0);
        assert_eq!(cached[0].volume, 6.0);

        let persisted = f
            .store
            .load_bars("halo", &Resolution::parse("30").unwrap())
            .await
            .unwrap();
        assert_eq!(persisted.as_slice(), cached.as_slice());

        // Trailing 60-minute bar never closed
        assert!(f.cache.peek("halo", "60").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_commits_nothing() {
        let f = fixture(None);
        f.source.push(Trade::new(t0(), 1.0, 1.0));
        f.source
            .push(Trade::new(t0() + Duration::minutes(45), 2.0, 1.0));
        f.reconciler.sync_symbol("halo").await.unwrap();
        let cached_before = f.cache.peek("halo", "30").await.unwrap();

        f.source
            .push(Trade::new(t0() + Duration::minutes(90), 3.0, 1.0));
        f.source.set_failing(true);

        let err = f.reconciler.sync_symbol("halo").await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(f.store.load_trades("halo").await.unwrap().len(), 2);
        assert!(Arc::ptr_eq(
            &cached_before,
            &f.cache.peek("halo", "30").await.unwrap()
        ));

        // Next cycle picks up where the last good one left off
        f.source.set_failing(false);
        let report = f.reconciler.sync_symbol("halo").await.unwrap();
        assert_eq!(report.new_trades, 1);
    }

    #[tokio::test]
    async fn test_corrupt_history_aborts_cycle() {
        let f = fixture(None);
        f.store.ensure_symbol_dir("vet").await.unwrap();
        tokio::fs::write(f.store.trades_path("vet"), b"[{\"time\":")
            .await
            .unwrap();

        let err = f.reconciler.sync_symbol("VET").await.unwrap_err();
        assert!(matches!(err, ChartError::DeserializationError(_)));
        assert!(f.source.calls.lock().unwrap().is_empty());
        assert!(f.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_split_applies_to_bars_not_history() {
        let cutover = t0() + Duration::minutes(30);
        let f = fixture(Some(SplitAdjuster::new("halo", 10.0, cutover)));
        f.source.push(Trade::new(t0(), 50.0, 1.0));
        f.source
            .push(Trade::new(t0() + Duration::minutes(31), 5.0, 10.0));
        f.source
            .push(Trade::new(t0() + Duration::minutes(61), 6.0, 10.0));

        let report = f.reconciler.sync_symbol("halo").await.unwrap();
        assert_eq!(report.split_adjusted, 1);

        let bars = f.cache.peek("halo", "30").await.unwrap();
        assert_eq!(bars[0].open, 5.0);
        assert_eq!(bars[0].volume, 10.0);
        assert_eq!(bars[1].open, 5.0);

        // Raw prices on disk; re-running adjusts from raw again
        let raw = f.store.load_trades("halo").await.unwrap();
        assert_eq!(raw.last().unwrap().price, 50.0);
        f.reconciler.sync_symbol("halo").await.unwrap();
        assert_eq!(f.cache.peek("halo", "30").await.unwrap()[0].open, 5.0);
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let f = fixture(None);
        let err = f.reconciler.sync_symbol("BTC").await.unwrap_err();
        assert!(matches!(err, ChartError::SymbolNotFound(_)));
    }

    #[tokio::test]
    async fn test_sync_all_isolates_failures() {
        let f = fixture(None);
        f.store.ensure_symbol_dir("vet").await.unwrap();
        tokio::fs::write(f.store.trades_path("vet"), b"garbage")
            .await
            .unwrap();

        let outcomes = f.reconciler.sync_all().await;
        assert_eq!(outcomes.len(), 2);
        let halo = outcomes.iter().find(|(t, _)| t == "halo").unwrap();
        let vet = outcomes.iter().find(|(t, _)| t == "vet").unwrap();
        assert!(halo.1.is_ok());
        assert!(vet.1.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_syncs_for_one_symbol_are_serialized() {
        let f = fixture(None);
        for minute in 0..20 {
            f.source
                .push(Trade::new(t0() + Duration::minutes(minute * 5), 1.0, 1.0));
        }

        let (a, b) = tokio::join!(
            f.reconciler.sync_symbol("halo"),
            f.reconciler.sync_symbol("halo")
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.new_trades + b.new_trades, 20);
        assert_eq!(f.store.load_trades("halo").await.unwrap().len(), 20);
    }
}
