//! Periodic reconciliation of every configured symbol
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::app::AppContext;

/// Spawn the background sync loop. The first interval tick fires immediately,
/// so `sync_on_start = false` skips it.
pub fn spawn_sync_scheduler(ctx: Arc<AppContext>) -> JoinHandle<()> {
    let period = Duration::from_secs(ctx.config.sync_interval_mins * 60);
    let sync_on_start = ctx.config.sync_on_start;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if !sync_on_start {
            interval.tick().await;
        }

        info!(
            "Sync scheduler started, every {} min",
            period.as_secs() / 60
        );

        loop {
            interval.tick().await;
            run_sync_pass(&ctx).await;
        }
    })
}

/// Reconcile all symbols once and log a summary.
/// Returns the number of symbols that synced cleanly.
pub async fn run_sync_pass(ctx: &AppContext) -> usize {
    let results = ctx.reconciler.sync_all().await;
    let total = results.len();
    let mut synced = 0;
    let mut new_trades = 0;

    for (symbol, result) in results {
        match result {
            Ok(report) => {
                synced += 1;
                new_trades += report.new_trades;
            }
            Err(e) if e.is_recoverable() => {
                warn!("[{}] Sync failed ({}): {}", e.error_code(), symbol, e);
            }
            Err(e) => {
                error!("[{}] Sync failed ({}): {}", e.error_code(), symbol, e);
            }
        }
    }

    info!(
        "Sync pass complete: {}/{} symbols, {} new trades",
        synced, total, new_trades
    );
    synced
}
