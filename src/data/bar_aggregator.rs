//! Bar aggregation from a trade history
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::types::{Bar, Config, Trade};
use crate::utils::truncate_to_bucket;

/// Bar in progress (not yet complete)
#[derive(Debug, Clone)]
struct PartialBar {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    trade_count: usize,
}

impl PartialBar {
    /// `None` when the bar would end past the representable time range
    fn new(trade: &Trade, bucket: Duration) -> Option<Self> {
        let start = truncate_to_bucket(trade.time, bucket);
        let end = start.checked_add_signed(bucket)?;
        Some(PartialBar {
            start,
            end,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: trade.amount,
            trade_count: 1,
        })
    }

    fn update(&mut self, price: f64, amount: f64) {
        self.close = price;
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.volume += amount;
        self.trade_count += 1;
    }

    /// A trade stamped exactly at `end` still belongs to this bar
    fn contains(&self, time: DateTime<Utc>) -> bool {
        time <= self.end
    }

    fn to_bar(&self) -> Bar {
        Bar {
            start: self.start,
            end: self.end,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Folds a newest-first trade history into fixed-size OHLCV bars.
///
/// A bar is emitted only once a later trade falls strictly after its end, so the bar that
/// is still open when the history runs out is dropped unless
/// `emit_trailing_bar` is set. Gaps in trading produce no bars.
#[derive(Debug, Clone, Default)]
pub struct BarAggregator {
    ignore_before: Option<DateTime<Utc>>,
    emit_trailing_bar: bool,
}

impl BarAggregator {
    pub fn new(ignore_before: Option<DateTime<Utc>>, emit_trailing_bar: bool) -> Self {
        BarAggregator {
            ignore_before,
            emit_trailing_bar,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        BarAggregator::new(config.ignore_trades_before, config.emit_trailing_bar)
    }

    fn is_ignored(&self, trade: &Trade) -> bool {
        self.ignore_before
            .is_some_and(|cutover| trade.time < cutover)
    }

    /// `trades` must be ordered newest first. Returns bars ascending by start.
    pub fn aggregate(&self, trades: &[Trade], bucket: Duration) -> Vec<Bar> {
        let mut bars = Vec::new();
        let mut current: Option<PartialBar> = None;

        for trade in trades.iter().rev() {
            if self.is_ignored(trade) {
                continue;
            }

            match current.as_mut() {
                Some(bar) if bar.contains(trade.time) => bar.update(trade.price, trade.amount),
                _ => {
                    if let Some(done) = current.take() {
                        bars.push(done.to_bar());
                    }
                    current = PartialBar::new(trade, bucket);
                    if current.is_none() {
                        warn!("Skipping trade @ {}: bar end out of range", trade.time);
                    }
                }
            }
        }

        if let Some(trailing) = current {
            if self.emit_trailing_bar {
                bars.push(trailing.to_bar());
            } else {
                debug!(
                    "Trailing bar @ {} not emitted ({} trades pending)",
                    trailing.start, trailing.trade_count
                );
            }
        }

        bars
    }
}
