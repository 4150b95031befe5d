//! Pre-split price/volume adjustment
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{Config, Trade};

/// Rescales trades made before a token split so the whole history reads in
/// post-split units.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitAdjuster {
    ticker: String,
    ratio: f64,
    cutover: DateTime<Utc>,
}

impl SplitAdjuster {
    pub fn new(ticker: &str, ratio: f64, cutover: DateTime<Utc>) -> Self {
        SplitAdjuster {
            ticker: ticker.to_string(),
            ratio,
            cutover,
        }
    }

    /// `None` when no split is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        if config.split_ticker.is_empty() || config.split_amount <= 0.0 {
            return None;
        }
        config
            .pre_split_time
            .map(|cutover| SplitAdjuster::new(&config.split_ticker, config.split_amount, cutover))
    }

    pub fn applies_to(&self, ticker: &str) -> bool {
        self.ratio > 0.0 && self.ticker.eq_ignore_ascii_case(ticker)
    }

    /// Adjust `trades` in place and return how many were rescaled.
    /// Trades at or after the cutover are left alone.
    pub fn apply(&self, ticker: &str, trades: &mut [Trade]) -> usize {
        if !self.applies_to(ticker) {
            return 0;
        }

        let mut adjusted = 0;
        for trade in trades.iter_mut().filter(|t| t.time < self.cutover) {
            trade.amount *= self.ratio;
            trade.price /= self.ratio;
            adjusted += 1;
        }

        debug!(
            "Split adjusted {} trades for {} (ratio {})",
            adjusted, ticker, self.ratio
        );
        adjusted
    }
}
