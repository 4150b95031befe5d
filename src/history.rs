//! History query over cached bars
//! (https://github.com/tradingview/charting_library/wiki/UDF#bars)
use serde::Serialize;
use tracing::{debug, warn};

use crate::data::bar_cache::ResolutionCache;
use crate::data::resolution::ResolutionTable;
use crate::symbols::SymbolTable;
use crate::types::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Ok,
    NoData,
    Error,
}

/// UDF history response. Bar fields are parallel arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History {
    #[serde(rename = "s")]
    pub status: HistoryStatus,
    #[serde(rename = "errmsg", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "t", skip_serializing_if = "Vec::is_empty")]
    pub time: Vec<i64>,
    #[serde(rename = "o", skip_serializing_if = "Vec::is_empty")]
    pub open: Vec<f64>,
    #[serde(rename = "h", skip_serializing_if = "Vec::is_empty")]
    pub high: Vec<f64>,
    #[serde(rename = "l", skip_serializing_if = "Vec::is_empty")]
    pub low: Vec<f64>,
    #[serde(rename = "c", skip_serializing_if = "Vec::is_empty")]
    pub close: Vec<f64>,
    #[serde(rename = "v", skip_serializing_if = "Vec::is_empty")]
    pub volume: Vec<f64>,
    /// Start of the closest earlier bar, only with `no_data`
    #[serde(rename = "nextTime", skip_serializing_if = "Option::is_none")]
    pub next_time: Option<i64>,
}

impl History {
    fn empty(status: HistoryStatus) -> Self {
        History {
            status,
            error_message: None,
            time: Vec::new(),
            open: Vec::new(),
            high: Vec::new(),
            low: Vec::new(),
            close: Vec::new(),
            volume: Vec::new(),
            next_time: None,
        }
    }

    pub fn no_data(next_time: Option<i64>) -> Self {
        History {
            next_time,
            ..History::empty(HistoryStatus::NoData)
        }
    }

    pub fn error(message: String) -> Self {
        History {
            error_message: Some(message),
            ..History::empty(HistoryStatus::Error)
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Bars (ascending) whose start lies in `[from, to]`, Unix seconds
    pub fn from_bars(bars: &[Bar], from: i64, to: i64) -> Self {
        let mut history = History::empty(HistoryStatus::Ok);

        for bar in bars.iter().filter(|b| (from..=to).contains(&b.unix_time())) {
            history.time.push(bar.unix_time());
            history.open.push(bar.open);
            history.high.push(bar.high);
            history.low.push(bar.low);
            history.close.push(bar.close);
            history.volume.push(bar.volume);
        }

        if history.is_empty() {
            let next_time = bars.iter().rev().map(Bar::unix_time).find(|t| *t < from);
            return History::no_data(next_time);
        }
        history
    }
}

/// Answer a history request from the cache, loading persisted bars on a miss.
/// Never fetches trades or aggregates. Unknown symbols, unsupported
/// resolutions and missing bar files all answer `no_data`.
pub async fn query_history(
    symbols: &SymbolTable,
    resolutions: &ResolutionTable,
    cache: &ResolutionCache,
    symbol: &str,
    resolution: &str,
    from: i64,
    to: i64,
) -> History {
    let Some(info) = symbols.find(symbol) else {
        debug!("History requested for unknown symbol: {}", symbol);
        return History::no_data(None);
    };
    let Some(resolution) = resolutions.get(resolution) else {
        debug!(
            "History requested for unsupported resolution: {}",
            resolution
        );
        return History::no_data(None);
    };

    match cache.get(&info.ticker, resolution).await {
        Ok(bars) => History::from_bars(&bars, from, to),
        Err(e) if e.is_not_found() => History::no_data(None),
        Err(e) => {
            warn!(
                "Failed to load bars for {}/{}: {}",
                info.ticker,
                resolution.label(),
                e
            );
            History::error(format!("Failed to read bars for {}", info.ticker))
        }
    }
}
