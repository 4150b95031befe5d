//! Core type definitions for the chart data feed
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};

/// A single executed trade as reported by the DEX.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub time: DateTime<Utc>,
    pub price: f64,
    pub amount: f64,
}

impl Trade {
    pub fn new(time: DateTime<Utc>, price: f64, amount: f64) -> Self {
        Trade {
            time,
            price,
            amount,
        }
    }
}

/// OHLCV bar covering `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Bucket start as Unix seconds
    pub fn unix_time(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn to_record(&self) -> BarRecord {
        BarRecord {
            t: self.unix_time(),
            o: self.open,
            h: self.high,
            l: self.low,
            c: self.close,
            v: self.volume,
        }
    }
}

/// On-disk form of a bar. The bucket end is not stored; it is recomputed
/// from the resolution the file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub t: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
}

impl BarRecord {
    pub fn into_bar(self, bucket: Duration) -> Result<Bar> {
        let start = DateTime::<Utc>::from_timestamp(self.t, 0).ok_or_else(|| {
            ChartError::InvalidBarData(format!("bar time out of range: {}", self.t))
        })?;

        let end = start.checked_add_signed(bucket).ok_or_else(|| {
            ChartError::InvalidBarData(format!("bar end out of range: {}", self.t))
        })?;

        Ok(Bar {
            start,
            end,
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
        })
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Configuration for the chart data feed
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Storage
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    // Sync
    #[serde(default = "default_sync_interval_mins")]
    pub sync_interval_mins: u64,
    #[serde(default = "default_true")]
    pub sync_on_start: bool,

    // HTTP
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // Logging
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,

    // Stock split adjustment
    #[serde(default)]
    pub split_ticker: String,
    #[serde(default)]
    pub pre_split_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub split_amount: f64,

    // Aggregation
    #[serde(default)]
    pub ignore_trades_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub emit_trailing_bar: bool,

    pub halodex: HaloDexConfig,

    #[serde(default)]
    pub chart: ChartConfig,

    #[serde(default = "default_symbols")]
    pub symbols: Vec<SymbolConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HaloDexConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// TradingView datafeed configuration, served verbatim on `/config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub supported_resolutions: Vec<String>,
    #[serde(default)]
    pub supports_group_request: bool,
    #[serde(default)]
    pub supports_marks: bool,
    #[serde(default = "default_true")]
    pub supports_search: bool,
    #[serde(default)]
    pub supports_timescale_marks: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            supported_resolutions: Vec::new(),
            supports_group_request: false,
            supports_marks: false,
            supports_search: true,
            supports_timescale_marks: false,
        }
    }
}

/// A tradable token pair on HaloDEX
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SymbolConfig {
    pub name: String,
    pub ticker: String,
    pub description: String,
    /// Token contract address
    pub address: String,
    /// Paired base token contract address
    pub base_address: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl SymbolConfig {
    pub fn new(
        name: &str,
        ticker: &str,
        description: &str,
        address: &str,
        base_address: &str,
    ) -> Self {
        SymbolConfig {
            name: name.to_string(),
            ticker: ticker.to_string(),
            description: description.to_string(),
            address: address.to_string(),
            base_address: base_address.to_string(),
            timezone: default_timezone(),
        }
    }

    /// Storage key: tickers are case-insensitive
    pub fn key(&self) -> String {
        self.ticker.to_lowercase()
    }
}

pub const HALO_BASE_ADDRESS: &str = "0xd314d564c36c1b9fbbf6b440122f84da9a551029";

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_sync_interval_mins() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_timezone() -> String {
    "Etc/UTC".to_string()
}

pub fn default_symbols() -> Vec<SymbolConfig> {
    vec![
        SymbolConfig::new(
            "Halo",
            "HALO",
            "Halo Platform",
            "0x0000000000000000000000000000000000000000",
            HALO_BASE_ADDRESS,
        ),
        SymbolConfig::new(
            "VET",
            "VET",
            "Vechain",
            "0x280750ccb7554faec2079e8d8719515d6decdc84",
            HALO_BASE_ADDRESS,
        ),
        SymbolConfig::new(
            "VTHO",
            "VTHO",
            "Vechain Thor",
            "0x0343350a2b298370381cac03fe3c525c28600b21",
            HALO_BASE_ADDRESS,
        ),
        SymbolConfig::new(
            "DBET",
            "DBET",
            "DecentBet",
            "0x59195ebd987bde65258547041e1baed5fbd18e8b",
            HALO_BASE_ADDRESS,
        ),
    ]
}
