//! Symbol registry, TradingView symbology and search
use serde::Serialize;

use crate::types::SymbolConfig;

pub const EXCHANGE: &str = "HaloDEX";

/// Symbol description in TradingView symbology
/// (https://github.com/tradingview/charting_library/wiki/Symbology)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolInfo {
    pub ticker: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub symbol_type: String,
    pub session: String,
    pub exchange: String,
    pub listed_exchange: String,
    pub timezone: String,
    pub minmov: f64,
    pub pricescale: i64,
    pub minmov2: f64,
    pub fractional: bool,
    pub has_intraday: bool,
    pub supported_resolutions: Vec<String>,
    pub intraday_multipliers: Vec<String>,
    pub has_seconds: bool,
    pub seconds_multipliers: Vec<String>,
    pub has_daily: bool,
    pub has_weekly_and_monthly: bool,
    pub has_empty_bars: bool,
    pub force_session_rebuild: bool,
    pub has_no_volume: bool,
    pub volume_precision: i32,
    pub data_status: String,
    pub expired: bool,
    pub expiration_date: i64,
    pub sector: String,
    pub industry: String,
    pub currency_code: String,
}

impl SymbolInfo {
    fn from_config(symbol: &SymbolConfig, resolutions: &[String]) -> Self {
        SymbolInfo {
            ticker: symbol.ticker.clone(),
            name: symbol.name.clone(),
            description: symbol.description.clone(),
            symbol_type: "bitcoin".to_string(),
            session: "24x7".to_string(),
            exchange: EXCHANGE.to_string(),
            listed_exchange: EXCHANGE.to_string(),
            timezone: symbol.timezone.clone(),
            minmov: 0.01,
            pricescale: 10_000_000_000,
            minmov2: 0.0,
            fractional: false,
            has_intraday: true,
            supported_resolutions: resolutions.to_vec(),
            intraday_multipliers: Vec::new(),
            has_seconds: false,
            seconds_multipliers: Vec::new(),
            has_daily: false,
            has_weekly_and_monthly: false,
            has_empty_bars: false,
            force_session_rebuild: true,
            has_no_volume: false,
            volume_precision: 0,
            data_status: "pulsed".to_string(),
            expired: false,
            expiration_date: 0,
            sector: String::new(),
            industry: String::new(),
            currency_code: String::new(),
        }
    }
}

/// Search result entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultSymbol {
    pub symbol: String,
    pub full_name: String,
    pub description: String,
    pub exchange: String,
    pub ticker: String,
    #[serde(rename = "type")]
    pub symbol_type: String,
}

impl From<&SymbolInfo> for SearchResultSymbol {
    fn from(info: &SymbolInfo) -> Self {
        SearchResultSymbol {
            symbol: info.ticker.clone(),
            full_name: info.description.clone(),
            description: info.description.clone(),
            exchange: info.exchange.clone(),
            ticker: info.ticker.clone(),
            symbol_type: info.symbol_type.clone(),
        }
    }
}

struct Entry {
    config: SymbolConfig,
    info: SymbolInfo,
}

/// Immutable set of configured symbols
pub struct SymbolTable {
    entries: Vec<Entry>,
}

impl SymbolTable {
    pub fn new(symbols: &[SymbolConfig], resolutions: &[String]) -> Self {
        let entries = symbols
            .iter()
            .map(|config| Entry {
                config: config.clone(),
                info: SymbolInfo::from_config(config, resolutions),
            })
            .collect();
        SymbolTable { entries }
    }

    /// Case-insensitive ticker lookup
    pub fn get(&self, ticker: &str) -> Option<&SymbolConfig> {
        self.entries
            .iter()
            .find(|e| e.config.ticker.eq_ignore_ascii_case(ticker))
            .map(|e| &e.config)
    }

    pub fn configs(&self) -> impl Iterator<Item = &SymbolConfig> {
        self.entries.iter().map(|e| &e.config)
    }

    /// Resolve "TICKER" or "EXCHANGE:TICKER"
    pub fn find(&self, query: &str) -> Option<&SymbolInfo> {
        let (exchange, ticker) = match query.split_once(':') {
            Some((exchange, ticker)) if !ticker.trim().is_empty() => (Some(exchange), ticker),
            _ => (None, query),
        };

        self.entries.iter().map(|e| &e.info).find(|info| {
            info.ticker.eq_ignore_ascii_case(ticker)
                && exchange.map_or(true, |ex| info.exchange.eq_ignore_ascii_case(ex))
        })
    }

    /// Case-insensitive substring match on name or ticker
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<SearchResultSymbol> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .map(|e| &e.info)
            .filter(|info| {
                info.name.to_lowercase().contains(&query)
                    || info.ticker.to_lowercase().contains(&query)
            })
            .take(limit.unwrap_or(usize::MAX))
            .map(SearchResultSymbol::from)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
