//! Centralized error types for the chart data feed
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    // Network Errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Trade source error: {0}")]
    TradeSourceError(String),

    // Data Errors
    #[error("Invalid bar data: {0}")]
    InvalidBarData(String),

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("Deserialization failed: {0}")]
    DeserializationError(#[from] serde_json::Error),

    // Lookup Errors
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Bars not found: {0}")]
    BarsNotFound(String),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // File I/O Errors
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File write failed: {0}")]
    FileWriteFailed(String),

    // Sync Errors
    #[error("Sync incomplete for {symbol}: {failed} resolution(s) failed")]
    SyncIncomplete { symbol: String, failed: usize },
}

pub type Result<T> = std::result::Result<T, ChartError>;

impl ChartError {
    /// Transient failures that the next scheduled sync is expected to resolve
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChartError::HttpError(_)
                | ChartError::TradeSourceError(_)
                | ChartError::FileError(_)
                | ChartError::FileWriteFailed(_)
                | ChartError::SyncIncomplete { .. }
        )
    }

    /// Lookups that should surface as "no data" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ChartError::SymbolNotFound(_)
                | ChartError::BarsNotFound(_)
                | ChartError::FileNotFound(_)
        )
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &str {
        match self {
            ChartError::HttpError(_) => "NET_001",
            ChartError::TradeSourceError(_) => "NET_002",
            ChartError::InvalidBarData(_) => "DATA_001",
            ChartError::InvalidResolution(_) => "DATA_002",
            ChartError::DeserializationError(_) => "DATA_003",
            ChartError::SymbolNotFound(_) => "LOOKUP_001",
            ChartError::BarsNotFound(_) => "LOOKUP_002",
            ChartError::ConfigError(_) => "CFG_001",
            ChartError::FileError(_) => "FILE_001",
            ChartError::FileNotFound(_) => "FILE_002",
            ChartError::FileWriteFailed(_) => "FILE_003",
            ChartError::SyncIncomplete { .. } => "SYNC_001",
        }
    }
}
