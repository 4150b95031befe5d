//! Configuration loading from TOML file
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::data::resolution::DEFAULT_RESOLUTIONS;
use crate::error::{ChartError, Result};
use crate::types::Config;

pub const CONFIG_ENV: &str = "HALOCHART_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Explicit path, else `HALOCHART_CONFIG`, else `config.toml`
pub fn config_path(explicit: Option<String>) -> PathBuf {
    explicit
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
        .into()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ChartError::ConfigError(format!("Failed to read config file: {}", e)))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(content)
        .map_err(|e| ChartError::ConfigError(format!("Failed to parse config: {}", e)))?;

    if config.chart.supported_resolutions.is_empty() {
        config.chart.supported_resolutions =
            DEFAULT_RESOLUTIONS.iter().map(|r| r.to_string()).collect();
    }

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    if config.sync_interval_mins == 0 {
        return Err(ChartError::ConfigError(
            "sync_interval_mins must be > 0".to_string(),
        ));
    }

    if config.split_amount < 0.0 || !config.split_amount.is_finite() {
        return Err(ChartError::ConfigError(format!(
            "Invalid split_amount: {}",
            config.split_amount
        )));
    }

    if config.split_amount > 0.0
        && !config.split_ticker.is_empty()
        && config.pre_split_time.is_none()
    {
        return Err(ChartError::ConfigError(
            "pre_split_time is required when a split is configured".to_string(),
        ));
    }

    if config.halodex.base_url.trim().is_empty() {
        return Err(ChartError::ConfigError(
            "halodex.base_url is empty".to_string(),
        ));
    }

    if config.symbols.is_empty() {
        return Err(ChartError::ConfigError("No symbols configured".to_string()));
    }

    let mut seen = HashSet::new();
    for symbol in &config.symbols {
        if symbol.ticker.trim().is_empty() {
            return Err(ChartError::ConfigError(format!(
                "Symbol '{}' has an empty ticker",
                symbol.name
            )));
        }
        if !seen.insert(symbol.key()) {
            return Err(ChartError::ConfigError(format!(
                "Duplicate ticker: {}",
                symbol.ticker
            )));
        }
        symbol.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            ChartError::ConfigError(format!(
                "Invalid timezone for {}: {}",
                symbol.ticker, symbol.timezone
            ))
        })?;
    }

    Ok(())
}
