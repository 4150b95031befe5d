//! Durable per-symbol storage
//!
//! Layout under the data directory:
//!   {ticker}/trades.json    trade history, newest first
//!   {ticker}/{label}.json   bars for one resolution, oldest first
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::data::resolution::Resolution;
use crate::error::Result;
use crate::types::{Bar, BarRecord, Trade};
use crate::utils::{read_json, write_json};

const TRADES_FILE: &str = "trades.json";

#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        FileStore {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn symbol_dir(&self, ticker: &str) -> PathBuf {
        self.data_dir.join(ticker.to_lowercase())
    }

    pub fn trades_path(&self, ticker: &str) -> PathBuf {
        self.symbol_dir(ticker).join(TRADES_FILE)
    }

    pub fn bars_path(&self, ticker: &str, label: &str) -> PathBuf {
        self.symbol_dir(ticker).join(format!("{}.json", label))
    }

    /// Idempotent
    pub async fn ensure_symbol_dir(&self, ticker: &str) -> Result<()> {
        tokio::fs::create_dir_all(self.symbol_dir(ticker)).await?;
        Ok(())
    }

    /// Fails with `ChartError::FileNotFound` when the symbol has no history yet
    pub async fn load_trades(&self, ticker: &str) -> Result<Vec<Trade>> {
        read_json(&self.trades_path(ticker)).await
    }

    pub async fn save_trades(&self, ticker: &str, trades: &[Trade]) -> Result<()> {
        let path = self.trades_path(ticker);
        write_json(&path, trades).await?;
        debug!("Saved {} trades to {}", trades.len(), path.display());
        Ok(())
    }

    pub async fn load_bars(&self, ticker: &str, resolution: &Resolution) -> Result<Vec<Bar>> {
        let records: Vec<BarRecord> =
            read_json(&self.bars_path(ticker, resolution.label())).await?;
        records
            .into_iter()
            .map(|record| record.into_bar(resolution.bucket()))
            .collect()
    }

    pub async fn save_bars(
        &self,
        ticker: &str,
        resolution: &Resolution,
        bars: &[Bar],
    ) -> Result<()> {
        let path = self.bars_path(ticker, resolution.label());
        let records: Vec<BarRecord> = bars.iter().map(Bar::to_record).collect();
        write_json(&path, &records).await?;
        debug!("Saved {} bars to {}", records.len(), path.display());
        Ok(())
    }
}
