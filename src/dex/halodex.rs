//! HaloDEX REST client
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::dex::TradeSource;
use crate::error::{ChartError, Result};
use crate::types::{HaloDexConfig, Trade};

#[derive(Debug, Deserialize)]
struct TradesResponse {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<Vec<Trade>>,
}

pub struct HaloDexClient {
    client: Client,
    base_url: String,
}

impl HaloDexClient {
    pub fn new(config: &HaloDexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(HaloDexClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TradeSource for HaloDexClient {
    async fn fetch_trades(
        &self,
        token_address: &str,
        base_token_address: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Trade>> {
        let since_param = since.to_rfc3339_opts(SecondsFormat::Nanos, true);
        debug!(
            "Fetching trades: {}/{} since {}",
            token_address, base_token_address, since_param
        );

        let response = self
            .client
            .get(format!("{}/trades", self.base_url))
            .header("Accept", "application/json")
            .query(&[
                ("token", token_address),
                ("baseToken", base_token_address),
                ("since", since_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ChartError::TradeSourceError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let trades_response: TradesResponse = serde_json::from_str(&body)
            .map_err(|e| ChartError::TradeSourceError(format!("Parse error: {}", e)))?;

        if !trades_response.status {
            return Err(ChartError::TradeSourceError(format!(
                "Trade fetch failed: {}",
                trades_response.message
            )));
        }

        Ok(normalize_trades(
            trades_response.data.unwrap_or_default(),
            since,
        ))
    }
}

/// Drop anything before `since` and order newest first
fn normalize_trades(mut trades: Vec<Trade>, since: DateTime<Utc>) -> Vec<Trade> {
    let before = trades.len();
    trades.retain(|t| t.time >= since);
    if trades.len() < before {
        warn!(
            "Discarded {} trades older than {}",
            before - trades.len(),
            since
        );
    }

    trades.sort_by(|a, b| b.time.cmp(&a.time));
    trades
}
