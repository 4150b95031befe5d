//! Trade sources
pub mod halodex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::Trade;

pub use halodex::HaloDexClient;

/// Anything that can report the trades of a token pair.
///
/// Implementations return trades newest first, all at or after `since`.
#[async_trait]
pub trait TradeSource: Send + Sync {
    async fn fetch_trades(
        &self,
        token_address: &str,
        base_token_address: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Trade>>;
}
