/// Standalone utility to reconcile trades and bars once, without serving HTTP
/// Usage: cargo run --bin sync_once --release [TICKER...]
///
/// Syncs every configured symbol when no ticker is given.
/// Config path comes from HALOCHART_CONFIG, default config.toml.
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use halochart::{
    config::{config_path, load_config},
    dex::HaloDexClient,
    utils::init_logging,
    AppContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = config_path(None);
    let config = load_config(&path).with_context(|| format!("loading {}", path.display()))?;
    init_logging(&config);

    let source = Arc::new(HaloDexClient::new(&config.halodex)?);
    let ctx = AppContext::new(config, source);

    let tickers: Vec<String> = std::env::args().skip(1).collect();
    let results = if tickers.is_empty() {
        ctx.reconciler.sync_all().await
    } else {
        let mut results = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let result = ctx.reconciler.sync_symbol(&ticker).await;
            results.push((ticker, result));
        }
        results
    };

    let mut failed = 0;
    for (symbol, result) in results {
        match result {
            Ok(report) => println!("{}", serde_json::to_string(&report)?),
            Err(e) => {
                failed += 1;
                error!("[{}] {}: {}", e.error_code(), symbol, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} symbol(s) failed to sync", failed);
    }
    info!("Sync complete");
    Ok(())
}
