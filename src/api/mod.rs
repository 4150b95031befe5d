//! TradingView UDF datafeed over HTTP
pub mod error;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::app::AppContext;
use crate::data::SyncReport;
use crate::history::{query_history, History};
use crate::symbols::{SearchResultSymbol, SymbolInfo};
use crate::types::ChartConfig;

pub use error::ApiError;

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ── Query params ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    symbol: String,
    resolution: String,
    from: i64,
    to: i64,
}

// ── Route definitions ───────────────────────────────────────────────────────

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/config", get(chart_config))
        .route("/symbols", get(symbols))
        .route("/search", get(search))
        .route("/history", get(history))
        .route("/symbol_info", get(symbol_info))
        .route("/sync/:ticker", post(sync_symbol))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

// ── Handlers ────────────────────────────────────────────────────────────────

async fn chart_config(State(ctx): State<Arc<AppContext>>) -> Json<ChartConfig> {
    let mut config = ctx.config.chart.clone();
    config.supported_resolutions = ctx.resolutions.labels();
    Json(config)
}

async fn symbols(
    State(ctx): State<Arc<AppContext>>,
    Query(q): Query<SymbolQuery>,
) -> ApiResult<SymbolInfo> {
    let symbol = q
        .symbol
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("symbol is required".to_string()))?;

    ctx.symbols
        .find(&symbol)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown symbol {}", symbol)))
}

async fn search(
    State(ctx): State<Arc<AppContext>>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Vec<SearchResultSymbol>> {
    let results = ctx.symbols.search(&q.query, q.limit);
    if results.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no symbols match {:?}",
            q.query
        )));
    }
    Ok(Json(results))
}

async fn history(
    State(ctx): State<Arc<AppContext>>,
    Query(q): Query<HistoryQuery>,
) -> Json<History> {
    debug!(
        "History {} {} [{}, {}]",
        q.symbol, q.resolution, q.from, q.to
    );
    Json(
        query_history(
            &ctx.symbols,
            &ctx.resolutions,
            &ctx.cache,
            &q.symbol,
            &q.resolution,
            q.from,
            q.to,
        )
        .await,
    )
}

async fn symbol_info() -> ApiError {
    ApiError::NotImplemented
}

async fn sync_symbol(
    State(ctx): State<Arc<AppContext>>,
    Path(ticker): Path<String>,
) -> ApiResult<SyncReport> {
    info!("On-demand sync requested for {}", ticker);
    let report = ctx.reconciler.sync_symbol(&ticker).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::dex::TradeSource;
    use crate::error::Result;
    use crate::history::HistoryStatus;
    use crate::types::Trade;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    /// Serves a fixed set of trades, honouring `since`
    struct StaticSource(Vec<Trade>);

    #[async_trait]
    impl TradeSource for StaticSource {
        async fn fetch_trades(
            &self,
            _token: &str,
            _base: &str,
            since: DateTime<Utc>,
        ) -> Result<Vec<Trade>> {
            Ok(self.0.iter().filter(|t| t.time >= since).cloned().collect())
        }
    }

    fn context(dir: &std::path::Path, trades: Vec<Trade>) -> Arc<AppContext> {
        let toml = format!(
            r#"
data_dir = "{}"

[halodex]
base_url = "http://localhost:1"

[chart]
supported_resolutions = ["30", "60", "bogus"]
"#,
            dir.display()
        );
        AppContext::new(parse_config(&toml).unwrap(), Arc::new(StaticSource(trades)))
    }

    fn symbol_query(symbol: Option<&str>) -> Query<SymbolQuery> {
        Query(SymbolQuery {
            symbol: symbol.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_config_lists_usable_resolutions() {
        let dir = tempfile::tempdir().unwrap();
        let Json(config) = chart_config(State(context(dir.path(), Vec::new()))).await;

        assert_eq!(config.supported_resolutions, vec!["30", "60"]);
        assert!(config.supports_search);
    }

    #[tokio::test]
    async fn test_symbol_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Vec::new());

        let Json(info) = symbols(State(Arc::clone(&ctx)), symbol_query(Some("HaloDEX:VET")))
            .await
            .unwrap();
        assert_eq!(info.ticker, "VET");
        assert_eq!(info.supported_resolutions, vec!["30", "60"]);

        let missing = symbols(State(Arc::clone(&ctx)), symbol_query(None))
            .await
            .unwrap_err();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let unknown = symbols(State(ctx), symbol_query(Some("BTC")))
            .await
            .unwrap_err();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Vec::new());

        let Json(found) = search(
            State(Arc::clone(&ctx)),
            Query(SearchQuery {
                query: "vtho".to_string(),
                limit: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);

        let err = search(
            State(ctx),
            Query(SearchQuery {
                query: "doge".to_string(),
                limit: Some(5),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sync_then_history() {
        let dir = tempfile::tempdir().unwrap();
        let t0 = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();
        let trades = vec![
            Trade::new(t0 + Duration::minutes(70), 4.0, 1.0),
            Trade::new(t0 + Duration::minutes(40), 3.0, 1.0),
            Trade::new(t0 + Duration::minutes(10), 2.0, 1.0),
            Trade::new(t0, 1.0, 1.0),
        ];
        let ctx = context(dir.path(), trades);

        let before = history(
            State(Arc::clone(&ctx)),
            Query(HistoryQuery {
                symbol: "HALO".to_string(),
                resolution: "30".to_string(),
                from: t0.timestamp(),
                to: t0.timestamp() + 7200,
            }),
        )
        .await;
        assert_eq!(before.0.status, HistoryStatus::NoData);

        let Json(report) = sync_symbol(State(Arc::clone(&ctx)), Path("halo".to_string()))
            .await
            .unwrap();
        assert_eq!(report.new_trades, 4);

        let Json(after) = history(
            State(Arc::clone(&ctx)),
            Query(HistoryQuery {
                symbol: "HALO".to_string(),
                resolution: "30".to_string(),
                from: t0.timestamp(),
                to: t0.timestamp() + 7200,
            }),
        )
        .await;
        assert_eq!(after.status, HistoryStatus::Ok);
        assert_eq!(after.time, vec![t0.timestamp(), t0.timestamp() + 1800]);
        assert_eq!(after.open, vec![1.0, 3.0]);
        assert_eq!(after.close, vec![2.0, 3.0]);

        let unknown = sync_symbol(State(ctx), Path("BTC".to_string()))
            .await
            .unwrap_err();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_symbol_info_not_implemented() {
        assert_eq!(symbol_info().await.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
