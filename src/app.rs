//! Application context shared by the HTTP handlers and the sync scheduler
use std::sync::Arc;

use tracing::info;

use crate::data::{
    BarAggregator, FileStore, ResolutionCache, ResolutionTable, SplitAdjuster, SyncReconciler,
};
use crate::dex::TradeSource;
use crate::symbols::SymbolTable;
use crate::types::Config;

pub struct AppContext {
    pub config: Arc<Config>,
    pub symbols: Arc<SymbolTable>,
    pub resolutions: Arc<ResolutionTable>,
    pub cache: Arc<ResolutionCache>,
    pub reconciler: Arc<SyncReconciler>,
}

impl AppContext {
    pub fn new(config: Config, source: Arc<dyn TradeSource>) -> Arc<Self> {
        let resolutions = Arc::new(ResolutionTable::from_labels(
            &config.chart.supported_resolutions,
        ));
        let symbols = Arc::new(SymbolTable::new(&config.symbols, &resolutions.labels()));

        let store = FileStore::new(&config.data_dir);
        let cache = Arc::new(ResolutionCache::new(store.clone()));

        let split = SplitAdjuster::from_config(&config);
        if let Some(split) = &split {
            info!("Split adjustment enabled: {:?}", split);
        }

        let reconciler = Arc::new(SyncReconciler::new(
            source,
            store,
            Arc::clone(&cache),
            Arc::clone(&resolutions),
            Arc::clone(&symbols),
            BarAggregator::from_config(&config),
            split,
        ));

        info!(
            "Context ready: {} symbols, {} resolutions, data dir {}",
            symbols.len(),
            resolutions.len(),
            config.data_dir.display()
        );

        Arc::new(AppContext {
            config: Arc::new(config),
            symbols,
            resolutions,
            cache,
            reconciler,
        })
    }
}
