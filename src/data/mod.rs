pub mod bar_aggregator;
pub mod bar_cache;
pub mod historical_sync;
pub mod resolution;
pub mod split;
pub mod store;

pub use bar_aggregator::BarAggregator;
pub use bar_cache::{ResolutionCache, RetentionPolicy};
pub use historical_sync::{SyncReconciler, SyncReport};
pub use resolution::{Resolution, ResolutionTable};
pub use split::SplitAdjuster;
pub use store::FileStore;
