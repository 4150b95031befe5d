pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod dex;
pub mod error;
pub mod history;
pub mod scheduler;
pub mod symbols;
pub mod types;
pub mod utils;

pub use app::AppContext;
pub use error::{ChartError, Result};
pub use types::*;
