pub mod json_file;
pub mod logging;
pub mod time;

pub use json_file::{read_json, write_json};
pub use logging::init_logging;
pub use time::*;
