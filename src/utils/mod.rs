pub mod config;
pub mod logger;
pub mod potluck_toml;
pub mod tempfiles;

pub use config::*;
pub use logger::setup_logging;
pub use potluck_toml::{apply_file_to_opts, load_potluck_toml, period_from_secs};
pub use tempfiles::{CopyOutcome, copy_verified, is_transfer_temp_name};
