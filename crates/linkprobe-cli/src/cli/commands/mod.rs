//! CLI command handlers, one per file.

mod config_path;
mod fetch;
mod run;

pub use config_path::run_config_path;
pub use fetch::{fetch_request, run_fetch};
pub use run::run_service;
