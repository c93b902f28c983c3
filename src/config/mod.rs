/// Application settings loading from config.toml
pub mod app;

/// Snapshot file location
pub mod storage;

pub use app::{AppConfig, load_app_configuration, load_config};
pub use storage::get_snapshot_path;
