//! Snapshot file location.
//!
//! The path from config.toml can be overridden with `FAMILY_FINANCE_SNAPSHOT`,
//! the way a deployment points the app at a different data file without
//! editing its configuration.

use crate::config::app::AppConfig;
use std::path::PathBuf;

/// Environment variable overriding the snapshot path
pub const SNAPSHOT_ENV: &str = "FAMILY_FINANCE_SNAPSHOT";

/// Gets the snapshot path from the environment or the configuration.
#[must_use]
pub fn get_snapshot_path(config: &AppConfig) -> PathBuf {
    std::env::var(SNAPSHOT_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| config.snapshot_path.clone(), PathBuf::from)
}
