//! Application configuration loading from config.toml
//!
//! Every field has a default, so a missing file or a partial file still
//! yields a usable configuration. The file location can be overridden with
//! `FAMILY_FINANCE_CONFIG`.

use crate::{
    core::period::{FilterSelection, QuickRange, Window},
    errors::{Error, Result},
    store::LedgerSettings,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "FAMILY_FINANCE_CONFIG";

/// Config file read when `FAMILY_FINANCE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Snapshot file read at startup
    pub snapshot_path: PathBuf,
    /// Strict mode used when the ledger has no `Mode_Strict_Allocations` parameter
    pub strict_allocations_default: bool,
    /// User name recorded in the audit trail
    pub operator: String,
    /// Currency label appended to amounts
    pub currency: String,
    /// Preset range such as `this-quarter`; wins over `filter`
    pub quick_range: Option<String>,
    /// Default period filter for the dashboard
    pub filter: FilterSelection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("data/family_finance.json"),
            strict_allocations_default: true,
            operator: "system".to_string(),
            currency: "FCFA".to_string(),
            quick_range: None,
            filter: FilterSelection::default(),
        }
    }
}

impl AppConfig {
    /// Settings handed to a new ledger.
    #[must_use]
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            strict_default: self.strict_allocations_default,
            operator: self.operator.clone(),
        }
    }

    /// Resolves the configured period, `None` when nothing is set.
    ///
    /// # Arguments
    /// * `today` - Reference date for `quick_range`
    ///
    /// # Errors
    /// Returns `Error::Validation` for an unknown preset or a malformed filter
    pub fn window(&self, today: NaiveDate) -> Result<Option<Window>> {
        match self.quick_range.as_deref().map(str::trim) {
            Some(preset) if !preset.is_empty() => {
                let range: QuickRange = preset.parse()?;
                range.window(today).map(Some)
            }
            _ => self.filter.window(),
        }
    }
}

/// Loads the application configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the configuration named by `FAMILY_FINANCE_CONFIG`, or ./config.toml.
///
/// A missing file is not an error: defaults are used instead.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        info!("No configuration file at {path}, using defaults");
        return Ok(AppConfig::default());
    }
    let config = load_config(&path)?;
    info!("Loaded configuration from {path}");
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            snapshot_path = "famille.json"
            strict_allocations_default = false
            operator = "Marie"
            currency = "EUR"

            [filter]
            month = "2025-03"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.snapshot_path, PathBuf::from("famille.json"));
        assert!(!config.strict_allocations_default);
        assert_eq!(config.operator, "Marie");
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.filter.month.as_deref(), Some("2025-03"));

        let settings = config.ledger_settings();
        assert!(!settings.strict_default);
        assert_eq!(settings.operator, "Marie");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str(r#"currency = "XOF""#).unwrap();
        assert_eq!(config.currency, "XOF");
        assert!(config.strict_allocations_default);
        assert_eq!(config.operator, "system");
        assert_eq!(config.filter, FilterSelection::default());
    }

    #[test]
    fn test_window_prefers_quick_range() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 14).unwrap();
        let config: AppConfig = toml::from_str(
            r#"
            quick_range = "last-quarter"
            [filter]
            year = "2023"
        "#,
        )
        .unwrap();
        let window = config.window(today).unwrap().unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        let unfiltered = AppConfig::default();
        assert!(unfiltered.window(today).unwrap().is_none());
    }

    #[test]
    fn test_unknown_quick_range() {
        let config = AppConfig {
            quick_range: Some("next-decade".into()),
            ..AppConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 2, 14).unwrap();
        assert!(matches!(
            config.window(today),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "operator = \"Paul\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.operator, "Paul");
    }

    #[test]
    fn test_load_config_errors() {
        assert!(matches!(
            load_config("/nonexistent/config.toml"),
            Err(Error::Config { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "operator = ").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(Error::Config { .. })
        ));
    }
}
