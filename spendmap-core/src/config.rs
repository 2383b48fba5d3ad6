//! Configuration management
//!
//! Optional `settings.json` in the settings directory:
//! ```json
//! {
//!   "outputPath": "monzo_processed.csv",
//!   "internalTransferCategory": "monzo",
//!   "geocoder": { "baseUrl": "https://api.postcodes.io", "batchSize": 100 },
//!   "dashboard": { "port": 8050 }
//! }
//! ```
//! Environment variables override the file (see `Config::load`). Unknown
//! keys are ignored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::postcodes_io::{
    MAX_BULK_LOOKUP, POSTCODES_IO_BASE_URL_ENV, POSTCODES_IO_PRODUCTION_URL,
};

/// Environment variable holding the map tile access token
pub const MAP_TOKEN_ENV: &str = "MAPBOXAPI";

/// Environment variable overriding the dashboard port
pub const PORT_ENV: &str = "SPENDMAP_PORT";

/// Environment variable overriding the settings directory
pub const SETTINGS_DIR_ENV: &str = "SPENDMAP_DIR";

const DEFAULT_OUTPUT: &str = "monzo_processed.csv";
const DEFAULT_INTERNAL_CATEGORY: &str = "monzo";
const DEFAULT_PORT: u16 = 8050;

/// Raw settings.json structure
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    output_path: Option<PathBuf>,
    #[serde(default)]
    internal_transfer_category: Option<String>,
    #[serde(default)]
    geocoder: GeocoderSettings,
    #[serde(default)]
    dashboard: DashboardSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeocoderSettings {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardSettings {
    #[serde(default)]
    port: Option<u16>,
}

/// spendmap configuration (resolved view of settings + environment)
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the preprocessor writes and the dashboard reads the enriched table
    pub output_path: PathBuf,
    /// Category marking internal transfers, hidden from the dashboard
    pub internal_transfer_category: String,
    pub geocoder_base_url: String,
    /// Postcodes per lookup request, within 1..=100
    pub batch_size: usize,
    pub dashboard_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            internal_transfer_category: DEFAULT_INTERNAL_CATEGORY.to_string(),
            geocoder_base_url: POSTCODES_IO_PRODUCTION_URL.to_string(),
            batch_size: MAX_BULK_LOOKUP,
            dashboard_port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Load config from the settings directory
    ///
    /// Overrides, in order of precedence:
    /// 1. `POSTCODES_IO_BASE_URL`, `SPENDMAP_PORT`
    /// 2. settings.json
    /// 3. built-in defaults
    pub fn load(settings_dir: &Path) -> Result<Self> {
        let settings_path = settings_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let defaults = Config::default();

        let geocoder_base_url = std::env::var(POSTCODES_IO_BASE_URL_ENV)
            .ok()
            .or_else(|| raw.geocoder.base_url.clone())
            .unwrap_or(defaults.geocoder_base_url);

        let dashboard_port = match std::env::var(PORT_ENV).ok() {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("{PORT_ENV} must be a port number, got {port:?}"))?,
            None => raw.dashboard.port.unwrap_or(defaults.dashboard_port),
        };

        Ok(Self {
            output_path: raw.output_path.unwrap_or(defaults.output_path),
            internal_transfer_category: raw
                .internal_transfer_category
                .unwrap_or(defaults.internal_transfer_category),
            geocoder_base_url,
            batch_size: raw
                .geocoder
                .batch_size
                .unwrap_or(defaults.batch_size)
                .clamp(1, MAX_BULK_LOOKUP),
            dashboard_port,
        })
    }

    /// The map access token, read at render time
    pub fn map_token() -> Option<String> {
        std::env::var(MAP_TOKEN_ENV).ok().filter(|t| !t.is_empty())
    }
}

/// Get the settings directory from environment or default
pub fn get_settings_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(SETTINGS_DIR_ENV) {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".spendmap")
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.output_path, PathBuf::from("monzo_processed.csv"));
        assert_eq!(config.internal_transfer_category, "monzo");
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_settings_file_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{
                "outputPath": "out/enriched.csv",
                "internalTransferCategory": "transfers",
                "geocoder": { "batchSize": 500 },
                "theme": "dark"
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.output_path, PathBuf::from("out/enriched.csv"));
        assert_eq!(config.internal_transfer_category, "transfers");
        // Clamped to the API limit
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_invalid_settings_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let plain = Path::new("data/export.csv");
        assert_eq!(expand_tilde(plain), plain.to_path_buf());

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_tilde(Path::new("~/Downloads/monzo.csv")),
                home.join("Downloads/monzo.csv")
            );
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
    }
}
