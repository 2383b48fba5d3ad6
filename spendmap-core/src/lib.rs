//! spendmap core - transaction enrichment and dashboard logic
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: transactions, postcodes, the spend table
//! - **ports**: trait definitions for external dependencies (PostcodeGeocoder)
//! - **services**: the preprocess pipeline and the dashboard callbacks
//! - **adapters**: concrete implementations (postcodes.io, CSV files)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::postcodes_io::PostcodesIoClient;
use config::Config;
use services::{DashboardService, PreprocessService};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{SpendRow, SpendTable, Transaction, TransactionTable};

/// Main context for spendmap operations
///
/// Holds the resolved configuration and builds the services for each stage.
pub struct SpendmapContext {
    pub config: Config,
}

impl SpendmapContext {
    /// Create a context from the settings directory
    pub fn new(settings_dir: &Path) -> Result<Self> {
        let config = Config::load(settings_dir)?;
        Ok(Self { config })
    }

    /// Preprocess service backed by postcodes.io
    pub fn preprocess_service(&self) -> Result<PreprocessService> {
        let geocoder = PostcodesIoClient::new_with_base_url(&self.config.geocoder_base_url)
            .context("Failed to create postcodes.io client")?;
        Ok(PreprocessService::new(
            Arc::new(geocoder),
            self.config.output_path.clone(),
            self.config.batch_size,
        ))
    }

    /// Dashboard service over the enriched table (defaults to the configured output)
    pub fn dashboard_service(&self, input: Option<PathBuf>) -> Result<DashboardService> {
        let path = input.unwrap_or_else(|| self.config.output_path.clone());
        DashboardService::load(&path, &self.config.internal_transfer_category)
    }
}
