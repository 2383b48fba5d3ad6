//! CLI command implementations

pub mod dashboard;
pub mod preprocess;

use anyhow::{Context, Result};
use spendmap_core::config::get_settings_dir;
use spendmap_core::SpendmapContext;

/// Load the context from the settings directory
pub fn get_context() -> Result<SpendmapContext> {
    let settings_dir = get_settings_dir();
    SpendmapContext::new(&settings_dir)
        .with_context(|| format!("Failed to load settings from {}", settings_dir.display()))
}
