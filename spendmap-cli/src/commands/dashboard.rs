//! Dashboard command - serve the spending dashboard

use std::path::PathBuf;

use anyhow::{Context, Result};
use spendmap_core::config::{expand_tilde, Config};

use super::get_context;
use crate::{output, server};

pub fn run(input: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let ctx = get_context()?;
    let service = ctx.dashboard_service(input.as_deref().map(expand_tilde))?;
    let port = port.unwrap_or(ctx.config.dashboard_port);

    if Config::map_token().is_none() {
        output::warning("MAPBOXAPI is not set; the map will not render");
    }
    output::info(&format!("Dashboard running at http://127.0.0.1:{port}"));

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(server::serve(service, port))
}
