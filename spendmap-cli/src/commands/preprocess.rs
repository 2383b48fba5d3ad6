//! Preprocess command - enrich an export and write the dashboard table

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;
use spendmap_core::config::expand_tilde;

use super::get_context;
use crate::output;

const UNRESOLVED_SHOWN: usize = 20;

pub fn run(file: &Path, json: bool) -> Result<()> {
    let input = expand_tilde(file);
    if !input.exists() {
        bail!("File not found: {}", input.display());
    }

    let ctx = get_context()?;
    let service = ctx.preprocess_service()?;

    if !json {
        output::info(&format!("Processing {}...", input.display()));
    }

    let report = service.run(&input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", "Preprocess Summary".bold());

    let table = output::summary_table(&[
        ("Transactions", report.rows.to_string()),
        ("Distinct postcodes", report.distinct_postcodes.to_string()),
        ("Lookup requests", report.batches.to_string()),
        ("Resolved postcodes", report.resolved.to_string()),
        ("Rows with coordinates", report.located_rows.to_string()),
    ]);
    println!("{}", table);

    output::warning_list("Postcodes not found", &report.unresolved, UNRESOLVED_SHOWN);

    output::success(&format!("Wrote {}", report.output_path));
    Ok(())
}
