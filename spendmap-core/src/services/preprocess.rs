//! Preprocess service - enrich a transaction export with running totals and locations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;

use crate::adapters::csv_table;
use crate::domain::{LookupOutcome, PostcodeLookup, TransactionTable};
use crate::ports::PostcodeGeocoder;

/// Preprocess service: raw export in, enriched table out
pub struct PreprocessService {
    geocoder: Arc<dyn PostcodeGeocoder>,
    output_path: PathBuf,
    batch_size: usize,
}

impl PreprocessService {
    pub fn new(geocoder: Arc<dyn PostcodeGeocoder>, output_path: PathBuf, batch_size: usize) -> Self {
        let batch_size = batch_size.clamp(1, geocoder.max_batch_size().max(1));
        Self {
            geocoder,
            output_path,
            batch_size,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Run the whole pipeline and write the enriched table.
    ///
    /// Nothing is written unless every step succeeds.
    pub fn run(&self, input: &Path) -> Result<PreprocessReport> {
        let mut table = csv_table::read_export(input)
            .with_context(|| format!("Failed to load transaction export {}", input.display()))?;
        info!("Loaded {} transactions from {}", table.len(), input.display());

        let summary = self.enrich(&mut table)?;

        csv_table::write_enriched(&table, &self.output_path)
            .with_context(|| format!("Failed to write {}", self.output_path.display()))?;
        info!("Wrote enriched table to {}", self.output_path.display());

        Ok(PreprocessReport {
            rows: table.len(),
            distinct_postcodes: summary.distinct_postcodes,
            batches: summary.batches,
            resolved: summary.resolved,
            unresolved: summary.unresolved,
            located_rows: table.rows.iter().filter(|r| r.lat.is_some()).count(),
            output_path: self.output_path.display().to_string(),
        })
    }

    /// Apply every in-memory enrichment step to a loaded table
    pub fn enrich(&self, table: &mut TransactionTable) -> Result<GeocodeSummary> {
        table.compute_cumsum();
        table.fill_descriptions();
        table.extract_postcodes();

        let (lookup, summary) = self.geocode(&table.distinct_postcodes())?;
        table.project_coordinates(&lookup);
        Ok(summary)
    }

    /// Resolve postcodes in batches, building the lookup table
    pub fn geocode(&self, postcodes: &[String]) -> Result<(PostcodeLookup, GeocodeSummary)> {
        let mut lookup = PostcodeLookup::new();
        let mut summary = GeocodeSummary {
            distinct_postcodes: postcodes.len(),
            ..Default::default()
        };

        for chunk in postcodes.chunks(self.batch_size) {
            summary.batches += 1;
            debug!(
                "Looking up batch {} ({} postcodes) via {}",
                summary.batches,
                chunk.len(),
                self.geocoder.name()
            );

            let results = self
                .geocoder
                .lookup(chunk)
                .with_context(|| format!("Postcode lookup via {} failed", self.geocoder.name()))?;

            for result in &results {
                match lookup.record(result) {
                    LookupOutcome::Inserted => summary.resolved += 1,
                    LookupOutcome::Duplicate => {}
                    LookupOutcome::Unresolved => {
                        warn!("Postcode not found: {}", result.query);
                        summary.unresolved.push(result.query.clone());
                    }
                }
            }
        }

        Ok((lookup, summary))
    }
}

/// Outcome of the geocoding step
#[derive(Debug, Default, Clone, Serialize)]
pub struct GeocodeSummary {
    pub distinct_postcodes: usize,
    /// Lookup requests issued
    pub batches: usize,
    pub resolved: usize,
    /// Postcodes the service did not recognise
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreprocessReport {
    /// Transactions written
    pub rows: usize,
    pub distinct_postcodes: usize,
    pub batches: usize,
    pub resolved: usize,
    pub unresolved: Vec<String>,
    /// Rows that ended up with coordinates
    pub located_rows: usize,
    pub output_path: String,
}
