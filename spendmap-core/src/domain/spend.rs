//! Spend table served by the dashboard

use chrono::NaiveDateTime;
use serde::Serialize;

/// One row of the enriched table, reduced to what the dashboard reads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendRow {
    pub created: NaiveDateTime,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

impl SpendRow {
    pub fn new(
        created: NaiveDateTime,
        amount: f64,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            created,
            amount,
            category: category.into(),
            description: description.into(),
            lat: None,
            long: None,
        }
    }

    pub fn with_location(mut self, lat: f64, long: f64) -> Self {
        self.lat = Some(lat);
        self.long = Some(long);
        self
    }
}

/// Immutable dashboard data: the enriched table minus internal transfers.
///
/// Row order is table order; it is never re-sorted.
#[derive(Debug, Clone, Default)]
pub struct SpendTable {
    rows: Vec<SpendRow>,
}

impl SpendTable {
    /// Build the table, dropping every row whose category is `internal_category`
    pub fn new(rows: Vec<SpendRow>, internal_category: &str) -> Self {
        let rows = rows
            .into_iter()
            .filter(|r| r.category != internal_category)
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[SpendRow] {
        &self.rows
    }

    /// Earliest and latest `created` present
    pub fn date_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let min = self.rows.iter().map(|r| r.created).min()?;
        let max = self.rows.iter().map(|r| r.created).max()?;
        Some((min, max))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
