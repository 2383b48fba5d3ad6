//! Transaction domain model

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::postcode::{extract_postcode, PostcodeLookup};
use super::result::{Error, Result};

/// Columns every transaction export must carry
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "id",
    "created",
    "amount",
    "local_amount",
    "category",
    "description",
    "address",
];

/// Columns appended by the preprocessor, in output order
pub const DERIVED_COLUMNS: [&str; 4] = ["cumsum", "uk_postcode", "lat", "long"];

/// A single transaction row of an export, plus derived enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub created: NaiveDateTime,
    pub amount: f64,
    pub local_amount: f64,
    pub category: String,
    pub description: Option<String>,
    pub address: Option<String>,

    // =========================================================================
    // Derived
    // =========================================================================
    /// Running total of `amount` in file order
    pub cumsum: f64,
    /// First UK postcode found in `address`
    pub uk_postcode: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,

    /// Cells of columns this crate does not interpret, keyed by header
    pub extra: HashMap<String, String>,
}

impl Transaction {
    /// Create a new transaction with required fields
    pub fn new(created: NaiveDateTime, amount: f64, category: impl Into<String>) -> Self {
        Self {
            created,
            amount,
            local_amount: amount,
            category: category.into(),
            description: None,
            address: None,
            cumsum: 0.0,
            uk_postcode: None,
            lat: None,
            long: None,
            extra: HashMap::new(),
        }
    }

    /// Render a cell of the enriched table for the given column
    pub fn cell(&self, column: &str) -> String {
        match column {
            "created" => format_timestamp(&self.created),
            "amount" => self.amount.to_string(),
            "local_amount" => self.local_amount.to_string(),
            "category" => self.category.clone(),
            "description" => self.description.clone().unwrap_or_default(),
            "address" => self.address.clone().unwrap_or_default(),
            "cumsum" => self.cumsum.to_string(),
            "uk_postcode" => self.uk_postcode.clone().unwrap_or_default(),
            "lat" => self.lat.map(|v| v.to_string()).unwrap_or_default(),
            "long" => self.long.map(|v| v.to_string()).unwrap_or_default(),
            other => self.extra.get(other).cloned().unwrap_or_default(),
        }
    }
}

/// An export loaded into memory, keyed by `created`
#[derive(Debug, Clone, Default)]
pub struct TransactionTable {
    /// Input headers minus `id` and `created`, in input order
    pub columns: Vec<String>,
    pub rows: Vec<Transaction>,
}

impl TransactionTable {
    pub fn new(columns: Vec<String>, rows: Vec<Transaction>) -> Self {
        Self { columns, rows }
    }

    /// Output header: the key column, the input columns, then the derived ones
    pub fn output_columns(&self) -> Vec<String> {
        let mut header = vec!["created".to_string()];
        header.extend(
            self.columns
                .iter()
                .filter(|c| !DERIVED_COLUMNS.contains(&c.as_str()))
                .cloned(),
        );
        header.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));
        header
    }

    /// Prefix sum of `amount` over the current row order
    pub fn compute_cumsum(&mut self) {
        let mut total = 0.0;
        for row in &mut self.rows {
            total += row.amount;
            row.cumsum = total;
        }
    }

    /// Fill absent descriptions with the row's category
    pub fn fill_descriptions(&mut self) {
        for row in &mut self.rows {
            if row.description.is_none() {
                row.description = Some(row.category.clone());
            }
        }
    }

    /// Set `uk_postcode` from each row's address
    pub fn extract_postcodes(&mut self) {
        for row in &mut self.rows {
            row.uk_postcode = row.address.as_deref().and_then(extract_postcode);
        }
    }

    /// Distinct non-absent postcodes, in order of first appearance
    pub fn distinct_postcodes(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter_map(|r| r.uk_postcode.as_ref())
            .filter(|p| seen.insert(p.as_str()))
            .cloned()
            .collect()
    }

    /// Substitute each row's postcode through the lookup to fill `lat`/`long`
    pub fn project_coordinates(&mut self, lookup: &PostcodeLookup) {
        for row in &mut self.rows {
            let coords = row
                .uk_postcode
                .as_deref()
                .and_then(|p| lookup.coordinates(p));
            row.lat = coords.map(|(lat, _)| lat);
            row.long = coords.map(|(_, long)| long);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Strip thousands separators and parse to floating point
pub fn clean_amount(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    cleaned.trim().parse::<f64>().ok()
}

/// Parse a `created` timestamp.
///
/// RFC 3339 values are normalised to UTC; naive date-times and plain dates
/// (midnight) are taken as-is.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).naive_utc());
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }

    Err(Error::InvalidTimestamp(raw.to_string()))
}

/// Format a timestamp the way the enriched table stores it
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}
