//! Dashboard service - reactive callbacks over the spend table
//!
//! Every method is a pure function of the current control values. The table
//! is loaded once and shared read-only between requests.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::adapters::csv_table;
use crate::domain::result::Error;
use crate::domain::{format_timestamp, SpendRow, SpendTable};

/// Amount slider granularity
pub const AMOUNT_STEP: f64 = 50.0;

/// Map centre (central England) and zoom
const MAP_CENTER_LAT: f64 = 52.0;
const MAP_CENTER_LON: f64 = -0.44;
const MAP_ZOOM: &str = "5";

/// Selected date range: `start < created <= end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start < ts && ts <= self.end
    }
}

/// Selected amount range, exclusive at both ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountWindow {
    pub low: f64,
    pub high: f64,
}

impl AmountWindow {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, amount: f64) -> bool {
        self.low < amount && amount < self.high
    }
}

impl From<[f64; 2]> for AmountWindow {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

/// Points picked with the lasso/box tool on the map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapSelection {
    #[serde(default)]
    pub points: Vec<SelectedPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectedPoint {
    pub lat: f64,
    pub lon: f64,
}

impl MapSelection {
    pub fn latitudes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.lat).collect()
    }

    pub fn longitudes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.lon).collect()
    }
}

/// Derived state of the amount slider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
    pub marks: BTreeMap<i64, String>,
    pub value: [f64; 2],
}

/// One row of the data table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub created: String,
    pub amount: f64,
    pub category: String,
    pub description: String,
}

impl From<&SpendRow> for TableRow {
    fn from(row: &SpendRow) -> Self {
        Self {
            created: format_timestamp(&row.created),
            amount: row.amount,
            category: row.category.clone(),
            description: row.description.clone(),
        }
    }
}

/// Spend per category, ready for the pie chart
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PieSlices {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl PieSlices {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.values[i])
    }

    /// Plotly donut chart figure
    pub fn to_figure(&self) -> JsonValue {
        json!({
            "data": [{
                "values": self.values,
                "labels": self.labels,
                "hoverinfo": "label+value",
                "hole": 0.4,
                "type": "pie"
            }],
            "layout": {
                "title": "Expenses by Category",
                "annotations": [{
                    "font": { "size": 16 },
                    "showarrow": false,
                    "text": "Expenses"
                }]
            }
        })
    }
}

/// One marker per distinct location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lon: f64,
    /// Description of the first transaction at this location
    pub description: String,
    /// Sum of every transaction at this location
    pub amount: f64,
}

impl MapMarker {
    pub fn hover_text(&self) -> String {
        format!("{}: {}", self.description, self.amount.trunc() as i64)
    }
}

/// Plotly scattermapbox figure for a set of markers
pub fn map_figure(markers: &[MapMarker], access_token: &str) -> JsonValue {
    let lat: Vec<f64> = markers.iter().map(|m| m.lat).collect();
    let lon: Vec<f64> = markers.iter().map(|m| m.lon).collect();
    let text: Vec<String> = markers.iter().map(MapMarker::hover_text).collect();

    json!({
        "data": [{
            "lat": lat,
            "lon": lon,
            "mode": "markers",
            "hoverinfo": "text",
            "text": text,
            "type": "scattermapbox"
        }],
        "layout": {
            "mapbox": {
                "accesstoken": access_token,
                "center": { "lat": MAP_CENTER_LAT, "lon": MAP_CENTER_LON },
                "zoom": MAP_ZOOM
            },
            "margin": { "l": 0, "r": 0, "b": 0, "t": 0 }
        }
    })
}

/// Initial page state
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub min_date: Option<String>,
    pub max_date: Option<String>,
    pub rows: Vec<TableRow>,
}

/// Dashboard callbacks over an immutable spend table
#[derive(Debug, Clone)]
pub struct DashboardService {
    table: Arc<SpendTable>,
}

impl DashboardService {
    pub fn new(table: Arc<SpendTable>) -> Self {
        Self { table }
    }

    /// Load the enriched table, dropping internal transfers
    pub fn load(path: &Path, internal_category: &str) -> Result<Self> {
        let rows = csv_table::read_enriched(path)
            .with_context(|| format!("Failed to load enriched table {}", path.display()))?;
        let total = rows.len();
        let table = SpendTable::new(rows, internal_category);
        info!(
            "Loaded {} transactions ({} internal transfers hidden)",
            table.len(),
            total - table.len()
        );
        Ok(Self::new(Arc::new(table)))
    }

    pub fn table(&self) -> &SpendTable {
        &self.table
    }

    fn in_window<'a>(&'a self, dates: &'a DateWindow) -> impl Iterator<Item = &'a SpendRow> + 'a {
        self.table.rows().iter().filter(move |r| dates.contains(r.created))
    }

    fn in_windows<'a>(
        &'a self,
        dates: &'a DateWindow,
        amounts: &'a AmountWindow,
    ) -> impl Iterator<Item = &'a SpendRow> + 'a {
        self.in_window(dates).filter(move |r| amounts.contains(r.amount))
    }

    /// Date picker bounds and the unfiltered table
    pub fn layout(&self) -> Layout {
        let bounds = self.table.date_bounds();
        Layout {
            min_date: bounds.map(|(min, _)| format_timestamp(&min)),
            max_date: bounds.map(|(_, max)| format_timestamp(&max)),
            rows: self.table.rows().iter().map(TableRow::from).collect(),
        }
    }

    /// Slider minimum: smallest spend in the window, floored to the step
    pub fn amount_min(&self, dates: &DateWindow) -> Option<f64> {
        let min = self.in_window(dates).map(|r| r.amount).reduce(f64::min)?;
        Some((min / AMOUNT_STEP).floor() * AMOUNT_STEP)
    }

    /// Slider maximum: largest spend in the window, ceiled to the step
    pub fn amount_max(&self, dates: &DateWindow) -> Option<f64> {
        let max = self.in_window(dates).map(|r| r.amount).reduce(f64::max)?;
        Some((max / AMOUNT_STEP).ceil() * AMOUNT_STEP)
    }

    /// Slider tick labels at every step from min to max inclusive
    pub fn amount_marks(&self, dates: &DateWindow) -> Option<BTreeMap<i64, String>> {
        let low = self.amount_min(dates)? as i64;
        let high = self.amount_max(dates)? as i64;
        Some(
            (low..=high)
                .step_by(AMOUNT_STEP as usize)
                .map(|i| (i, i.to_string()))
                .collect(),
        )
    }

    /// Slider value, reset to the full range whenever the dates change
    pub fn amount_value(&self, dates: &DateWindow) -> Option<[f64; 2]> {
        Some([self.amount_min(dates)?, self.amount_max(dates)?])
    }

    /// All slider outputs at once
    pub fn amount_range(&self, dates: &DateWindow) -> Option<AmountRange> {
        Some(AmountRange {
            min: self.amount_min(dates)?,
            max: self.amount_max(dates)?,
            marks: self.amount_marks(dates)?,
            value: self.amount_value(dates)?,
        })
    }

    /// Table rows inside both windows, in table order
    pub fn table_rows(&self, dates: &DateWindow, amounts: &AmountWindow) -> Vec<TableRow> {
        self.in_windows(dates, amounts).map(TableRow::from).collect()
    }

    /// Absolute spend per category inside both windows.
    ///
    /// With a map selection, only latitudes restrict the rows: the longitude
    /// filter is overwritten by the latitude one and never applies.
    pub fn pie_slices(
        &self,
        dates: &DateWindow,
        amounts: &AmountWindow,
        selection: Option<&MapSelection>,
    ) -> PieSlices {
        let latitudes = selection.map(MapSelection::latitudes);

        let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
        for row in self.in_window(dates) {
            if let Some(lats) = &latitudes {
                match row.lat {
                    Some(lat) if lats.contains(&lat) => {}
                    _ => continue,
                }
            }
            if !amounts.contains(row.amount) {
                continue;
            }
            *by_category.entry(row.category.as_str()).or_insert(0.0) += row.amount;
        }

        PieSlices {
            labels: by_category.keys().map(|k| k.to_string()).collect(),
            values: by_category.values().map(|v| v.abs().floor()).collect(),
        }
    }

    /// Pie chart figure
    pub fn pie_figure(
        &self,
        dates: &DateWindow,
        amounts: &AmountWindow,
        selection: Option<&MapSelection>,
    ) -> JsonValue {
        self.pie_slices(dates, amounts, selection).to_figure()
    }

    /// One marker per distinct (lat, long), amounts summed, first-seen order
    pub fn map_markers(&self, dates: &DateWindow, amounts: &AmountWindow) -> Vec<MapMarker> {
        let mut markers: Vec<MapMarker> = Vec::new();
        let mut positions: HashMap<(u64, u64), usize> = HashMap::new();

        for row in self.in_windows(dates, amounts) {
            let (Some(lat), Some(lon)) = (row.lat, row.long) else {
                continue;
            };
            match positions.get(&(lat.to_bits(), lon.to_bits())) {
                Some(&i) => markers[i].amount += row.amount,
                None => {
                    positions.insert((lat.to_bits(), lon.to_bits()), markers.len());
                    markers.push(MapMarker {
                        lat,
                        lon,
                        description: row.description.clone(),
                        amount: row.amount,
                    });
                }
            }
        }

        markers
    }

    /// Map figure; fails when no map access token is available
    pub fn map_figure(
        &self,
        dates: &DateWindow,
        amounts: &AmountWindow,
        access_token: Option<&str>,
    ) -> std::result::Result<JsonValue, Error> {
        let token = access_token.ok_or_else(|| {
            Error::config(format!(
                "{} is not set; the map cannot be rendered",
                crate::config::MAP_TOKEN_ENV
            ))
        })?;
        Ok(map_figure(&self.map_markers(dates, amounts), token))
    }
}
