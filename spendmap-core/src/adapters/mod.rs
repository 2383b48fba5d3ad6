//! Adapter implementations
//!
//! Adapters implement the port traits and file formats with concrete technologies:
//! - postcodes.io HTTP client for the PostcodeGeocoder port
//! - CSV files for the raw export and the enriched table

pub mod csv_table;
pub mod postcodes_io;

#[cfg(test)]
pub mod postcodes_io_mock;
