//! Core domain entities
//!
//! Pure data structures and transformations - no I/O.

mod postcode;
mod spend;
mod transaction;
pub mod result;

pub use postcode::{extract_postcode, Coordinates, LookupOutcome, PostcodeLookup, PostcodeMatch};
pub use spend::{SpendRow, SpendTable};
pub use transaction::{
    clean_amount, format_timestamp, parse_timestamp, Transaction, TransactionTable,
    DERIVED_COLUMNS, REQUIRED_COLUMNS,
};
