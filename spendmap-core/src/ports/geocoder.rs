//! Postcode geocoding port
//!
//! Defines the interface for resolving UK postcodes to coordinates through an
//! external service (postcodes.io, or a fake in tests).

use crate::domain::result::Result;
use crate::domain::PostcodeMatch;

/// Batch postcode geocoder
///
/// The PreprocessService chunks its postcodes by `max_batch_size` and calls
/// `lookup` once per chunk, without knowing which service answers.
pub trait PostcodeGeocoder: Send + Sync {
    /// Service name (e.g., "postcodes.io")
    fn name(&self) -> &str;

    /// Largest batch a single `lookup` call accepts
    fn max_batch_size(&self) -> usize;

    /// Resolve a batch of postcodes
    ///
    /// Returns one entry per answered query. Unknown postcodes come back with
    /// `coordinates: None`; they are not errors. Any transport failure is.
    fn lookup(&self, postcodes: &[String]) -> Result<Vec<PostcodeMatch>>;
}
