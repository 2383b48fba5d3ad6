//! UK postcode extraction and the per-run postcode lookup table

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Royal Mail postcode grammar: GIR 0AA, or area + district (+ sub-district),
    /// any number of spaces, sector digit and two unit letters.
    static ref UK_POSTCODE: Regex = Regex::new(concat!(
        "(([gG][iI][rR] {0,}0[aA]{2})|",
        "((([a-pr-uwyzA-PR-UWYZ][a-hk-yA-HK-Y]?[0-9][0-9]?)|",
        "(([a-pr-uwyzA-PR-UWYZ][0-9][a-hjkstuwA-HJKSTUW])|",
        "([a-pr-uwyzA-PR-UWYZ][a-hk-yA-HK-Y][0-9][abehmnprv-yABEHMNPRV-Y])))",
        " {0,}[0-9][abd-hjlnp-uw-zABD-HJLNP-UW-Z]{2}))"
    ))
    .unwrap();
}

/// Extract the first UK postcode found anywhere in `text`.
///
/// The matched text is returned verbatim (case and spacing untouched).
pub fn extract_postcode(text: &str) -> Option<String> {
    UK_POSTCODE.find(text).map(|m| m.as_str().to_string())
}

/// A resolved latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One entry of a batch lookup response
#[derive(Debug, Clone, PartialEq)]
pub struct PostcodeMatch {
    /// The postcode as it was sent
    pub query: String,
    /// `None` when the service does not recognise the postcode
    pub coordinates: Option<Coordinates>,
}

impl PostcodeMatch {
    pub fn resolved(query: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            query: query.into(),
            coordinates: Some(Coordinates { latitude, longitude }),
        }
    }

    pub fn unresolved(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            coordinates: None,
        }
    }
}

/// Outcome of offering a match to the lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Inserted,
    /// Already resolved by an earlier result; the new one is ignored
    Duplicate,
    Unresolved,
}

/// Postcode -> `"lat,long"` mapping built once per preprocessing run
#[derive(Debug, Clone, Default)]
pub struct PostcodeLookup {
    entries: HashMap<String, String>,
}

impl PostcodeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lookup result. The first successful result per postcode wins.
    pub fn record(&mut self, result: &PostcodeMatch) -> LookupOutcome {
        let Some(coords) = result.coordinates else {
            return LookupOutcome::Unresolved;
        };
        if self.entries.contains_key(&result.query) {
            return LookupOutcome::Duplicate;
        }
        self.entries.insert(
            result.query.clone(),
            format!("{},{}", coords.latitude, coords.longitude),
        );
        LookupOutcome::Inserted
    }

    /// The raw `"lat,long"` value for a postcode
    pub fn get(&self, postcode: &str) -> Option<&str> {
        self.entries.get(postcode).map(String::as_str)
    }

    /// Latitude and longitude for a postcode, split on the first comma.
    pub fn coordinates(&self, postcode: &str) -> Option<(f64, f64)> {
        let (lat, long) = self.get(postcode)?.split_once(',')?;
        Some((lat.trim().parse().ok()?, long.trim().parse().ok()?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
