//! postcodes.io API client
//!
//! Bulk postcode lookup: `POST /postcodes` with up to 100 postcodes.
//!
//! API Documentation: https://postcodes.io/docs

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::PostcodeMatch;
use crate::ports::PostcodeGeocoder;

/// Default production API URL
pub const POSTCODES_IO_PRODUCTION_URL: &str = "https://api.postcodes.io";

/// Environment variable to override the postcodes.io base URL.
pub const POSTCODES_IO_BASE_URL_ENV: &str = "POSTCODES_IO_BASE_URL";

/// Hard limit of the bulk lookup endpoint
pub const MAX_BULK_LOOKUP: usize = 100;

// =============================================================================
// API Models
// =============================================================================

#[derive(Debug, Serialize)]
struct BulkLookupRequest<'a> {
    postcodes: &'a [String],
}

#[derive(Debug, Deserialize)]
struct BulkLookupResponse {
    status: u16,
    #[serde(default)]
    result: Vec<BulkLookupEntry>,
}

#[derive(Debug, Deserialize)]
struct BulkLookupEntry {
    query: String,
    result: Option<PostcodeDetails>,
}

/// The subset of a postcodes.io postcode record this crate reads
#[derive(Debug, Deserialize)]
struct PostcodeDetails {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl BulkLookupEntry {
    fn into_match(self) -> PostcodeMatch {
        // Some terminated/offshore postcodes resolve without coordinates
        match self.result {
            Some(PostcodeDetails {
                latitude: Some(lat),
                longitude: Some(long),
            }) => PostcodeMatch::resolved(self.query, lat, long),
            _ => PostcodeMatch::unresolved(self.query),
        }
    }
}

// =============================================================================
// HTTP Client
// =============================================================================

/// postcodes.io API client
#[derive(Debug)]
pub struct PostcodesIoClient {
    client: Client,
    base_url: String,
}

impl PostcodesIoClient {
    /// Create a client with a custom base URL
    pub fn new_with_base_url(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid postcodes.io URL {base_url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "postcodes.io URL must use http or https, got {}",
                parsed.scheme()
            )));
        }

        let mut builder = Client::builder().timeout(Duration::from_secs(30));
        if matches!(parsed.host_str(), Some("127.0.0.1" | "localhost")) {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| Error::geocoding(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bulk-resolve up to 100 postcodes
    pub fn bulk_lookup(&self, postcodes: &[String]) -> Result<Vec<PostcodeMatch>> {
        if postcodes.len() > MAX_BULK_LOOKUP {
            return Err(Error::validation(format!(
                "postcodes.io accepts at most {} postcodes per request, got {}",
                MAX_BULK_LOOKUP,
                postcodes.len()
            )));
        }
        if postcodes.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/postcodes", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&BulkLookupRequest { postcodes })
            .send()
            .map_err(|e| self.map_request_error(e))?;

        self.check_response_status(&response)?;

        let body: BulkLookupResponse = response
            .json()
            .map_err(|e| Error::geocoding(format!("Failed to parse postcodes.io response: {e}")))?;

        if body.status != 200 {
            return Err(Error::geocoding(format!(
                "postcodes.io reported status {}",
                body.status
            )));
        }

        Ok(body.result.into_iter().map(BulkLookupEntry::into_match).collect())
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::geocoding("Connection to postcodes.io timed out after 30 seconds")
        } else if error.is_connect() {
            Error::geocoding(format!("Unable to connect to {}", self.base_url))
        } else {
            Error::geocoding(format!("postcodes.io request failed: {error}"))
        }
    }

    /// Check response status and return appropriate errors
    fn check_response_status(&self, response: &reqwest::blocking::Response) -> Result<()> {
        match response.status().as_u16() {
            200 => Ok(()),
            400 => Err(Error::geocoding("postcodes.io rejected the request (HTTP 400)")),
            429 => Err(Error::geocoding("postcodes.io rate limit exceeded (HTTP 429)")),
            status => Err(Error::geocoding(format!("postcodes.io API error: HTTP {status}"))),
        }
    }
}

impl PostcodeGeocoder for PostcodesIoClient {
    fn name(&self) -> &str {
        "postcodes.io"
    }

    fn max_batch_size(&self) -> usize {
        MAX_BULK_LOOKUP
    }

    fn lookup(&self, postcodes: &[String]) -> Result<Vec<PostcodeMatch>> {
        self.bulk_lookup(postcodes)
    }
}
