//! Elevation provider contract, the Google Elevation client, and the
//! deterministic mock used when no provider is available

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::model::Location;
use crate::provider::{ensure_success, http_client, ProviderError};

pub const GOOGLE_ELEVATION_BASE_URL: &str = "https://maps.googleapis.com/maps/api/elevation/json";

/// Raw elevation lookup result. Only `status == "OK"` carries a usable value.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationResponse {
    pub status: String,
    pub elevation_m: Option<f64>,
}

impl ElevationResponse {
    pub fn ok(elevation_m: f64) -> Self {
        Self {
            status: "OK".to_string(),
            elevation_m: Some(elevation_m),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

#[async_trait]
pub trait ElevationProvider: Send + Sync {
    async fn elevation(&self, location: Location) -> Result<ElevationResponse, ProviderError>;
}

/// Client for the Google Maps Elevation API
#[derive(Debug, Clone)]
pub struct GoogleElevationClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleElevationClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.into(),
            base_url: GOOGLE_ELEVATION_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ElevationProvider for GoogleElevationClient {
    async fn elevation(&self, location: Location) -> Result<ElevationResponse, ProviderError> {
        let locations = format!("{},{}", location.latitude(), location.longitude());
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("locations", locations.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?;
        let body: GoogleResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(ElevationResponse {
            status: body.status,
            elevation_m: body.results.first().map(|r| r.elevation),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    elevation: f64,
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the little-endian IEEE-754 bits of both coordinates.
/// Stable across platforms, builds and runs.
pub fn coordinate_hash(latitude: f64, longitude: f64) -> u64 {
    // -0.0 and 0.0 must hash alike
    let normalize = |v: f64| if v == 0.0 { 0.0f64 } else { v };

    let mut hash = FNV_OFFSET_BASIS;
    for value in [normalize(latitude), normalize(longitude)] {
        for byte in value.to_bits().to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Stand-in elevation when no provider answer is available.
///
/// `|latitude| * 10` metres plus an offset in `[-50, 50]` derived from
/// `coordinate_hash`, floored at zero.
pub fn mock_elevation(location: Location) -> f64 {
    let base = location.latitude().abs() * 10.0;
    let offset = (coordinate_hash(location.latitude(), location.longitude()) % 101) as f64 - 50.0;
    (base + offset).max(0.0)
}
