//! Environmental reading resolution with deterministic fallback

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use super::elevation::{mock_elevation, ElevationProvider, GoogleElevationClient};
use super::weather::{OpenWeatherMapClient, WeatherProvider};
use crate::config::FloodConfig;
use crate::model::{EnvironmentalReading, Location};
use crate::provider::{bounded, ProviderError, DEFAULT_PROVIDER_TIMEOUT};

/// Rainfall used when no measurement can be obtained. A moderate value, so a
/// provider outage never reads as "no rain".
pub const DEFAULT_RAINFALL_MM: f64 = 5.0;

/// Forecast intervals requested from the provider
pub const FORECAST_REQUEST_COUNT: usize = 8;

/// Leading 3-hour intervals averaged for the forecast fallback (~12 hours)
pub const FORECAST_WINDOW: usize = 4;

/// Produces an `EnvironmentalReading` for a location. Never fails.
pub struct EnvironmentalDataResolver {
    weather: Option<Arc<dyn WeatherProvider>>,
    elevation: Option<Arc<dyn ElevationProvider>>,
    call_timeout: Duration,
    /// Provider elevations keyed by coordinate bits
    elevation_cache: Cache<(u64, u64), f64>,
}

impl EnvironmentalDataResolver {
    pub fn new(
        weather: Option<Arc<dyn WeatherProvider>>,
        elevation: Option<Arc<dyn ElevationProvider>>,
    ) -> Self {
        Self {
            weather,
            elevation,
            call_timeout: DEFAULT_PROVIDER_TIMEOUT,
            elevation_cache: Cache::new(10_000),
        }
    }

    /// Resolver that never calls out: default rainfall, mock elevation
    pub fn offline() -> Self {
        Self::new(None, None)
    }

    pub fn from_config(config: &FloodConfig) -> Result<Self, ProviderError> {
        let weather: Option<Arc<dyn WeatherProvider>> = match &config.openweathermap_api_key {
            Some(key) => Some(Arc::new(
                OpenWeatherMapClient::new(key.clone(), config.provider_timeout)?
                    .with_base_url(config.openweathermap_base_url.clone()),
            )),
            None => {
                tracing::warn!(
                    "OpenWeatherMap API key not configured; rainfall defaults to {} mm",
                    DEFAULT_RAINFALL_MM
                );
                None
            }
        };

        let elevation: Option<Arc<dyn ElevationProvider>> =
            match &config.google_elevation_api_key {
                Some(key) => Some(Arc::new(
                    GoogleElevationClient::new(key.clone(), config.provider_timeout)?
                        .with_base_url(config.google_elevation_base_url.clone()),
                )),
                None => {
                    tracing::info!("Google Elevation API key not configured; using mock elevation");
                    None
                }
            };

        Ok(Self::new(weather, elevation)
            .with_timeout(config.provider_timeout)
            .with_cache_capacity(config.elevation_cache_size))
    }

    /// Set the bound applied to each provider call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.elevation_cache = Cache::new(capacity);
        self
    }

    /// Resolve rainfall and elevation concurrently.
    ///
    /// Overrides are used verbatim and skip the corresponding provider; they
    /// are expected to be validated (non-negative) by the caller.
    pub async fn resolve(
        &self,
        location: Location,
        rainfall_override: Option<f64>,
        elevation_override: Option<f64>,
    ) -> EnvironmentalReading {
        let rainfall = async {
            match rainfall_override {
                Some(mm) => mm,
                None => self.rainfall(location).await,
            }
        };
        let elevation = async {
            match elevation_override {
                Some(m) => m,
                None => self.elevation(location).await,
            }
        };

        let (rainfall_mm, elevation_m) = tokio::join!(rainfall, elevation);
        EnvironmentalReading {
            rainfall_mm,
            elevation_m,
        }
    }

    /// Current-hour precipitation, falling back to the forecast average, then
    /// to `DEFAULT_RAINFALL_MM`
    pub async fn rainfall(&self, location: Location) -> f64 {
        let Some(weather) = &self.weather else {
            return DEFAULT_RAINFALL_MM;
        };

        match bounded(self.call_timeout, weather.current_conditions(location)).await {
            Ok(current) => {
                let mm = current
                    .rainfall_last_hour_mm
                    .filter(|mm| mm.is_finite() && *mm >= 0.0)
                    .unwrap_or(0.0);
                if mm > 0.0 {
                    return mm;
                }
            }
            Err(e) => {
                tracing::warn!(
                    location = %location,
                    error = %e,
                    "Current rainfall lookup failed, trying forecast"
                );
            }
        }

        match self.forecast_rainfall(weather.as_ref(), location).await {
            Some(mm) => mm,
            None => {
                tracing::warn!(
                    location = %location,
                    "No rainfall data available, using default of {} mm",
                    DEFAULT_RAINFALL_MM
                );
                DEFAULT_RAINFALL_MM
            }
        }
    }

    /// Mean 3-hour precipitation over the leading forecast window.
    /// `None` when the call fails or the forecast is empty.
    async fn forecast_rainfall(
        &self,
        weather: &dyn WeatherProvider,
        location: Location,
    ) -> Option<f64> {
        let intervals = match bounded(
            self.call_timeout,
            weather.forecast(location, FORECAST_REQUEST_COUNT),
        )
        .await
        {
            Ok(intervals) => intervals,
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "Forecast lookup failed");
                return None;
            }
        };

        if intervals.is_empty() {
            return None;
        }

        let total: f64 = intervals
            .iter()
            .take(FORECAST_WINDOW)
            .filter_map(|i| i.rainfall_3h_mm)
            .filter(|mm| mm.is_finite() && *mm >= 0.0)
            .sum();

        Some(total / FORECAST_WINDOW as f64)
    }

    /// Provider elevation, or `mock_elevation` when unconfigured, failing, or
    /// answering with a non-OK status
    pub async fn elevation(&self, location: Location) -> f64 {
        let Some(provider) = &self.elevation else {
            return mock_elevation(location);
        };

        let key = (location.latitude().to_bits(), location.longitude().to_bits());
        if let Some(cached) = self.elevation_cache.get(&key).await {
            return cached;
        }

        match bounded(self.call_timeout, provider.elevation(location)).await {
            Ok(response) if response.is_ok() => match response.elevation_m {
                Some(m) if m.is_finite() => {
                    // below sea level still reads as the lowest bracket
                    let m = m.max(0.0);
                    self.elevation_cache.insert(key, m).await;
                    m
                }
                _ => {
                    tracing::warn!(location = %location, "Elevation response had no result");
                    mock_elevation(location)
                }
            },
            Ok(response) => {
                tracing::warn!(
                    location = %location,
                    status = %response.status,
                    "Elevation provider returned non-OK status, using mock elevation"
                );
                mock_elevation(location)
            }
            Err(e) => {
                tracing::warn!(
                    location = %location,
                    error = %e,
                    "Elevation lookup failed, using mock elevation"
                );
                mock_elevation(location)
            }
        }
    }
}
