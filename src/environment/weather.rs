//! Weather provider contract and the OpenWeatherMap client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::model::Location;
use crate::provider::{ensure_success, http_client, ProviderError};

pub const OPENWEATHERMAP_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Current conditions at a point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentConditions {
    /// Precipitation over the last hour, if reported
    pub rainfall_last_hour_mm: Option<f64>,
}

/// One 3-hour forecast bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastInterval {
    pub rainfall_3h_mm: Option<f64>,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_conditions(
        &self,
        location: Location,
    ) -> Result<CurrentConditions, ProviderError>;

    /// Up to `count` upcoming forecast intervals, nearest first
    async fn forecast(
        &self,
        location: Location,
        count: usize,
    ) -> Result<Vec<ForecastInterval>, ProviderError>;
}

/// Client for the OpenWeatherMap 2.5 REST API
#[derive(Debug, Clone)]
pub struct OpenWeatherMapClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherMapClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.into(),
            base_url: OPENWEATHERMAP_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        location: Location,
        extra: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut params = vec![
            ("lat", location.latitude().to_string()),
            ("lon", location.longitude().to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ];
        params.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

        let response = self.http.get(&url).query(&params).send().await?;
        let response = ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    async fn current_conditions(
        &self,
        location: Location,
    ) -> Result<CurrentConditions, ProviderError> {
        let body: CurrentResponse = self.get("weather", location, &[]).await?;
        Ok(CurrentConditions {
            rainfall_last_hour_mm: body.rain.and_then(|r| r.one_hour),
        })
    }

    async fn forecast(
        &self,
        location: Location,
        count: usize,
    ) -> Result<Vec<ForecastInterval>, ProviderError> {
        let body: ForecastResponse = self
            .get("forecast", location, &[("cnt", count.to_string())])
            .await?;
        Ok(body
            .list
            .into_iter()
            .map(|entry| ForecastInterval {
                rainfall_3h_mm: entry.rain.and_then(|r| r.three_hours),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    rain: Option<RainVolume>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    #[serde(default)]
    rain: Option<RainVolume>,
}

#[derive(Debug, Deserialize)]
struct RainVolume {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
    #[serde(rename = "3h", default)]
    three_hours: Option<f64>,
}
