//! Environmental data resolution
//!
//! Rainfall comes from a weather provider, elevation from an elevation
//! provider. Either may be unreachable or unconfigured; the resolver always
//! produces a usable reading by falling back to deterministic values.

pub mod elevation;
pub mod resolver;
pub mod weather;

pub use elevation::{mock_elevation, ElevationProvider, ElevationResponse, GoogleElevationClient};
pub use resolver::{EnvironmentalDataResolver, DEFAULT_RAINFALL_MM};
pub use weather::{CurrentConditions, ForecastInterval, OpenWeatherMapClient, WeatherProvider};
