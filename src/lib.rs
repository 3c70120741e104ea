//! Floodwatch: hyperlocal flood-risk scoring and alerting
//!
//! Combines rainfall and terrain elevation into a 0-100 flood-risk score,
//! maps it to a severity tier, and notifies nearby subscribers over SMS and
//! email when the tier is High or Critical.
//!
//! # Pipeline
//!
//! - **Environment**: rainfall and elevation from weather and elevation
//!   providers, with deterministic fallbacks when they are missing or fail
//! - **Risk**: additive, bin-based scoring with a human-readable explanation
//! - **Matching**: subscribers whose radius covers the event and whose
//!   severity threshold is met
//! - **Alerts**: concurrent SMS and email fan-out with per-channel counts
//!
//! # Example
//!
//! ```no_run
//! use floodwatch::environment::EnvironmentalDataResolver;
//! use floodwatch::model::Location;
//! use floodwatch::risk::RiskScorer;
//!
//! # async fn run() -> Result<(), floodwatch::model::ValidationError> {
//! let resolver = EnvironmentalDataResolver::offline();
//! let location = Location::new(40.7128, -74.0060)?;
//!
//! let reading = resolver.resolve(location, Some(35.2), Some(15.5)).await;
//! let assessment = RiskScorer::new().score(reading);
//! println!("{} ({})", assessment.score, assessment.severity);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod environment;
pub mod matching;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod risk;
pub mod store;

// Re-export commonly used types
pub use config::FloodConfig;
pub use model::{EnvironmentalReading, Location, Severity, Subscription, ValidationError};
pub use pipeline::{FloodPipeline, PipelineResult};
pub use provider::ProviderError;
pub use risk::{RiskAssessment, RiskScorer};
