//! Risk evaluation and alert pipeline
//!
//! resolve reading -> score -> (High or Critical only) match subscribers ->
//! dispatch. Scoring always completes; alerting failures are reported
//! alongside the assessment, never instead of it.

pub mod orchestrator;

use async_trait::async_trait;

use crate::model::{Location, Severity, Subscription};

pub use orchestrator::{AlertStatus, EvaluationRequest, FloodPipeline, PipelineResult};

/// Record store failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Source of candidate subscriptions for an event.
///
/// Implementations may pre-filter however they like; radius and severity
/// are always re-checked by the matcher.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_active_subscriptions_near(
        &self,
        location: Location,
        severity: Severity,
    ) -> Result<Vec<Subscription>, StoreError>;
}
