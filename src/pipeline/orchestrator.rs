use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::SubscriptionStore;
use crate::alerts::{AlertContent, AlertDispatcher, DispatchOutcome};
use crate::config::FloodConfig;
use crate::environment::EnvironmentalDataResolver;
use crate::matching::SubscriberMatcher;
use crate::model::reading::{check_elevation, check_rainfall};
use crate::model::{Location, ValidationError};
use crate::provider::ProviderError;
use crate::risk::{RiskAssessment, RiskScorer};

/// A validated request to evaluate one location
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub location: Location,
    pub location_name: Option<String>,
    pub rainfall_override: Option<f64>,
    pub elevation_override: Option<f64>,
}

impl EvaluationRequest {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            location_name: None,
            rainfall_override: None,
            elevation_override: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }

    /// Use `rainfall_mm` instead of asking the weather provider
    pub fn with_rainfall(mut self, rainfall_mm: f64) -> Result<Self, ValidationError> {
        self.rainfall_override = Some(check_rainfall(rainfall_mm)?);
        Ok(self)
    }

    /// Use `elevation_m` instead of asking the elevation provider
    pub fn with_elevation(mut self, elevation_m: f64) -> Result<Self, ValidationError> {
        self.elevation_override = Some(check_elevation(elevation_m)?);
        Ok(self)
    }

    pub fn display_name(&self) -> String {
        self.location_name
            .clone()
            .unwrap_or_else(|| self.location.to_string())
    }
}

/// What happened after scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlertStatus {
    /// Severity below High; matching and dispatch skipped
    NotRequired,
    Dispatched {
        matched: usize,
        outcome: DispatchOutcome,
    },
    /// Candidates could not be fetched; nothing was sent
    StoreUnavailable { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub assessment: RiskAssessment,
    pub alert: AlertStatus,
}

impl PipelineResult {
    pub fn outcome(&self) -> Option<&DispatchOutcome> {
        match &self.alert {
            AlertStatus::Dispatched { outcome, .. } => Some(outcome),
            _ => None,
        }
    }
}

/// Composes resolver, scorer, matcher and dispatcher. Holds no per-call state.
pub struct FloodPipeline {
    resolver: EnvironmentalDataResolver,
    scorer: RiskScorer,
    matcher: SubscriberMatcher,
    dispatcher: AlertDispatcher,
    subscriptions: Arc<dyn SubscriptionStore>,
}

impl FloodPipeline {
    pub fn new(
        resolver: EnvironmentalDataResolver,
        dispatcher: AlertDispatcher,
        subscriptions: Arc<dyn SubscriptionStore>,
    ) -> Self {
        Self {
            resolver,
            scorer: RiskScorer::new(),
            matcher: SubscriberMatcher::new(),
            dispatcher,
            subscriptions,
        }
    }

    pub fn from_config(
        config: &FloodConfig,
        subscriptions: Arc<dyn SubscriptionStore>,
    ) -> Result<Self, ProviderError> {
        Ok(Self::new(
            EnvironmentalDataResolver::from_config(config)?,
            AlertDispatcher::from_config(config)?,
            subscriptions,
        ))
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    /// Resolve and score only. Never fails and never alerts.
    pub async fn assess(&self, request: &EvaluationRequest) -> RiskAssessment {
        let reading = self
            .resolver
            .resolve(
                request.location,
                request.rainfall_override,
                request.elevation_override,
            )
            .await;
        self.scorer.score(reading)
    }

    /// Full evaluation: score, then alert matched subscribers when the
    /// severity is High or Critical
    pub async fn evaluate(&self, request: &EvaluationRequest) -> PipelineResult {
        let assessment = self.assess(request).await;

        tracing::info!(
            location = %request.location,
            score = assessment.score,
            severity = %assessment.severity,
            rainfall_mm = assessment.reading.rainfall_mm,
            elevation_m = assessment.reading.elevation_m,
            "Flood risk evaluated"
        );

        let content = AlertContent::new(
            request.display_name(),
            assessment.severity,
            assessment.score,
            request.location,
        );
        let alert = self.alert(&content).await;

        PipelineResult { assessment, alert }
    }

    /// Match and notify subscribers for an already-scored event. Low and
    /// Medium events are never dispatched.
    pub async fn alert(&self, content: &AlertContent) -> AlertStatus {
        if !content.severity.is_alerting() {
            tracing::debug!(
                location = %content.location,
                severity = %content.severity,
                "Below alert threshold, not dispatching"
            );
            return AlertStatus::NotRequired;
        }

        let candidates = match self
            .subscriptions
            .find_active_subscriptions_near(content.location, content.severity)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(
                    location = %content.location,
                    error = %e,
                    "Failed to load subscriptions, skipping alert dispatch"
                );
                return AlertStatus::StoreUnavailable {
                    error: e.to_string(),
                };
            }
        };

        let matched = self
            .matcher
            .matches(content.location, content.severity, &candidates);
        if matched.is_empty() {
            tracing::info!(location = %content.location, "No subscriptions matched");
        }

        let outcome = self.dispatcher.dispatch(content, &matched).await;
        AlertStatus::Dispatched {
            matched: matched.len(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{Channel, EmailMessage, EmailProvider, SmsProvider};
    use crate::model::{ContactChannels, Severity, Subscription};
    use crate::pipeline::StoreError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStore {
        subscriptions: Result<Vec<Subscription>, StoreError>,
        calls: AtomicUsize,
    }

    impl FixedStore {
        fn with(subscriptions: Vec<Subscription>) -> Arc<Self> {
            Arc::new(Self {
                subscriptions: Ok(subscriptions),
                calls: AtomicUsize::new(0),
            })
        }

        fn unavailable() -> Arc<Self> {
            Arc::new(Self {
                subscriptions: Err(StoreError::Unavailable("connection refused".to_string())),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SubscriptionStore for FixedStore {
        async fn find_active_subscriptions_near(
            &self,
            _location: Location,
            _severity: Severity,
        ) -> Result<Vec<Subscription>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.subscriptions.clone()
        }
    }

    #[derive(Default)]
    struct RecordingSms {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SmsProvider for RecordingSms {
        async fn send(&self, to: &str, _body: &str) -> Result<(), ProviderError> {
            self.sent.lock().push(to.to_string());
            Ok(())
        }
    }

    struct FailingEmail;

    #[async_trait]
    impl EmailProvider for FailingEmail {
        async fn send(&self, _to: &str, _message: &EmailMessage) -> Result<(), ProviderError> {
            Err(ProviderError::Network("smtp relay down".to_string()))
        }
    }

    fn origin() -> Location {
        Location::new(0.0, 0.0).unwrap()
    }

    fn subscriber(id: u64, min: Severity, phone: &str) -> Subscription {
        Subscription::new(id, origin(), 5.0, min, ContactChannels::phone(phone).unwrap()).unwrap()
    }

    fn pipeline(store: Arc<FixedStore>, sms: Arc<RecordingSms>) -> FloodPipeline {
        FloodPipeline::new(
            EnvironmentalDataResolver::offline(),
            AlertDispatcher::new(Some(sms), Some(Arc::new(FailingEmail))),
            store,
        )
    }

    fn request(rainfall_mm: f64, elevation_m: f64) -> EvaluationRequest {
        EvaluationRequest::new(origin())
            .with_name("Harbour Road")
            .with_rainfall(rainfall_mm)
            .unwrap()
            .with_elevation(elevation_m)
            .unwrap()
    }

    #[tokio::test]
    async fn test_critical_event_alerts_matching_subscribers() {
        let store = FixedStore::with(vec![
            subscriber(1, Severity::Medium, "+15550000001"),
            subscriber(2, Severity::Critical, "+15550000002"),
            subscriber(3, Severity::Low, "+15550000003").with_active(false),
        ]);
        let sms = Arc::new(RecordingSms::default());
        let pipeline = pipeline(store, sms.clone());

        let result = pipeline.evaluate(&request(35.2, 15.5)).await;

        assert_eq!(result.assessment.score, 80.0);
        assert_eq!(result.assessment.severity, Severity::Critical);
        match &result.alert {
            AlertStatus::Dispatched { matched, outcome } => {
                assert_eq!(*matched, 2);
                assert_eq!(outcome.sent(Channel::Sms), 2);
            }
            other => panic!("expected dispatch, got {:?}", other),
        }
        let mut sent = sms.sent.lock().clone();
        sent.sort();
        assert_eq!(sent, vec!["+15550000001", "+15550000002"]);
    }

    #[tokio::test]
    async fn test_high_event_respects_thresholds() {
        let store = FixedStore::with(vec![
            subscriber(1, Severity::High, "+15550000001"),
            subscriber(2, Severity::Critical, "+15550000002"),
        ]);
        let sms = Arc::new(RecordingSms::default());
        let pipeline = pipeline(store, sms.clone());

        // 35 + 30 = 65
        let result = pipeline.evaluate(&request(20.0, 20.0)).await;

        assert_eq!(result.assessment.severity, Severity::High);
        assert_eq!(result.outcome().map(|o| o.sent(Channel::Sms)), Some(1));
        assert_eq!(sms.sent.lock().clone(), vec!["+15550000001"]);
    }

    #[tokio::test]
    async fn test_low_and_medium_never_alert() {
        let store = FixedStore::with(vec![subscriber(1, Severity::Low, "+15550000001")]);
        let sms = Arc::new(RecordingSms::default());
        let pipeline = pipeline(store.clone(), sms.clone());

        // 20 + 20 = 40
        let medium = pipeline.evaluate(&request(10.0, 60.0)).await;
        assert_eq!(medium.assessment.severity, Severity::Medium);
        assert_eq!(medium.alert, AlertStatus::NotRequired);

        // 10 + 5 = 15
        let low = pipeline.evaluate(&request(0.0, 500.0)).await;
        assert_eq!(low.assessment.severity, Severity::Low);
        assert_eq!(low.alert, AlertStatus::NotRequired);

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert!(sms.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_manual_alert_below_threshold_sends_nothing() {
        let store = FixedStore::with(vec![subscriber(1, Severity::Low, "+15550000001")]);
        let sms = Arc::new(RecordingSms::default());
        let pipeline = pipeline(store.clone(), sms.clone());

        for severity in [Severity::Low, Severity::Medium] {
            let content = AlertContent::new("Harbour Road", severity, 40.0, origin());
            assert_eq!(pipeline.alert(&content).await, AlertStatus::NotRequired);
        }

        let content = AlertContent::new("Harbour Road", Severity::High, 65.0, origin());
        assert!(matches!(
            pipeline.alert(&content).await,
            AlertStatus::Dispatched { matched: 1, .. }
        ));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sms.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_evaluation_runs_on_spawned_task() {
        let store = FixedStore::with(vec![subscriber(1, Severity::Medium, "+15550000001")]);
        let sms = Arc::new(RecordingSms::default());
        let pipeline = Arc::new(pipeline(store, sms.clone()));

        let task = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.evaluate(&request(35.2, 15.5)).await }
        });
        let result = task.await.unwrap();

        assert_eq!(result.outcome().map(|o| o.sent(Channel::Sms)), Some(1));
        assert_eq!(sms.sent.lock().clone(), vec!["+15550000001"]);
    }

    #[tokio::test]
    async fn test_store_failure_keeps_assessment() {
        let sms = Arc::new(RecordingSms::default());
        let pipeline = pipeline(FixedStore::unavailable(), sms);

        let result = pipeline.evaluate(&request(60.0, 0.0)).await;

        assert_eq!(result.assessment.score, 100.0);
        assert!(matches!(result.alert, AlertStatus::StoreUnavailable { .. }));
        assert!(result.outcome().is_none());
    }

    #[tokio::test]
    async fn test_no_matches_is_an_empty_dispatch() {
        let far = Subscription::new(
            1,
            Location::new(10.0, 10.0).unwrap(),
            5.0,
            Severity::Low,
            ContactChannels::phone("+15550000001").unwrap(),
        )
        .unwrap();
        let pipeline = pipeline(FixedStore::with(vec![far]), Arc::new(RecordingSms::default()));

        let result = pipeline.evaluate(&request(60.0, 0.0)).await;
        assert_eq!(
            result.alert,
            AlertStatus::Dispatched {
                matched: 0,
                outcome: DispatchOutcome::default()
            }
        );
    }

    #[tokio::test]
    async fn test_without_overrides_uses_fallbacks() {
        let pipeline = pipeline(FixedStore::with(vec![]), Arc::new(RecordingSms::default()));
        let request = EvaluationRequest::new(origin());

        let first = pipeline.assess(&request).await;
        let second = pipeline.assess(&request).await;

        assert_eq!(first.reading.rainfall_mm, crate::environment::DEFAULT_RAINFALL_MM);
        assert_eq!(first, second);
    }

    #[test]
    fn test_request_rejects_negative_overrides() {
        assert!(EvaluationRequest::new(origin()).with_rainfall(-0.1).is_err());
        assert!(EvaluationRequest::new(origin()).with_elevation(-5.0).is_err());
        assert_eq!(EvaluationRequest::new(origin()).display_name(), "0.0000, 0.0000");
    }
}
