use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alerts::message::confirmation_email;
use crate::alerts::{AlertContent, Channel, TestNotificationResult};
use crate::model::{ContactChannels, Location, Severity, Subscription, ValidationError};
use crate::pipeline::{AlertStatus, EvaluationRequest, FloodPipeline};
use crate::risk::RiskFactors;
use crate::store::{EventLog, FloodEvent, SubscriptionRegistry, SubscriptionUpdate};

/// Radius bounds accepted from API clients, in km
const MIN_RADIUS_KM: f64 = 0.1;
const MAX_RADIUS_KM: f64 = 50.0;
const DEFAULT_RADIUS_KM: f64 = 5.0;
const MAX_PAGE_SIZE: usize = 500;

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: Arc<FloodPipeline>,
    pub subscriptions: Arc<SubscriptionRegistry>,
    pub events: Arc<EventLog>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Risk Calculation
// ============================================================================

#[derive(Deserialize)]
pub struct RiskCalculationRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub location_name: Option<String>,
}

#[derive(Serialize)]
pub struct RiskCalculationResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: Option<String>,
    pub risk_score: f64,
    pub severity: Severity,
    pub rainfall_mm: f64,
    pub elevation_m: f64,
    pub factors: RiskFactors,
}

/// Score a location without recording or alerting
pub async fn calculate_risk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RiskCalculationRequest>,
) -> Result<Json<RiskCalculationResponse>, ApiError> {
    let location = Location::new(request.latitude, request.longitude)?;
    let assessment = state
        .pipeline
        .assess(&EvaluationRequest::new(location))
        .await;

    Ok(Json(RiskCalculationResponse {
        latitude: request.latitude,
        longitude: request.longitude,
        location_name: request.location_name,
        risk_score: assessment.score,
        severity: assessment.severity,
        rainfall_mm: assessment.reading.rainfall_mm,
        elevation_m: assessment.reading.elevation_m,
        factors: assessment.factors,
    }))
}

// ============================================================================
// Flood Events
// ============================================================================

#[derive(Deserialize)]
pub struct CreateFloodEventRequest {
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rainfall_mm: Option<f64>,
    #[serde(default)]
    pub elevation_m: Option<f64>,
}

#[derive(Serialize)]
pub struct CreateFloodEventResponse {
    pub event: FloodEvent,
    pub factors: RiskFactors,
    pub alert: AlertStatus,
}

/// Evaluate, record, and alert when severity is High or Critical
pub async fn create_flood_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateFloodEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let location = Location::new(request.latitude, request.longitude)?;
    let mut evaluation = EvaluationRequest::new(location).with_name(request.location_name.clone());
    if let Some(mm) = request.rainfall_mm {
        evaluation = evaluation.with_rainfall(mm)?;
    }
    if let Some(m) = request.elevation_m {
        evaluation = evaluation.with_elevation(m)?;
    }

    let result = state.pipeline.evaluate(&evaluation).await;
    let event = state.events.record(
        request.location_name,
        location,
        request.description,
        &result.assessment,
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateFloodEventResponse {
            event,
            factors: result.assessment.factors,
            alert: result.alert,
        }),
    ))
}

#[derive(Deserialize)]
pub struct ListEventsParams {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub severity: Option<String>,
}

fn default_limit() -> usize {
    100
}

fn check_limit(limit: usize) -> Result<usize, ApiError> {
    if (1..=MAX_PAGE_SIZE).contains(&limit) {
        Ok(limit)
    } else {
        Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )))
    }
}

pub async fn list_flood_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListEventsParams>,
) -> Result<Json<Vec<FloodEvent>>, ApiError> {
    let limit = check_limit(params.limit)?;
    let severity = params
        .severity
        .as_deref()
        .map(str::parse::<Severity>)
        .transpose()?;

    Ok(Json(state.events.list(params.skip, limit, severity)))
}

pub async fn get_flood_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<FloodEvent>, ApiError> {
    state
        .events
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Flood event not found".to_string()))
}

pub async fn delete_flood_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .events
        .delete(id)
        .ok_or_else(|| ApiError::NotFound("Flood event not found".to_string()))?;

    Ok(Json(MessageResponse {
        message: "Flood event deleted successfully".to_string(),
        detail: Some(format!("Deleted flood event with ID {}", id)),
    }))
}

#[derive(Deserialize)]
pub struct NearbyParams {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius_km: f64,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_KM
}

fn check_api_radius(radius_km: f64) -> Result<f64, ApiError> {
    if (MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&radius_km) {
        Ok(radius_km)
    } else {
        Err(ValidationError::Radius(radius_km).into())
    }
}

pub async fn nearby_flood_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<Vec<FloodEvent>>, ApiError> {
    let center = Location::new(params.latitude, params.longitude)?;
    let radius_km = check_api_radius(params.radius_km)?;
    Ok(Json(state.events.nearby(center, radius_km)))
}

// ============================================================================
// Subscriptions
// ============================================================================

#[derive(Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius_km: f64,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

fn default_min_severity() -> Severity {
    Severity::Medium
}

pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let channels = ContactChannels::new(request.email, request.phone)?;
    let location = Location::new(request.latitude, request.longitude)?;
    let radius_km = check_api_radius(request.radius_km)?;

    let subscription = state
        .subscriptions
        .create(location, radius_km, request.min_severity, channels)?;

    tracing::info!(
        subscription_id = subscription.id,
        location = %subscription.location,
        radius_km = subscription.radius_km,
        "Subscription created"
    );

    // confirmation is best-effort and must not delay the response
    if let Some(email) = subscription.channels.email.clone() {
        let pipeline = Arc::clone(&state.pipeline);
        let message = confirmation_email(&subscription);
        tokio::spawn(async move {
            if let Err(e) = pipeline.dispatcher().send_email(&email, &message).await {
                tracing::warn!(recipient = %email, error = %e, "Confirmation email not sent");
            }
        });
    }

    Ok((StatusCode::CREATED, Json(subscription)))
}

#[derive(Deserialize)]
pub struct ListSubscriptionsParams {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_active_only() -> bool {
    true
}

pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSubscriptionsParams>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    let limit = check_limit(params.limit)?;
    Ok(Json(
        state
            .subscriptions
            .list(params.active_only, params.skip, limit),
    ))
}

pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Subscription>, ApiError> {
    state
        .subscriptions
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Subscription not found".to_string()))
}

#[derive(Deserialize)]
pub struct UpdateSubscriptionRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub min_severity: Option<Severity>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> Result<Json<Subscription>, ApiError> {
    let existing = state
        .subscriptions
        .get(id)
        .ok_or_else(|| ApiError::NotFound("Subscription not found".to_string()))?;

    let location = match (request.latitude, request.longitude) {
        (None, None) => None,
        (lat, lon) => Some(Location::new(
            lat.unwrap_or(existing.location.latitude()),
            lon.unwrap_or(existing.location.longitude()),
        )?),
    };

    let update = SubscriptionUpdate {
        email: request.email,
        phone: request.phone,
        location,
        radius_km: request.radius_km.map(check_api_radius).transpose()?,
        min_severity: request.min_severity,
        active: request.is_active,
    };

    state
        .subscriptions
        .update(id, update)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Subscription not found".to_string()))
}

pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .subscriptions
        .delete(id)
        .ok_or_else(|| ApiError::NotFound("Subscription not found".to_string()))?;

    Ok(Json(MessageResponse {
        message: "Successfully unsubscribed from alerts".to_string(),
        detail: Some(format!("Deleted subscription ID {}", id)),
    }))
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Serialize)]
pub struct NotificationResult {
    pub sms_sent: usize,
    pub sms_failed: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub message: String,
}

/// Re-run matching and dispatch for a recorded event
pub async fn send_alert(
    State(state): State<Arc<AppState>>,
    Path(flood_id): Path<u64>,
) -> Result<Json<NotificationResult>, ApiError> {
    let event = state
        .events
        .get(flood_id)
        .ok_or_else(|| ApiError::NotFound("Flood event not found".to_string()))?;

    let content = AlertContent::new(
        event.location_name,
        event.severity,
        event.risk_score,
        event.location,
    );

    match state.pipeline.alert(&content).await {
        AlertStatus::Dispatched { matched, outcome } => Ok(Json(NotificationResult {
            sms_sent: outcome.sent(Channel::Sms),
            sms_failed: outcome.failed(Channel::Sms),
            emails_sent: outcome.sent(Channel::Email),
            emails_failed: outcome.failed(Channel::Email),
            message: if matched == 0 {
                "No subscriptions found for this location".to_string()
            } else {
                format!("Notified {} subscriptions", matched)
            },
        })),
        AlertStatus::StoreUnavailable { error } => Err(ApiError::Unavailable(error)),
        AlertStatus::NotRequired => Ok(Json(NotificationResult {
            sms_sent: 0,
            sms_failed: 0,
            emails_sent: 0,
            emails_failed: 0,
            message: format!("{} severity is below the alert threshold", content.severity),
        })),
    }
}

#[derive(Deserialize)]
pub struct TestNotificationRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct TestNotificationResponse {
    pub message: &'static str,
    pub results: TestNotificationResult,
}

pub async fn test_notifications(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TestNotificationRequest>,
) -> Result<Json<TestNotificationResponse>, ApiError> {
    let channels = ContactChannels::new(request.email, request.phone).map_err(|_| {
        ApiError::BadRequest("Provide at least one valid contact method to test".to_string())
    })?;

    let results = state
        .pipeline
        .dispatcher()
        .send_test(channels.phone.as_deref(), channels.email.as_deref())
        .await;

    Ok(Json(TestNotificationResponse {
        message: "Test notifications sent",
        results,
    }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub detail: Option<String>,
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
