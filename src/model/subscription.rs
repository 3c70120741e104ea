use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::{Location, Severity, ValidationError};

/// Contact endpoints of a subscriber. At least one must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactChannels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ContactChannels {
    pub fn new(email: Option<String>, phone: Option<String>) -> Result<Self, ValidationError> {
        let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        let phone = phone
            .map(|p| p.chars().filter(|c| !c.is_whitespace() && *c != '-').collect::<String>())
            .filter(|p| !p.is_empty());

        if email.is_none() && phone.is_none() {
            return Err(ValidationError::NoContact);
        }
        if let Some(ref e) = email {
            if !EMAIL_RE.is_match(e) {
                return Err(ValidationError::Email(e.clone()));
            }
        }
        if let Some(ref p) = phone {
            if !PHONE_RE.is_match(p) {
                return Err(ValidationError::Phone(p.clone()));
            }
        }

        Ok(Self { email, phone })
    }

    pub fn email(email: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Some(email.into()), None)
    }

    pub fn phone(phone: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(None, Some(phone.into()))
    }
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

// E.164, leading plus optional
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{6,14}$").expect("valid regex"));

/// A subscriber's monitored area, threshold and contacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub location: Location,
    pub radius_km: f64,
    pub min_severity: Severity,
    pub channels: ContactChannels,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Create an active subscription
    pub fn new(
        id: u64,
        location: Location,
        radius_km: f64,
        min_severity: Severity,
        channels: ContactChannels,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            location,
            radius_km: check_radius(radius_km)?,
            min_severity,
            channels,
            active: true,
            created_at: Utc::now(),
        })
    }

    /// Set active state
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

pub fn check_radius(radius_km: f64) -> Result<f64, ValidationError> {
    if radius_km.is_finite() && radius_km > 0.0 {
        Ok(radius_km)
    } else {
        Err(ValidationError::Radius(radius_km))
    }
}
