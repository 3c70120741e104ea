//! Process configuration read from the environment
//!
//! Missing provider credentials are not an error: the affected stage
//! degrades to its fallback (mock elevation, default rainfall, or counted
//! delivery failures).

use std::time::Duration;

use crate::alerts::email::DEFAULT_MAIL_API_URL;
use crate::alerts::sms::TWILIO_BASE_URL;
use crate::environment::elevation::GOOGLE_ELEVATION_BASE_URL;
use crate::environment::weather::OPENWEATHERMAP_BASE_URL;
use crate::provider::DEFAULT_PROVIDER_TIMEOUT;

/// Twilio account used for SMS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// HTTP mail relay used for email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailCredentials {
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct FloodConfig {
    pub host: String,
    pub port: u16,
    pub openweathermap_api_key: Option<String>,
    pub openweathermap_base_url: String,
    pub google_elevation_api_key: Option<String>,
    pub google_elevation_base_url: String,
    pub twilio: Option<TwilioCredentials>,
    pub twilio_base_url: String,
    pub mail: Option<MailCredentials>,
    /// Bound on every outbound provider call
    pub provider_timeout: Duration,
    /// Max in-flight sends per channel
    pub dispatch_concurrency: usize,
    pub elevation_cache_size: u64,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            openweathermap_api_key: None,
            openweathermap_base_url: OPENWEATHERMAP_BASE_URL.to_string(),
            google_elevation_api_key: None,
            google_elevation_base_url: GOOGLE_ELEVATION_BASE_URL.to_string(),
            twilio: None,
            twilio_base_url: TWILIO_BASE_URL.to_string(),
            mail: None,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            dispatch_concurrency: 8,
            elevation_cache_size: 10_000,
        }
    }
}

impl FloodConfig {
    /// Read configuration from environment variables
    ///
    /// FLOODWATCH_HOST=0.0.0.0
    /// FLOODWATCH_PORT=8000
    /// OPENWEATHERMAP_API_KEY, GOOGLE_ELEVATION_API_KEY
    /// TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_PHONE_NUMBER
    /// MAIL_API_KEY, MAIL_FROM, MAIL_API_URL=https://api.resend.com/emails
    /// FLOODWATCH_PROVIDER_TIMEOUT_SECS=10
    /// FLOODWATCH_DISPATCH_CONCURRENCY=8
    /// FLOODWATCH_ELEVATION_CACHE_SIZE=10000
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secret = |key: &str| lookup(key).and_then(credential);
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let twilio = match (
            secret("TWILIO_ACCOUNT_SID"),
            secret("TWILIO_AUTH_TOKEN"),
            secret("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioCredentials {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let mail = match (secret("MAIL_API_KEY"), secret("MAIL_FROM")) {
            (Some(api_key), Some(from_address)) => Some(MailCredentials {
                api_url: lookup("MAIL_API_URL")
                    .and_then(credential)
                    .unwrap_or_else(|| DEFAULT_MAIL_API_URL.to_string()),
                api_key,
                from_address,
            }),
            _ => None,
        };

        Self {
            host: lookup("FLOODWATCH_HOST").unwrap_or(defaults.host),
            port: lookup("FLOODWATCH_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            openweathermap_api_key: secret("OPENWEATHERMAP_API_KEY"),
            openweathermap_base_url: lookup("OPENWEATHERMAP_BASE_URL")
                .unwrap_or(defaults.openweathermap_base_url),
            google_elevation_api_key: secret("GOOGLE_ELEVATION_API_KEY"),
            google_elevation_base_url: lookup("GOOGLE_ELEVATION_BASE_URL")
                .unwrap_or(defaults.google_elevation_base_url),
            twilio,
            twilio_base_url: lookup("TWILIO_BASE_URL").unwrap_or(defaults.twilio_base_url),
            mail,
            provider_timeout: parsed("FLOODWATCH_PROVIDER_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            dispatch_concurrency: parsed("FLOODWATCH_DISPATCH_CONCURRENCY")
                .filter(|n| *n > 0)
                .map(|n| n as usize)
                .unwrap_or(defaults.dispatch_concurrency),
            elevation_cache_size: parsed("FLOODWATCH_ELEVATION_CACHE_SIZE")
                .unwrap_or(defaults.elevation_cache_size),
        }
    }
}

/// Treat blank values and template placeholders (`your_..._here`) as absent
fn credential(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with("your_") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
