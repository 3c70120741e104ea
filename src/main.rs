//! Floodwatch Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - FLOODWATCH_HOST: Bind address (default: 0.0.0.0)
//! - FLOODWATCH_PORT: Port number (default: 8000)
//! - FLOODWATCH_PROVIDER_TIMEOUT_SECS: Bound on each provider call (default: 10)
//! - FLOODWATCH_DISPATCH_CONCURRENCY: In-flight sends per channel (default: 8)
//! - FLOODWATCH_ELEVATION_CACHE_SIZE: Cached provider elevations (default: 10000)
//! - OPENWEATHERMAP_API_KEY, GOOGLE_ELEVATION_API_KEY: Environmental data
//! - TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_PHONE_NUMBER: SMS alerts
//! - MAIL_API_KEY, MAIL_FROM: Email alerts (MAIL_API_URL overrides the relay endpoint)
//! - RUST_LOG: Log level (default: info)
//!
//! Any provider left unconfigured falls back to defaults (rainfall, elevation)
//! or counts its deliveries as failed (SMS, email).

use floodwatch::api::run_server;
use floodwatch::FloodConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floodwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = FloodConfig::from_env();

    tracing::info!("Floodwatch configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!(
        "  Provider timeout: {} seconds",
        config.provider_timeout.as_secs_f64()
    );
    tracing::info!("  Dispatch concurrency: {}", config.dispatch_concurrency);
    tracing::info!("  Elevation cache size: {}", config.elevation_cache_size);
    tracing::info!(
        "  Weather provider: {}",
        enabled(config.openweathermap_api_key.is_some())
    );
    tracing::info!(
        "  Elevation provider: {}",
        enabled(config.google_elevation_api_key.is_some())
    );
    tracing::info!("  SMS (Twilio): {}", enabled(config.twilio.is_some()));
    tracing::info!("  Email relay: {}", enabled(config.mail.is_some()));

    run_server(config).await
}

fn enabled(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "DISABLED (fallback)"
    }
}
