use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    calculate_risk, create_flood_event, delete_flood_event, delete_subscription,
    get_flood_event, get_subscription, health_check, list_flood_events, list_subscriptions,
    nearby_flood_events, send_alert, subscribe, test_notifications, update_subscription,
    AppState,
};
use crate::config::FloodConfig;
use crate::pipeline::FloodPipeline;
use crate::store::{EventLog, SubscriptionRegistry};

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Flood events
        .route("/floods/calculate-risk", post(calculate_risk))
        .route("/floods", get(list_flood_events).post(create_flood_event))
        .route("/floods/nearby", get(nearby_flood_events))
        .route(
            "/floods/:id",
            get(get_flood_event).delete(delete_flood_event),
        )
        // Subscriptions
        .route("/notifications/subscribe", post(subscribe))
        .route("/notifications/subscriptions", get(list_subscriptions))
        .route(
            "/notifications/subscriptions/:id",
            get(get_subscription)
                .put(update_subscription)
                .delete(delete_subscription),
        )
        // Alerting
        .route("/notifications/send-alert/:flood_id", post(send_alert))
        .route("/notifications/test", post(test_notifications))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: FloodConfig) -> Result<(), Box<dyn std::error::Error>> {
    let subscriptions = Arc::new(SubscriptionRegistry::new());
    let events = Arc::new(EventLog::new());
    let pipeline = Arc::new(FloodPipeline::from_config(
        &config,
        Arc::clone(&subscriptions) as _,
    )?);

    let state = Arc::new(AppState {
        pipeline,
        subscriptions,
        events,
    });

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting floodwatch server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("floodwatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
}
