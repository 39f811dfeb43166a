//! API routes

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Heartbeats
        .route("/api/v1/heartbeat", post(handlers::heartbeat_v1))
        .route("/api/v2/heartbeat", post(handlers::heartbeat_v2))
        // Metrics reads
        .route(
            "/api/v1/hosts/:host_id/metrics/latest",
            get(handlers::latest_metrics),
        )
        .route(
            "/api/v1/hosts/:host_id/metrics/history",
            get(handlers::history_metrics),
        )
        .route(
            "/api/v1/hosts/:host_id/metrics/recent",
            get(handlers::recent_metrics),
        )
        .route(
            "/api/v1/hosts/:host_id/metrics",
            delete(handlers::delete_host_metrics),
        )
        // Alerts
        .route("/api/v1/alerts", get(handlers::list_alerts))
        .route(
            "/api/v1/alerts/:id/acknowledge",
            post(handlers::acknowledge_alert),
        )
        .route("/api/v1/alerts/:id/resolve", post(handlers::resolve_alert))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
