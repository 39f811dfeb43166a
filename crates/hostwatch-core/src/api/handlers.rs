//! API handlers for the HTTP REST API

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::alerts::AlertStore;
use crate::cache::RecentMetricsCache;
use crate::error::Error;
use crate::ingest::{HeartbeatPayload, HeartbeatPipeline, LegacyHeartbeat, TenantRef, V2Heartbeat};
use crate::models::{Alert, HostMetrics};
use crate::store::{StoreError, TimeSeriesStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<HeartbeatPipeline>,
    pub cache: Arc<RecentMetricsCache>,
    pub store: Arc<dyn TimeSeriesStore>,
    pub alerts: Arc<dyn AlertStore>,
}

/// Error envelope: every failure renders as `{"error": "..."}` with a
/// matching status code.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(Error::Store(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidState(_) => StatusCode::CONFLICT,
            Error::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }

        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cached_hosts: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_hosts: state.cache.host_count(),
    })
}

/// Heartbeat acknowledgment
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub success: bool,
    pub host_id: Uuid,
}

fn tenant_from_headers(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let raw = headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::validation("Missing x-tenant-id header"))?;

    Uuid::parse_str(raw)
        .map_err(|_| Error::validation(format!("Invalid tenant id: {raw}")).into())
}

/// Legacy (v1) heartbeat: tenant from the `x-tenant-id` header
pub async fn heartbeat_v1(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LegacyHeartbeat>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let tenant_id = tenant_from_headers(&headers)?;
    let host_id = state
        .pipeline
        .ingest(TenantRef::Id(tenant_id), HeartbeatPayload::Legacy(body))
        .await?;

    Ok(Json(HeartbeatResponse {
        success: true,
        host_id,
    }))
}

/// v2 heartbeat: tenant slug in the body
pub async fn heartbeat_v2(
    State(state): State<AppState>,
    Json(body): Json<V2Heartbeat>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let slug = body.tenant.clone();
    let host_id = state
        .pipeline
        .ingest(TenantRef::Slug(slug), HeartbeatPayload::V2(body))
        .await?;

    Ok(Json(HeartbeatResponse {
        success: true,
        host_id,
    }))
}

/// Latest sample for a host: cache first, durable current slot second
pub async fn latest_metrics(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Result<Json<HostMetrics>, ApiError> {
    if let Some(sample) = state.cache.latest(&host_id) {
        return Ok(Json(sample));
    }

    match state.store.get_current(&host_id).await {
        Ok(Some(sample)) => Ok(Json(sample)),
        Ok(None) => Err(Error::not_found("Host metrics", host_id).into()),
        Err(e) => {
            warn!(host_id, error = %e, "Durable latest read failed");
            Err(Error::not_found("Host metrics", host_id).into())
        }
    }
}

/// Query parameters for history reads
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub limit: Option<usize>,
}

/// Metrics list response
#[derive(Serialize)]
pub struct MetricsResponse {
    pub metrics: Vec<HostMetrics>,
    pub count: usize,
}

impl From<Vec<HostMetrics>> for MetricsResponse {
    fn from(metrics: Vec<HostMetrics>) -> Self {
        let count = metrics.len();
        Self { metrics, count }
    }
}

const HISTORY_LIMIT_MAX: usize = 5000;

/// Historical samples for a host within a time range, oldest-first.
///
/// Falls back to the in-memory cache when the durable store is unreachable,
/// so a Redis outage degrades to recent data instead of an error.
pub async fn history_metrics(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let start = query.start.unwrap_or(0);
    let end = query.end.unwrap_or_else(|| Utc::now().timestamp_millis());
    let limit = query.limit.unwrap_or(1000).min(HISTORY_LIMIT_MAX);

    match state.store.range_history(&host_id, start, end, limit).await {
        Ok(metrics) => Ok(Json(metrics.into())),
        Err(e) => {
            warn!(host_id, error = %e, "Durable history read failed, serving cache");
            let metrics: Vec<HostMetrics> = state
                .cache
                .history(&host_id)
                .into_iter()
                .filter(|m| m.timestamp >= start && m.timestamp <= end)
                .take(limit)
                .collect();
            Ok(Json(metrics.into()))
        }
    }
}

/// Query parameters for recent reads
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub count: Option<usize>,
}

/// The last `count` samples for a host, newest-first
pub async fn recent_metrics(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let count = query.count.unwrap_or(10).min(HISTORY_LIMIT_MAX);

    match state.store.recent_history(&host_id, count).await {
        Ok(metrics) => Ok(Json(metrics.into())),
        Err(e) => {
            warn!(host_id, error = %e, "Durable recent read failed, serving cache");
            let mut metrics = state.cache.history(&host_id);
            metrics.reverse();
            metrics.truncate(count);
            Ok(Json(metrics.into()))
        }
    }
}

/// Drop all recorded metrics for a host, durable and cached
pub async fn delete_host_metrics(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_host(&host_id).await?;
    state.cache.remove_host(&host_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for listing alerts
#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub limit: Option<i64>,
}

/// Alert list response
#[derive(Serialize)]
pub struct ListAlertsResponse {
    pub alerts: Vec<Alert>,
    pub count: usize,
}

/// Recent alerts for the tenant identified by the `x-tenant-id` header
pub async fn list_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<ListAlertsResponse>, ApiError> {
    let tenant_id = tenant_from_headers(&headers)?;
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let alerts = state.alerts.list_alerts(tenant_id, limit).await?;
    let count = alerts.len();
    Ok(Json(ListAlertsResponse { alerts, count }))
}

/// `active → acknowledged`
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Alert>, ApiError> {
    let alert = state.alerts.acknowledge_alert(id).await?;
    Ok(Json(alert))
}

/// `active|acknowledged → resolved`
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Alert>, ApiError> {
    let alert = state.alerts.resolve_alert(id).await?;
    Ok(Json(alert))
}
