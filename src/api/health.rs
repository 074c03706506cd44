use crate::api::errors::AVAILABLE_ENDPOINTS;
use crate::config::EnvironmentSummary;
use crate::provider::error::FailureRecord;
use crate::server::AppState;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Body of `GET /api/health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub provider_connected: bool,
    pub timestamp: DateTime<Utc>,
    pub environment_summary: EnvironmentSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<FailureRecord>,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// GET /api/health: always 200; provider trouble is reported in the body.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let health = state.gateway.health();
    Json(HealthReport {
        status: "OK",
        provider_connected: health.connected(),
        timestamp: health.timestamp,
        environment_summary: state.environment.clone(),
        provider_error: health.last_error,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// GET /: service name, version and routes.
pub async fn get_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": AVAILABLE_ENDPOINTS,
    }))
}
