use crate::model::{Family, FamilyData};
use crate::query::window::{RangeToken, TimeWindow};
use crate::server::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for windowed analytics endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub range: Option<String>,
}

impl RangeParams {
    /// Unparseable query strings behave like an absent `range`.
    fn from_query(params: Result<Query<Self>, QueryRejection>) -> Self {
        params.map(|Query(p)| p).unwrap_or_default()
    }

    pub fn token(&self) -> RangeToken {
        RangeToken::parse_or_default(self.range.as_deref())
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::for_token(self.token())
    }
}

async fn serve(state: &AppState, family: Family, window: Option<TimeWindow>) -> Json<FamilyData> {
    Json(state.gateway.fetch(family, window).await.data)
}

async fn serve_windowed(
    state: &AppState,
    family: Family,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Json<FamilyData> {
    let window = RangeParams::from_query(params).window();
    serve(state, family, Some(window)).await
}

/// GET /api/analytics/realtime
pub async fn get_realtime(State(state): State<Arc<AppState>>) -> Json<FamilyData> {
    serve(&state, Family::Realtime, None).await
}

/// GET /api/analytics/visitors?range=
pub async fn get_visitors(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Json<FamilyData> {
    serve_windowed(&state, Family::VisitorTrend, params).await
}

/// GET /api/analytics/pageviews?range=
pub async fn get_page_views(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Json<FamilyData> {
    serve_windowed(&state, Family::PageViews, params).await
}

/// GET /api/analytics/devices?range=
pub async fn get_devices(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Json<FamilyData> {
    serve_windowed(&state, Family::Devices, params).await
}

/// GET /api/analytics/traffic-sources?range=
pub async fn get_traffic_sources(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Json<FamilyData> {
    serve_windowed(&state, Family::TrafficSources, params).await
}

/// GET /api/analytics/traffic-sources/detailed?range=
pub async fn get_detailed_sources(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Json<FamilyData> {
    serve_windowed(&state, Family::DetailedTrafficSources, params).await
}

/// GET /api/analytics/metrics?range=
pub async fn get_key_metrics(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Json<FamilyData> {
    serve_windowed(&state, Family::KeyMetrics, params).await
}
