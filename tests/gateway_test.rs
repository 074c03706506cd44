use analytics_relay::config::Config;
use analytics_relay::gateway::Gateway;
use analytics_relay::provider::error::{ErrorCode, ProviderError};
use analytics_relay::provider::{ProviderClient, ProviderHandle, ReportResponse};
use analytics_relay::query::report::ReportRequest;
use analytics_relay::server::{build_router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct DeniedProvider;

#[async_trait]
impl ProviderClient for DeniedProvider {
    async fn run_report(&self, _: &ReportRequest) -> Result<ReportResponse, ProviderError> {
        Err(ProviderError::classified(
            "7 PERMISSION_DENIED: User does not have sufficient permissions for this property.",
        ))
    }

    async fn run_realtime_report(
        &self,
        request: &ReportRequest,
    ) -> Result<ReportResponse, ProviderError> {
        self.run_report(request).await
    }
}

fn make_test_state(provider: ProviderHandle) -> Arc<AppState> {
    Arc::new(AppState::new(
        Gateway::new(provider, Duration::from_secs(5)),
        &Config::default(),
    ))
}

async fn get_json(state: &Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_unconfigured_day_metrics() {
    let state = make_test_state(ProviderHandle::unconfigured());
    let (status, json) = get_json(&state, "/api/analytics/metrics?range=1d").await;

    assert_eq!(status, StatusCode::OK);
    for field in [
        "totalVisitors",
        "pageViews",
        "avgSessionDuration",
        "bounceRate",
    ] {
        assert!(!json[field].as_str().unwrap().is_empty(), "{field}");
    }
    for field in ["visitors", "pageViews", "duration", "bounceRate"] {
        let delta = json["changeDeltas"][field].as_str().unwrap();
        assert!(delta.starts_with('+') || delta.starts_with('-'), "{field}");
        assert!(delta.ends_with('%'), "{field}");
    }
}

#[tokio::test]
async fn test_permission_denied_falls_back_and_reports() {
    let state = make_test_state(ProviderHandle::ready(Arc::new(DeniedProvider)));

    let (_, health) = get_json(&state, "/api/health").await;
    assert_eq!(health["providerConnected"], true);

    let (status, json) = get_json(&state, "/api/analytics/visitors?range=30d").await;
    assert_eq!(status, StatusCode::OK);
    let points = json.as_array().unwrap();
    assert!(!points.is_empty() && points.len() <= 7);
    for point in points {
        assert!(point["label"].is_string());
        assert!(point["value"].is_u64());
    }

    let (_, health) = get_json(&state, "/api/health").await;
    assert_eq!(health["status"], "OK");
    assert_eq!(health["providerConnected"], false);
    assert_eq!(health["providerError"]["code"], "PERMISSION_DENIED");
    assert!(health["providerError"]["message"]
        .as_str()
        .unwrap()
        .contains("sufficient permissions"));
}

#[tokio::test]
async fn test_failing_and_unconfigured_serve_same_shapes() {
    let unconfigured = make_test_state(ProviderHandle::unconfigured());
    let failing = make_test_state(ProviderHandle::ready(Arc::new(DeniedProvider)));

    for path in [
        "/api/analytics/realtime",
        "/api/analytics/visitors",
        "/api/analytics/pageviews",
        "/api/analytics/devices",
        "/api/analytics/traffic-sources",
        "/api/analytics/traffic-sources/detailed",
        "/api/analytics/metrics",
    ] {
        let (_, a) = get_json(&unconfigured, path).await;
        let (_, b) = get_json(&failing, path).await;
        match (&a, &b) {
            (serde_json::Value::Array(x), serde_json::Value::Array(y)) => {
                assert_eq!(x.len(), y.len(), "{path}");
                let keys = |v: &serde_json::Value| {
                    v.as_object()
                        .map(|o| o.keys().cloned().collect::<Vec<_>>())
                        .unwrap_or_default()
                };
                assert_eq!(keys(&x[0]), keys(&y[0]), "{path}");
            }
            (serde_json::Value::Object(x), serde_json::Value::Object(y)) => {
                assert_eq!(
                    x.keys().collect::<Vec<_>>(),
                    y.keys().collect::<Vec<_>>(),
                    "{path}"
                );
            }
            _ => panic!("{path}: mismatched shapes {a} vs {b}"),
        }
    }
}

#[tokio::test]
async fn test_traffic_shares_bounded() {
    let state = make_test_state(ProviderHandle::unconfigured());
    for _ in 0..20 {
        let (_, json) = get_json(&state, "/api/analytics/traffic-sources").await;
        let total: u64 = json
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["value"].as_u64().unwrap())
            .sum();
        assert!(total <= 100, "shares sum to {total}");
    }
}
