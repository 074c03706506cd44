use analytics_relay::client::DashboardClient;
use analytics_relay::config::Config;
use analytics_relay::gateway::Gateway;
use analytics_relay::live::{LiveView, REALTIME_PERIOD};
use analytics_relay::model::SeriesPoint;
use analytics_relay::provider::ProviderHandle;
use analytics_relay::query::window::RangeToken;
use analytics_relay::server::{build_router, AppState};
use analytics_relay::synth::DASHBOARD;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_partial_transport_failure_still_fills_every_field() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/api/health",
        serde_json::json!({ "status": "OK", "providerConnected": true }),
    )
    .await;
    mount_json(
        &server,
        "/api/analytics/realtime",
        serde_json::json!([{ "page": "/", "activeVisitors": 3, "recencyLabel": "Live" }]),
    )
    .await;
    mount_json(
        &server,
        "/api/analytics/visitors",
        serde_json::json!([{ "label": "Mon", "value": 1 }]),
    )
    .await;
    mount_json(
        &server,
        "/api/analytics/pageviews",
        serde_json::json!([{ "label": "Home", "value": 9 }]),
    )
    .await;
    mount_json(
        &server,
        "/api/analytics/traffic-sources",
        serde_json::json!([
            { "label": "Direct", "value": 100, "category": "Direct", "icon": "🔗" }
        ]),
    )
    .await;
    mount_json(
        &server,
        "/api/analytics/metrics",
        serde_json::json!({
            "totalVisitors": "12",
            "pageViews": "30",
            "avgSessionDuration": "0m 45s",
            "bounceRate": "40.0%",
            "changeDeltas": {
                "visitors": "+0.0%",
                "pageViews": "+0.0%",
                "duration": "+0.0%",
                "bounceRate": "+0.0%"
            }
        }),
    )
    .await;
    mount_status(&server, "/api/analytics/devices", 500).await;
    mount_status(&server, "/api/analytics/traffic-sources/detailed", 502).await;

    let client =
        DashboardClient::new(format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap();
    let view = LiveView::mount(Arc::new(client), RangeToken::Week, REALTIME_PERIOD).await;
    let state = view.snapshot();

    assert!(state.error.is_none());
    assert!(state.is_live);
    assert!(state.is_provider_connected);

    // Forwarded
    assert_eq!(state.visitor_trend, vec![SeriesPoint::new("Mon", 1)]);
    assert_eq!(state.page_views, vec![SeriesPoint::new("Home", 9)]);
    assert_eq!(state.realtime[0].active_visitors, 3);
    assert_eq!(state.traffic_sources[0].label, "Direct");
    assert_eq!(state.key_metrics.as_ref().unwrap().total_visitors, "12");

    // Local fallback
    assert_eq!(state.devices.len(), DASHBOARD.devices.len());
    assert_eq!(state.detailed_sources.len(), DASHBOARD.detailed.len());

    view.unmount();
}

#[tokio::test]
async fn test_unreachable_relay_renders_with_banner() {
    let client = DashboardClient::new("http://127.0.0.1:1/api", Duration::from_secs(2)).unwrap();
    let view = LiveView::mount(Arc::new(client), RangeToken::Month, REALTIME_PERIOD).await;
    let state = view.snapshot();

    assert!(state.error.as_deref().unwrap().starts_with("Server: "));
    assert!(!state.is_live);
    assert!(!state.is_provider_connected);
    assert!(state.key_metrics.is_some());
    assert_eq!(state.visitor_trend.len(), 7);
    assert!(!state.realtime.is_empty());
    view.unmount();
}

#[tokio::test]
async fn test_against_running_relay() {
    let state = Arc::new(AppState::new(
        Gateway::new(ProviderHandle::unconfigured(), Duration::from_secs(5)),
        &Config::default(),
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    let client =
        DashboardClient::new(format!("http://{addr}/api"), Duration::from_secs(5)).unwrap();
    let view = LiveView::mount(Arc::new(client), RangeToken::Day, REALTIME_PERIOD).await;
    let snapshot = view.snapshot();

    assert!(snapshot.error.is_none());
    assert!(snapshot.is_live);
    assert!(!snapshot.is_provider_connected);
    assert_eq!(snapshot.visitor_trend.len(), 7);
    assert!(snapshot.visitor_trend.iter().all(|p| (500..=1300).contains(&p.value)));
    view.unmount();
}
