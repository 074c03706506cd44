use crate::api::errors::ApiError;
use crate::api::{analytics, health};
use crate::config::{Config, EnvironmentSummary};
use crate::gateway::Gateway;
use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Response, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Slack on top of the provider timeout before the whole request is cut off.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Shared application state for all handlers.
pub struct AppState {
    pub gateway: Gateway,
    pub environment: EnvironmentSummary,
    pub production: bool,
    pub dashboard_origins: Vec<String>,
    pub request_timeout: Duration,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Gateway, config: &Config) -> Self {
        Self {
            gateway,
            environment: config.environment_summary(),
            production: config.is_production(),
            dashboard_origins: config.dashboard_origins.clone(),
            request_timeout: Duration::from_secs(config.provider_timeout_secs)
                + REQUEST_TIMEOUT_SLACK,
            started_at: Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let analytics_routes = Router::new()
        .route("/realtime", get(analytics::get_realtime))
        .route("/visitors", get(analytics::get_visitors))
        .route("/pageviews", get(analytics::get_page_views))
        .route("/devices", get(analytics::get_devices))
        .route("/traffic-sources", get(analytics::get_traffic_sources))
        .route(
            "/traffic-sources/detailed",
            get(analytics::get_detailed_sources),
        )
        .route("/metrics", get(analytics::get_key_metrics));

    let api_routes = Router::new()
        .route("/health", get(health::get_health))
        .nest("/analytics", analytics_routes);

    Router::new()
        .route("/", get(health::get_info))
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(PanicResponder {
            expose: !state.production,
        }))
        .layer(CompressionLayer::new())
        .layer(build_dashboard_cors(&state.dashboard_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

/// Converts handler panics into a 500 `ApiError`.
#[derive(Debug, Clone, Copy)]
struct PanicResponder {
    expose: bool,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let message = err
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| err.downcast_ref::<&str>().map(|s| (*s).to_string()))
            .unwrap_or_else(|| "handler panicked".to_string());
        ApiError::Internal {
            message,
            expose: self.expose,
        }
        .into_response()
    }
}

/// Read-only CORS for the dashboard; any origin when none are configured.
fn build_dashboard_cors(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        return base.allow_origin(AnyOrigin);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid dashboard origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}
