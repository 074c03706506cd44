use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Every route the relay serves, listed in 404 bodies.
pub const AVAILABLE_ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /api/health",
    "GET /api/analytics/realtime",
    "GET /api/analytics/visitors?range=",
    "GET /api/analytics/pageviews?range=",
    "GET /api/analytics/devices?range=",
    "GET /api/analytics/traffic-sources?range=",
    "GET /api/analytics/traffic-sources/detailed?range=",
    "GET /api/analytics/metrics?range=",
];

/// API error type with HTTP status code mapping.
///
/// Analytics routes never produce these; only unknown routes and
/// unexpected failures inside the server do.
#[derive(Debug)]
pub enum ApiError {
    NotFound { method: String, path: String },
    /// `expose` controls whether `message` reaches the client.
    Internal { message: String, expose: bool },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { method, path } => write!(f, "Route {method} {path} not found"),
            Self::Internal { message, .. } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NotFound { method, path } => (
                StatusCode::NOT_FOUND,
                serde_json::json!({
                    "error": self.to_string(),
                    "method": method,
                    "path": path,
                    "availableEndpoints": AVAILABLE_ENDPOINTS,
                }),
            ),
            Self::Internal { message, expose } => {
                tracing::error!(error = %message, "Internal server error");
                let detail = if *expose {
                    message.clone()
                } else {
                    "Something went wrong".to_string()
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({
                        "error": "Internal server error",
                        "message": detail,
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
