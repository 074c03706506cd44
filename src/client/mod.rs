//! Dashboard-side client for the relay's HTTP surface.
//!
//! One method per family, one GET each. Any transport failure, non-2xx
//! status or undecodable body is logged and answered with locally
//! synthesized data, so callers always get a usable dataset.

use crate::model::{CategoryShare, DetailedSource, KeyMetrics, RealtimePage, SeriesPoint};
use crate::query::window::RangeToken;
use crate::synth::DASHBOARD;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure of a dashboard → relay call.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("invalid response body from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Ok,
    Error,
}

/// Classified provider failure as reported by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFault {
    pub code: String,
    pub message: String,
}

/// Normalized result of a health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub status: HealthState,
    pub provider_connected: bool,
    /// Why the relay could not be reached; set only when `status` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<ProviderFault>,
}

impl HealthCheck {
    pub fn unreachable(err: &TransportError) -> Self {
        Self {
            status: HealthState::Error,
            provider_connected: false,
            error: Some(err.to_string()),
            provider_error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthState::Ok
    }
}

/// Health body as served by the relay; unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthBody {
    status: String,
    #[serde(default)]
    provider_connected: bool,
    #[serde(default)]
    provider_error: Option<ProviderFault>,
}

impl From<HealthBody> for HealthCheck {
    fn from(body: HealthBody) -> Self {
        let ok = body.status.eq_ignore_ascii_case("ok");
        Self {
            status: if ok { HealthState::Ok } else { HealthState::Error },
            provider_connected: ok && body.provider_connected,
            error: (!ok).then(|| format!("relay reported status {}", body.status)),
            provider_error: body.provider_error,
        }
    }
}

/// Everything the live view needs from the relay. None of these fail.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn realtime(&self) -> Vec<RealtimePage>;
    async fn visitor_trend(&self, range: RangeToken) -> Vec<SeriesPoint>;
    async fn page_views(&self, range: RangeToken) -> Vec<SeriesPoint>;
    async fn devices(&self, range: RangeToken) -> Vec<CategoryShare>;
    async fn traffic_sources(&self, range: RangeToken) -> Vec<CategoryShare>;
    async fn detailed_sources(&self, range: RangeToken) -> Vec<DetailedSource>;
    async fn key_metrics(&self, range: RangeToken) -> KeyMetrics;
    async fn check_health(&self) -> HealthCheck;
}

/// HTTP client for a relay rooted at `base` (e.g. `http://localhost:3001/api`).
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    base: String,
}

impl DashboardClient {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self::from_reqwest(http, base))
    }

    pub fn from_reqwest(http: reqwest::Client, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { http, base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        range: Option<RangeToken>,
    ) -> Result<T, TransportError> {
        let mut request = self.http.get(format!("{}{path}", self.base));
        if let Some(range) = range {
            request = request.query(&[("range", range.as_str())]);
        }

        let response = request.send().await.map_err(|source| TransportError::Request {
            path: path.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        response.json().await.map_err(|source| TransportError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn get_or_else<T: DeserializeOwned>(
        &self,
        path: &str,
        range: Option<RangeToken>,
        fallback: impl FnOnce() -> T + Send,
    ) -> T {
        match self.get_json(path, range).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path, error = %e, "Relay call failed; using local fallback");
                fallback()
            }
        }
    }
}

#[async_trait]
impl AnalyticsSource for DashboardClient {
    async fn realtime(&self) -> Vec<RealtimePage> {
        self.get_or_else("/analytics/realtime", None, || {
            DASHBOARD.realtime(&mut rand::rng())
        })
        .await
    }

    async fn visitor_trend(&self, range: RangeToken) -> Vec<SeriesPoint> {
        self.get_or_else("/analytics/visitors", Some(range), || {
            DASHBOARD.visitor_trend(&mut rand::rng())
        })
        .await
    }

    async fn page_views(&self, range: RangeToken) -> Vec<SeriesPoint> {
        self.get_or_else("/analytics/pageviews", Some(range), || {
            DASHBOARD.page_views(&mut rand::rng())
        })
        .await
    }

    async fn devices(&self, range: RangeToken) -> Vec<CategoryShare> {
        self.get_or_else("/analytics/devices", Some(range), || {
            DASHBOARD.devices(&mut rand::rng())
        })
        .await
    }

    async fn traffic_sources(&self, range: RangeToken) -> Vec<CategoryShare> {
        self.get_or_else("/analytics/traffic-sources", Some(range), || {
            DASHBOARD.traffic_sources(&mut rand::rng())
        })
        .await
    }

    async fn detailed_sources(&self, range: RangeToken) -> Vec<DetailedSource> {
        self.get_or_else("/analytics/traffic-sources/detailed", Some(range), || {
            DASHBOARD.detailed_sources(&mut rand::rng())
        })
        .await
    }

    async fn key_metrics(&self, range: RangeToken) -> KeyMetrics {
        self.get_or_else("/analytics/metrics", Some(range), || {
            DASHBOARD.key_metrics(&mut rand::rng())
        })
        .await
    }

    async fn check_health(&self) -> HealthCheck {
        match self.get_json::<HealthBody>("/health", None).await {
            Ok(body) => body.into(),
            Err(e) => {
                tracing::warn!(path = "/health", error = %e, "Relay health check failed");
                HealthCheck::unreachable(&e)
            }
        }
    }
}
