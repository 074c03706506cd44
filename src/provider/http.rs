//! JSON-over-HTTP provider adapter.
//!
//! Speaks the provider's `runReport` / `runRealtimeReport` wire format and
//! maps every failure (transport, HTTP status, error envelope) onto
//! `ProviderError` so the gateway can classify it.

use super::error::{ErrorCode, ProviderError};
use super::{ProviderClient, ReportResponse, ReportRow};
use crate::config::ProviderCredentials;
use crate::query::report::{OrderBy, ReportRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    date_ranges: Vec<WireDateRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dimensions: Vec<WireName<'a>>,
    metrics: Vec<WireName<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    order_bys: Vec<WireOrderBy<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDateRange {
    start_date: String,
    end_date: String,
}

#[derive(Serialize)]
struct WireName<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireOrderBy<'a> {
    Dimension {
        dimension: WireDimensionOrder<'a>,
    },
    Metric {
        metric: WireMetricOrder<'a>,
        desc: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDimensionOrder<'a> {
    dimension_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireMetricOrder<'a> {
    metric_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    rows: Vec<WireRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRow {
    #[serde(default)]
    dimension_values: Vec<WireValue>,
    #[serde(default)]
    metric_values: Vec<WireValue>,
}

#[derive(Deserialize)]
struct WireValue {
    #[serde(default)]
    value: String,
}

/// Provider error envelope:
/// `{"error": {"code": 403, "message": "...", "status": "PERMISSION_DENIED"}}`.
#[derive(Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl<'a> WireRequest<'a> {
    fn from_request(request: &'a ReportRequest) -> Self {
        let order_bys = request
            .order_by
            .as_ref()
            .map(|order| match order {
                OrderBy::Dimension { name } => WireOrderBy::Dimension {
                    dimension: WireDimensionOrder {
                        dimension_name: name,
                    },
                },
                OrderBy::MetricDesc { name } => WireOrderBy::Metric {
                    metric: WireMetricOrder { metric_name: name },
                    desc: true,
                },
            })
            .into_iter()
            .collect();

        Self {
            date_ranges: request
                .date_range
                .iter()
                .map(|w| WireDateRange {
                    start_date: w.start_date.to_string(),
                    end_date: w.end_date.to_string(),
                })
                .collect(),
            dimensions: request
                .dimensions
                .iter()
                .map(|name| WireName { name })
                .collect(),
            metrics: request.metrics.iter().map(|name| WireName { name }).collect(),
            order_bys,
            limit: request.limit,
        }
    }
}

/// Reporting client that talks to the provider over HTTPS.
///
/// Authenticates with the service identity and secret as HTTP basic
/// credentials and scopes billing with the `x-project-id` header. The
/// per-call timeout is enforced by the underlying `reqwest::Client`.
///
/// No OAuth token exchange is performed, so the public Google endpoint
/// rejects these requests. Point `provider_endpoint` at a compatible
/// proxy or gateway that accepts basic credentials.
pub struct HttpReportClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: ProviderCredentials,
}

impl HttpReportClient {
    pub fn new(
        endpoint: &str,
        credentials: ProviderCredentials,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("analytics-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::new(
                    ErrorCode::Transport,
                    format!("failed to build HTTP client: {e}"),
                )
            })?;
        Ok(Self::with_client(http, endpoint, credentials))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        endpoint: &str,
        credentials: ProviderCredentials,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/properties/{}:{method}",
            self.endpoint, self.credentials.property_id
        )
    }

    async fn post(
        &self,
        method: &str,
        request: &ReportRequest,
    ) -> Result<ReportResponse, ProviderError> {
        let url = self.method_url(method);
        tracing::debug!(url = %url, "provider request");

        let response = self
            .http
            .post(&url)
            .basic_auth(
                &self.credentials.client_email,
                Some(&self.credentials.private_key),
            )
            .header("x-project-id", &self.credentials.project_id)
            .json(&WireRequest::from_request(request))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), &body));
        }

        let wire: WireResponse = response.json().await.map_err(map_reqwest_error)?;
        Ok(ReportResponse {
            rows: wire
                .rows
                .into_iter()
                .map(|row| ReportRow {
                    dimension_values: row.dimension_values.into_iter().map(|v| v.value).collect(),
                    metric_values: row.metric_values.into_iter().map(|v| v.value).collect(),
                })
                .collect(),
        })
    }
}

#[async_trait]
impl ProviderClient for HttpReportClient {
    async fn run_report(&self, request: &ReportRequest) -> Result<ReportResponse, ProviderError> {
        self.post("runReport", request).await
    }

    async fn run_realtime_report(
        &self,
        request: &ReportRequest,
    ) -> Result<ReportResponse, ProviderError> {
        self.post("runRealtimeReport", request).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    let code = if err.is_timeout() {
        ErrorCode::DeadlineExceeded
    } else {
        ErrorCode::Transport
    };
    ProviderError::new(code, err.to_string())
}

/// Classify a non-2xx response, preferring the envelope's status string over
/// the HTTP status code.
fn error_from_body(http_status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<WireErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = envelope
                .error
                .status
                .as_deref()
                .and_then(ErrorCode::from_status)
                .unwrap_or_else(|| ErrorCode::from_http_status(http_status));
            let message = if envelope.error.message.is_empty() {
                format!("provider returned HTTP {http_status}")
            } else {
                envelope.error.message
            };
            ProviderError::new(code, message)
        }
        Err(_) => ProviderError::new(
            ErrorCode::from_http_status(http_status),
            format!("provider returned HTTP {http_status}"),
        ),
    }
}
