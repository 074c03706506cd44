//! Provider-client interface and the process-wide provider handle.

pub mod error;
pub mod http;

use crate::config::Config;
use crate::query::report::ReportRequest;
use crate::query::window::{RangeToken, TimeWindow};
use async_trait::async_trait;
use error::{ErrorCode, FailureRecord, ProviderError};
use std::sync::Arc;
use std::time::Duration;

/// One row of a provider report: dimension values then metric values, in
/// the order they were requested. Metric values arrive as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRow {
    pub dimension_values: Vec<String>,
    pub metric_values: Vec<String>,
}

impl ReportRow {
    pub fn dimension(&self, idx: usize) -> &str {
        self.dimension_values.get(idx).map_or("", String::as_str)
    }

    /// Metric value parsed as a float; missing or malformed values read as 0.
    pub fn metric_f64(&self, idx: usize) -> f64 {
        self.metric_values
            .get(idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    /// Metric value as a non-negative integer count.
    pub fn metric_u64(&self, idx: usize) -> u64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = self.metric_f64(idx).max(0.0).trunc() as u64;
        n
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportResponse {
    pub rows: Vec<ReportRow>,
}

/// The reporting operations the gateway needs from a provider.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn run_report(&self, request: &ReportRequest) -> Result<ReportResponse, ProviderError>;

    async fn run_realtime_report(
        &self,
        request: &ReportRequest,
    ) -> Result<ReportResponse, ProviderError>;
}

/// Immutable provider handle, built once at startup.
///
/// Either holds a verified client or records why there is none. Gateway
/// operations take this handle explicitly; it is never re-initialized.
#[derive(Clone)]
pub struct ProviderHandle {
    client: Option<Arc<dyn ProviderClient>>,
    init_error: Option<FailureRecord>,
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("configured", &self.is_configured())
            .field("init_error", &self.init_error)
            .finish()
    }
}

impl ProviderHandle {
    /// No credentials were supplied.
    pub const fn unconfigured() -> Self {
        Self {
            client: None,
            init_error: None,
        }
    }

    /// Credentials were supplied but the client could not be brought up.
    pub fn failed(err: &ProviderError) -> Self {
        Self {
            client: None,
            init_error: Some(FailureRecord::from(err)),
        }
    }

    /// Wrap a client without probing it.
    pub fn ready(client: Arc<dyn ProviderClient>) -> Self {
        Self {
            client: Some(client),
            init_error: None,
        }
    }

    /// Check `client` with a one-row report; keep it only if the check succeeds.
    pub async fn initialize(client: Arc<dyn ProviderClient>, timeout: Duration) -> Self {
        let check = ReportRequest::connectivity_check(TimeWindow::for_token(RangeToken::Week));
        let result = tokio::time::timeout(timeout, client.run_report(&check))
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::new(
                    ErrorCode::DeadlineExceeded,
                    format!(
                        "connectivity check timed out after {}s",
                        timeout.as_secs()
                    ),
                ))
            });

        match result {
            Ok(response) => {
                tracing::info!(rows = response.rows.len(), "Provider connection verified");
                Self::ready(client)
            }
            Err(e) => {
                tracing::error!(
                    code = %e.code,
                    error = %e.message,
                    hint = e.code.hint(),
                    "Provider initialization failed; serving fallback data"
                );
                Self::failed(&e)
            }
        }
    }

    /// Build the handle from configuration: unconfigured when any credential
    /// is missing, otherwise an HTTP client verified by a startup connectivity check.
    pub async fn connect(config: &Config) -> Self {
        let Some(credentials) = config.provider_credentials() else {
            tracing::warn!("Provider credentials incomplete; serving fallback data only");
            return Self::unconfigured();
        };

        let timeout = Duration::from_secs(config.provider_timeout_secs);
        match http::HttpReportClient::new(&config.provider_endpoint, credentials, timeout) {
            Ok(client) => Self::initialize(Arc::new(client), timeout).await,
            Err(e) => {
                tracing::error!(
                    code = %e.code,
                    error = %e.message,
                    "Failed to build provider client"
                );
                Self::failed(&e)
            }
        }
    }

    pub fn client(&self) -> Option<&Arc<dyn ProviderClient>> {
        self.client.as_ref()
    }

    pub const fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub const fn init_error(&self) -> Option<&FailureRecord> {
        self.init_error.as_ref()
    }
}
