//! Resilient fetch gateway.
//!
//! Every family request yields a schema-conforming dataset. Missing
//! configuration, provider failures and empty reports are all answered
//! with synthesized data; the caller never sees an error.

pub mod classify;
pub mod transform;

use crate::model::{Family, FamilyData};
use crate::provider::error::{ErrorCode, FailureRecord, ProviderError};
use crate::provider::{ProviderClient, ProviderHandle, ReportResponse};
use crate::query::report::{report_for, ReportRequest};
use crate::query::window::{RangeToken, TimeWindow};
use crate::synth;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::time::{Duration, Instant};
use transform::MetricTotals;

/// How a family request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Real,
    FallbackUnconfigured,
    FallbackError,
    FallbackEmpty,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::FallbackUnconfigured => "fallback-unconfigured",
            Self::FallbackError => "fallback-error",
            Self::FallbackEmpty => "fallback-empty",
        }
    }

    pub const fn is_fallback(self) -> bool {
        !matches!(self, Self::Real)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dataset plus the path that produced it.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub data: FamilyData,
    pub outcome: Outcome,
}

impl Fetched {
    fn fallback(family: Family, outcome: Outcome) -> Self {
        Self {
            data: synth::synthesize(family),
            outcome,
        }
    }
}

/// Provider status as reported by `/health`. Recomputed on every call.
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    pub provider_configured: bool,
    pub last_error: Option<FailureRecord>,
    pub timestamp: DateTime<Utc>,
}

impl ProviderHealth {
    /// Configured and no unresolved failure.
    pub const fn connected(&self) -> bool {
        self.provider_configured && self.last_error.is_none()
    }
}

pub struct Gateway {
    provider: ProviderHandle,
    timeout: Duration,
    /// Most recent classified provider failure; cleared by the next call
    /// that reaches the provider successfully.
    last_failure: Mutex<Option<FailureRecord>>,
}

impl Gateway {
    pub fn new(provider: ProviderHandle, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            last_failure: Mutex::new(None),
        }
    }

    pub const fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    /// Produce a dataset for `family`. Windowed families without a window
    /// use the default 7-day window; realtime ignores the window.
    pub async fn fetch(&self, family: Family, window: Option<TimeWindow>) -> Fetched {
        let started = Instant::now();
        let window = family
            .is_windowed()
            .then(|| window.unwrap_or_else(|| TimeWindow::for_token(RangeToken::default())));

        let fetched = match self.provider.client() {
            None => Fetched::fallback(family, Outcome::FallbackUnconfigured),
            Some(client) => match self.query(client.as_ref(), family, window).await {
                Ok(Some(data)) => {
                    self.last_failure.lock().take();
                    Fetched {
                        data,
                        outcome: Outcome::Real,
                    }
                }
                Ok(None) => {
                    self.last_failure.lock().take();
                    Fetched::fallback(family, Outcome::FallbackEmpty)
                }
                Err(e) => {
                    tracing::warn!(
                        family = %family,
                        code = %e.code,
                        error = %e.message,
                        "Provider call failed"
                    );
                    *self.last_failure.lock() = Some(FailureRecord::from(&e));
                    Fetched::fallback(family, Outcome::FallbackError)
                }
            },
        };

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            family = %family,
            outcome = %fetched.outcome,
            elapsed_ms,
            "Analytics fetch"
        );
        fetched
    }

    pub fn health(&self) -> ProviderHealth {
        let last_error = self
            .last_failure
            .lock()
            .clone()
            .or_else(|| self.provider.init_error().cloned());
        ProviderHealth {
            provider_configured: self.provider.is_configured(),
            last_error,
            timestamp: Utc::now(),
        }
    }

    async fn run(
        &self,
        client: &dyn ProviderClient,
        request: &ReportRequest,
    ) -> Result<ReportResponse, ProviderError> {
        let call = async {
            if request.realtime {
                client.run_realtime_report(request).await
            } else {
                client.run_report(request).await
            }
        };
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::new(
                    ErrorCode::DeadlineExceeded,
                    format!("provider call exceeded {}s", self.timeout.as_secs()),
                ))
            })
    }

    /// `Ok(None)` means the provider answered with no rows.
    async fn query(
        &self,
        client: &dyn ProviderClient,
        family: Family,
        window: Option<TimeWindow>,
    ) -> Result<Option<FamilyData>, ProviderError> {
        if family == Family::KeyMetrics {
            return self.query_key_metrics(client, window).await;
        }

        let response = self.run(client, &report_for(family, window)).await?;
        if response.rows.is_empty() {
            return Ok(None);
        }
        let rows = &response.rows;
        let data = match family {
            Family::Realtime => FamilyData::Realtime(transform::realtime(rows)),
            Family::VisitorTrend => {
                FamilyData::Series(transform::visitor_trend(rows, window.as_ref()))
            }
            Family::PageViews => FamilyData::Series(transform::page_views(rows)),
            Family::Devices => FamilyData::Breakdown(transform::devices(rows)),
            Family::TrafficSources => FamilyData::Breakdown(transform::traffic_sources(rows)),
            Family::DetailedTrafficSources => {
                FamilyData::Detailed(transform::detailed_sources(rows))
            }
            Family::KeyMetrics => FamilyData::KeyMetrics(transform::key_metrics(
                MetricTotals::from_row(rows.first()),
                MetricTotals::default(),
            )),
        };
        Ok(Some(data))
    }

    /// Current and previous windows are queried concurrently. A failed
    /// previous-window query only flattens the change deltas.
    async fn query_key_metrics(
        &self,
        client: &dyn ProviderClient,
        window: Option<TimeWindow>,
    ) -> Result<Option<FamilyData>, ProviderError> {
        let current_req = report_for(Family::KeyMetrics, window);
        let previous_req = window.map(|w| report_for(Family::KeyMetrics, Some(w.previous())));

        let (current, previous) = tokio::join!(self.run(client, &current_req), async {
            match &previous_req {
                Some(req) => Some(self.run(client, req).await),
                None => None,
            }
        });

        let current = current?;
        if current.rows.is_empty() {
            return Ok(None);
        }
        let previous = match previous {
            Some(Ok(resp)) => MetricTotals::from_row(resp.rows.first()),
            Some(Err(e)) => {
                tracing::debug!(
                    code = %e.code,
                    error = %e.message,
                    "Previous-window metrics unavailable"
                );
                MetricTotals::default()
            }
            None => MetricTotals::default(),
        };

        Ok(Some(FamilyData::KeyMetrics(transform::key_metrics(
            MetricTotals::from_row(current.rows.first()),
            previous,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ReportRow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Provider fake that answers every report with the same result.
    struct FixedProvider {
        result: Result<ReportResponse, ProviderError>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn ok(rows: Vec<ReportRow>) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(ReportResponse { rows }),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(code: ErrorCode) -> Arc<Self> {
            Arc::new(Self {
                result: Err(ProviderError::new(code, format!("{code}: simulated"))),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProviderClient for FixedProvider {
        async fn run_report(&self, _: &ReportRequest) -> Result<ReportResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }

        async fn run_realtime_report(
            &self,
            _: &ReportRequest,
        ) -> Result<ReportResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl ProviderClient for SlowProvider {
        async fn run_report(&self, _: &ReportRequest) -> Result<ReportResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ReportResponse::default())
        }

        async fn run_realtime_report(
            &self,
            _: &ReportRequest,
        ) -> Result<ReportResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ReportResponse::default())
        }
    }

    fn gateway(client: Arc<dyn ProviderClient>) -> Gateway {
        Gateway::new(ProviderHandle::ready(client), Duration::from_secs(5))
    }

    fn row(dims: &[&str], metrics: &[&str]) -> ReportRow {
        ReportRow {
            dimension_values: dims.iter().map(|s| (*s).to_string()).collect(),
            metric_values: metrics.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn shape(data: &FamilyData) -> std::mem::Discriminant<FamilyData> {
        std::mem::discriminant(data)
    }

    #[tokio::test]
    async fn test_unconfigured_falls_back_without_error() {
        let gw = Gateway::new(ProviderHandle::unconfigured(), Duration::from_secs(5));
        for family in Family::ALL {
            let fetched = gw.fetch(family, None).await;
            assert_eq!(fetched.outcome, Outcome::FallbackUnconfigured);
            assert!(!fetched.data.is_empty());
        }
        let health = gw.health();
        assert!(!health.provider_configured);
        assert!(health.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failing_provider_equivalent_to_unconfigured() {
        let unconfigured = Gateway::new(ProviderHandle::unconfigured(), Duration::from_secs(5));
        let failing = gateway(FixedProvider::failing(ErrorCode::QuotaExceeded));
        let window = Some(TimeWindow::for_token(RangeToken::Month));

        for family in Family::ALL {
            let a = unconfigured.fetch(family, window).await;
            let b = failing.fetch(family, window).await;
            assert_eq!(shape(&a.data), shape(&b.data), "{family}");
            assert_eq!(a.data.len(), b.data.len(), "{family}");
            assert_eq!(b.outcome, Outcome::FallbackError);
        }
    }

    #[tokio::test]
    async fn test_failure_recorded_for_health() {
        let gw = gateway(FixedProvider::failing(ErrorCode::PermissionDenied));
        gw.fetch(Family::VisitorTrend, None).await;
        let health = gw.health();
        assert!(health.provider_configured);
        assert!(!health.connected());
        assert_eq!(health.last_error.unwrap().code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_success_clears_recorded_failure() {
        let provider = FixedProvider::ok(vec![row(&["desktop"], &["10"])]);
        let gw = gateway(provider);
        *gw.last_failure.lock() = Some(FailureRecord::from(&ProviderError::new(
            ErrorCode::Unavailable,
            "blip",
        )));
        let fetched = gw.fetch(Family::Devices, None).await;
        assert_eq!(fetched.outcome, Outcome::Real);
        assert!(gw.health().connected());
    }

    #[tokio::test]
    async fn test_empty_rows_fall_back() {
        let gw = gateway(FixedProvider::ok(Vec::new()));
        let fetched = gw.fetch(Family::PageViews, None).await;
        assert_eq!(fetched.outcome, Outcome::FallbackEmpty);
        assert!(!fetched.data.is_empty());
        assert!(gw.health().connected());
    }

    #[tokio::test]
    async fn test_real_devices() {
        let gw = gateway(FixedProvider::ok(vec![
            row(&["desktop"], &["60"]),
            row(&["mobile"], &["40"]),
        ]));
        let fetched = gw.fetch(Family::Devices, None).await;
        assert_eq!(fetched.outcome, Outcome::Real);
        let FamilyData::Breakdown(shares) = fetched.data else {
            panic!("expected breakdown");
        };
        assert_eq!(shares[0].label, "Desktop");
        assert_eq!(shares[1].value, 40);
    }

    #[tokio::test]
    async fn test_key_metrics_queries_previous_window() {
        let provider = FixedProvider::ok(vec![row(&[], &["200", "400", "90", "0.25"])]);
        let gw = gateway(provider.clone());
        let fetched = gw
            .fetch(Family::KeyMetrics, Some(TimeWindow::for_token(RangeToken::Week)))
            .await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        let FamilyData::KeyMetrics(metrics) = fetched.data else {
            panic!("expected key metrics");
        };
        assert_eq!(metrics.total_visitors, "200");
        assert_eq!(metrics.avg_session_duration, "1m 30s");
        assert_eq!(metrics.bounce_rate, "25.0%");
        assert_eq!(metrics.change_deltas.visitors, "+0.0%");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_to_fallback() {
        let gw = Gateway::new(
            ProviderHandle::ready(Arc::new(SlowProvider)),
            Duration::from_secs(2),
        );
        let fetched = gw.fetch(Family::Realtime, None).await;
        assert_eq!(fetched.outcome, Outcome::FallbackError);
        assert_eq!(
            gw.health().last_error.unwrap().code,
            ErrorCode::DeadlineExceeded
        );
    }

    #[tokio::test]
    async fn test_init_error_reported_in_health() {
        let err = ProviderError::new(ErrorCode::Unauthenticated, "bad key");
        let gw = Gateway::new(ProviderHandle::failed(&err), Duration::from_secs(5));
        let fetched = gw.fetch(Family::Realtime, None).await;
        assert_eq!(fetched.outcome, Outcome::FallbackUnconfigured);
        let health = gw.health();
        assert!(!health.connected());
        assert_eq!(health.last_error.unwrap().code, ErrorCode::Unauthenticated);
    }
}
