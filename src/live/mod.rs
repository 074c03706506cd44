//! Live view-model for one dashboard session.
//!
//! A [`LiveView`] loads every family for the selected range as one batch
//! and keeps the realtime family fresh with a periodic ticker. The ticker
//! is owned by the view: unmounting or dropping the view cancels it.

use crate::client::{AnalyticsSource, HealthCheck};
use crate::model::{CategoryShare, DetailedSource, KeyMetrics, RealtimePage, SeriesPoint};
use crate::query::window::RangeToken;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default realtime refresh period.
pub const REALTIME_PERIOD: Duration = Duration::from_secs(30);

/// Merged view-model exposed to the consumer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionState {
    pub key_metrics: Option<KeyMetrics>,
    pub visitor_trend: Vec<SeriesPoint>,
    pub page_views: Vec<SeriesPoint>,
    pub devices: Vec<CategoryShare>,
    pub traffic_sources: Vec<CategoryShare>,
    pub detailed_sources: Vec<DetailedSource>,
    pub realtime: Vec<RealtimePage>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub health: Option<HealthCheck>,
    /// Last health check succeeded and the ticker is armed.
    pub is_live: bool,
    /// Last health check reported a configured, error-free provider.
    pub is_provider_connected: bool,
}

/// Periodic realtime refresh.
///
/// Each tick awaits its fetch before waiting for the next one, and missed
/// ticks are skipped, so refreshes never overlap. Cancellation stops future
/// ticks; a fetch already in flight finishes but its result is discarded.
struct RealtimeTicker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RealtimeTicker {
    fn spawn(
        source: Arc<dyn AnalyticsSource>,
        state: Arc<watch::Sender<ConnectionState>>,
        period: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let realtime = source.realtime().await;
                if token.is_cancelled() {
                    break;
                }
                state.send_modify(|s| {
                    s.realtime = realtime;
                    s.last_updated = Some(Utc::now());
                });
                tracing::debug!("Realtime refreshed");
            }
        });
        Self { cancel, handle }
    }

    fn is_armed(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

pub struct LiveView {
    source: Arc<dyn AnalyticsSource>,
    range: RangeToken,
    state: Arc<watch::Sender<ConnectionState>>,
    ticker: Option<RealtimeTicker>,
}

impl LiveView {
    /// Arm the realtime ticker, then load every family for `range`.
    pub async fn mount(
        source: Arc<dyn AnalyticsSource>,
        range: RangeToken,
        period: Duration,
    ) -> Self {
        let (tx, _) = watch::channel(ConnectionState::default());
        let state = Arc::new(tx);
        let ticker = RealtimeTicker::spawn(Arc::clone(&source), Arc::clone(&state), period);
        let view = Self {
            source,
            range,
            state,
            ticker: Some(ticker),
        };
        view.load().await;
        view
    }

    pub const fn range(&self) -> RangeToken {
        self.range
    }

    /// Switch range and reload the full batch.
    pub async fn set_range(&mut self, range: RangeToken) {
        self.range = range;
        self.load().await;
    }

    /// Reload the full batch for the current range.
    pub async fn refresh(&self) {
        self.load().await;
    }

    pub fn snapshot(&self) -> ConnectionState {
        let mut state = self.state.borrow().clone();
        let healthy = state.health.as_ref().is_some_and(HealthCheck::is_ok);
        state.is_live = healthy && self.ticker_armed();
        state
    }

    /// Receiver notified on every merge, including realtime ticks.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn ticker_armed(&self) -> bool {
        self.ticker.as_ref().is_some_and(RealtimeTicker::is_armed)
    }

    /// Tear down: cancel the ticker. In-flight calls are not aborted.
    pub fn unmount(mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        self.state.send_modify(|s| s.is_live = false);
    }

    async fn load(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let src = self.source.as_ref();
        let range = self.range;
        let (
            health,
            key_metrics,
            visitor_trend,
            page_views,
            devices,
            traffic_sources,
            detailed_sources,
            realtime,
        ) = tokio::join!(
            src.check_health(),
            src.key_metrics(range),
            src.visitor_trend(range),
            src.page_views(range),
            src.devices(range),
            src.traffic_sources(range),
            src.detailed_sources(range),
            src.realtime(),
        );

        let armed = self.ticker_armed();
        self.state.send_modify(|s| {
            s.key_metrics = Some(key_metrics);
            s.visitor_trend = visitor_trend;
            s.page_views = page_views;
            s.devices = devices;
            s.traffic_sources = traffic_sources;
            s.detailed_sources = detailed_sources;
            s.realtime = realtime;
            s.loading = false;
            s.error = (!health.is_ok()).then(|| {
                format!(
                    "Server: {}",
                    health.error.as_deref().unwrap_or("unreachable")
                )
            });
            s.last_updated = Some(Utc::now());
            s.is_live = health.is_ok() && armed;
            s.is_provider_connected = health.provider_connected;
            s.health = Some(health);
        });
        tracing::info!(range = %range, "Dashboard batch loaded");
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        if let Some(ticker) = &self.ticker {
            ticker.cancel();
        }
    }
}
