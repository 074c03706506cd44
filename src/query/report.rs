use crate::model::Family;
use crate::query::window::TimeWindow;
use serde::Serialize;

/// Maximum rows requested for the realtime report.
pub const REALTIME_LIMIT: u32 = 10;
/// Maximum rows requested for the page-views report.
pub const PAGE_VIEWS_LIMIT: u32 = 10;
/// Maximum rows kept in the detailed traffic-source report.
pub const DETAILED_SOURCES_LIMIT: u32 = 20;

/// Sort key for a provider report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderBy {
    Dimension { name: String },
    MetricDesc { name: String },
}

/// A provider query, expressed in the provider's dimension/metric vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub realtime: bool,
    pub date_range: Option<TimeWindow>,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl ReportRequest {
    fn new(dimensions: &[&str], metrics: &[&str]) -> Self {
        Self {
            realtime: false,
            date_range: None,
            dimensions: dimensions.iter().map(|d| (*d).to_string()).collect(),
            metrics: metrics.iter().map(|m| (*m).to_string()).collect(),
            order_by: None,
            limit: None,
        }
    }

    fn over(mut self, window: Option<TimeWindow>) -> Self {
        self.date_range = window;
        self
    }

    fn ordered_by_dimension(mut self, name: &str) -> Self {
        self.order_by = Some(OrderBy::Dimension {
            name: name.to_string(),
        });
        self
    }

    fn ordered_by_metric_desc(mut self, name: &str) -> Self {
        self.order_by = Some(OrderBy::MetricDesc {
            name: name.to_string(),
        });
        self
    }

    const fn limited(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The one-row query used to verify credentials at startup.
    pub fn connectivity_check(window: TimeWindow) -> Self {
        Self::new(&[], &["activeUsers"]).over(Some(window)).limited(1)
    }
}

/// Translate a family into its provider query. `window` is ignored for
/// realtime, which always reports the provider's live interval.
pub fn report_for(family: Family, window: Option<TimeWindow>) -> ReportRequest {
    match family {
        Family::Realtime => ReportRequest {
            realtime: true,
            ..ReportRequest::new(&["pagePath"], &["activeUsers"]).limited(REALTIME_LIMIT)
        },
        Family::VisitorTrend => ReportRequest::new(&["date"], &["activeUsers"])
            .over(window)
            .ordered_by_dimension("date"),
        Family::PageViews => ReportRequest::new(&["pagePath"], &["screenPageViews"])
            .over(window)
            .ordered_by_metric_desc("screenPageViews")
            .limited(PAGE_VIEWS_LIMIT),
        Family::Devices => ReportRequest::new(&["deviceCategory"], &["activeUsers"])
            .over(window)
            .ordered_by_metric_desc("activeUsers"),
        Family::TrafficSources => {
            ReportRequest::new(&["sessionDefaultChannelGroup"], &["sessions"])
                .over(window)
                .ordered_by_metric_desc("sessions")
        }
        Family::DetailedTrafficSources => ReportRequest::new(
            &["sessionSource", "sessionMedium", "sessionCampaignName"],
            &["sessions", "totalUsers"],
        )
        .over(window)
        .ordered_by_metric_desc("sessions")
        .limited(DETAILED_SOURCES_LIMIT),
        Family::KeyMetrics => ReportRequest::new(
            &[],
            &[
                "activeUsers",
                "screenPageViews",
                "averageSessionDuration",
                "bounceRate",
            ],
        )
        .over(window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::window::RangeToken;

    #[test]
    fn test_realtime_has_no_window() {
        let window = TimeWindow::for_token(RangeToken::Week);
        let req = report_for(Family::Realtime, Some(window));
        assert!(req.realtime);
        assert!(req.date_range.is_none());
        assert_eq!(req.limit, Some(REALTIME_LIMIT));
    }

    #[test]
    fn test_windowed_families_carry_window() {
        let window = TimeWindow::for_token(RangeToken::Month);
        for family in Family::ALL.into_iter().filter(|f| f.is_windowed()) {
            let req = report_for(family, Some(window));
            assert!(!req.realtime, "{family}");
            assert_eq!(req.date_range, Some(window), "{family}");
            assert!(!req.metrics.is_empty(), "{family}");
        }
    }

    #[test]
    fn test_detailed_sources_vocabulary() {
        let req = report_for(Family::DetailedTrafficSources, None);
        assert_eq!(
            req.dimensions,
            vec!["sessionSource", "sessionMedium", "sessionCampaignName"]
        );
        assert_eq!(req.metrics, vec!["sessions", "totalUsers"]);
        assert_eq!(req.limit, Some(DETAILED_SOURCES_LIMIT));
    }

    #[test]
    fn test_key_metrics_metric_order() {
        let req = report_for(Family::KeyMetrics, None);
        assert!(req.dimensions.is_empty());
        assert_eq!(req.metrics[0], "activeUsers");
        assert_eq!(req.metrics[3], "bounceRate");
    }

    #[test]
    fn test_connectivity_check_is_single_row() {
        let req = ReportRequest::connectivity_check(TimeWindow::for_token(RangeToken::Week));
        assert_eq!(req.limit, Some(1));
        assert_eq!(req.metrics, vec!["activeUsers"]);
    }
}
