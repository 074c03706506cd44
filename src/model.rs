//! Value records served by the gateway and consumed by the dashboard client.
//!
//! Every record is built fresh per request. JSON field names are camelCase
//! because the dashboard consumes them directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven report shapes the relay knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Realtime,
    VisitorTrend,
    PageViews,
    Devices,
    TrafficSources,
    DetailedTrafficSources,
    KeyMetrics,
}

impl Family {
    pub const ALL: [Self; 7] = [
        Self::Realtime,
        Self::VisitorTrend,
        Self::PageViews,
        Self::Devices,
        Self::TrafficSources,
        Self::DetailedTrafficSources,
        Self::KeyMetrics,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::VisitorTrend => "visitor-trend",
            Self::PageViews => "page-views",
            Self::Devices => "devices",
            Self::TrafficSources => "traffic-sources",
            Self::DetailedTrafficSources => "detailed-traffic-sources",
            Self::KeyMetrics => "key-metrics",
        }
    }

    /// Realtime is the only family that is not scoped to a time window.
    pub const fn is_windowed(self) -> bool {
        !matches!(self, Self::Realtime)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One active page in the realtime snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimePage {
    pub page: String,
    pub active_visitors: u64,
    pub recency_label: String,
}

/// One point of an ordered series (visitor trend, page views).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: u64,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: u64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// One slice of a categorical breakdown (devices, traffic sources).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub label: String,
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// One source/medium/campaign row of the detailed traffic report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedSource {
    pub source: String,
    pub medium: String,
    pub campaign: String,
    pub platform: String,
    pub display_name: String,
    pub sessions: u64,
    pub users: u64,
    pub category: String,
    pub icon: String,
}

/// Signed period-over-period changes, pre-formatted (`+12.5%`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDeltas {
    pub visitors: String,
    pub page_views: String,
    pub duration: String,
    pub bounce_rate: String,
}

/// Headline numbers for a window, all formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetrics {
    pub total_visitors: String,
    pub page_views: String,
    pub avg_session_duration: String,
    pub bounce_rate: String,
    pub change_deltas: ChangeDeltas,
}

/// A dataset for any family. Serializes as the bare payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FamilyData {
    Realtime(Vec<RealtimePage>),
    Series(Vec<SeriesPoint>),
    Breakdown(Vec<CategoryShare>),
    Detailed(Vec<DetailedSource>),
    KeyMetrics(KeyMetrics),
}

impl FamilyData {
    /// Number of rows, with key metrics counting as a single row.
    pub fn len(&self) -> usize {
        match self {
            Self::Realtime(rows) => rows.len(),
            Self::Series(rows) => rows.len(),
            Self::Breakdown(rows) => rows.len(),
            Self::Detailed(rows) => rows.len(),
            Self::KeyMetrics(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Format a count with thousands separators (`12,345`).
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format whole seconds as `Xm Ys`.
pub fn format_duration(secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = secs.max(0.0).floor() as u64;
    format!("{}m {}s", total / 60, total % 60)
}

/// Format a signed percentage change with one decimal (`+3.2%`, `-1.0%`).
pub fn format_change(pct: f64) -> String {
    if pct < 0.0 {
        format!("-{:.1}%", pct.abs())
    } else {
        format!("+{pct:.1}%")
    }
}
