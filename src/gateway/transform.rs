use super::classify::classify_source;
use crate::model::{
    format_change, format_duration, group_thousands, CategoryShare, ChangeDeltas, DetailedSource,
    KeyMetrics, RealtimePage, SeriesPoint,
};
use crate::provider::ReportRow;
use crate::query::report::{DETAILED_SOURCES_LIMIT, REALTIME_LIMIT};
use crate::query::window::TimeWindow;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Windows spanning at most this many days are labelled by weekday.
const WEEKDAY_LABEL_MAX_DAYS: u64 = 8;

pub fn realtime(rows: &[ReportRow]) -> Vec<RealtimePage> {
    rows.iter()
        .take(REALTIME_LIMIT as usize)
        .map(|row| RealtimePage {
            page: row.dimension(0).to_string(),
            active_visitors: row.metric_u64(0),
            recency_label: "Live".to_string(),
        })
        .collect()
}

pub fn visitor_trend(rows: &[ReportRow], window: Option<&TimeWindow>) -> Vec<SeriesPoint> {
    let by_weekday = window.is_none_or(|w| w.span_days() <= WEEKDAY_LABEL_MAX_DAYS);
    rows.iter()
        .map(|row| {
            let raw = row.dimension(0);
            let label = parse_report_date(raw).map_or_else(
                || raw.to_string(),
                |date| {
                    if by_weekday {
                        date.format("%a").to_string()
                    } else {
                        date.format("%b %d").to_string()
                    }
                },
            );
            SeriesPoint::new(label, row.metric_u64(0))
        })
        .collect()
}

/// Provider dates arrive as `YYYYMMDD`; ISO dates are accepted too.
fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

pub fn page_views(rows: &[ReportRow]) -> Vec<SeriesPoint> {
    rows.iter()
        .map(|row| {
            let path = row.dimension(0);
            let label = path.strip_prefix('/').unwrap_or(path);
            let label = if label.is_empty() { "Home" } else { label };
            SeriesPoint::new(label, row.metric_u64(0))
        })
        .collect()
}

pub fn devices(rows: &[ReportRow]) -> Vec<CategoryShare> {
    rows.iter()
        .map(|row| CategoryShare {
            label: capitalize(row.dimension(0)),
            value: row.metric_u64(0),
            category: None,
            icon: None,
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Category and icon for a provider channel group.
fn channel_attrs(channel: &str) -> (&'static str, &'static str) {
    match channel.trim().to_ascii_lowercase().as_str() {
        "organic search" => ("Organic Search", "🔍"),
        "paid search" => ("Paid Search", "💰"),
        "direct" => ("Direct", "🔗"),
        "organic social" | "paid social" => ("Social Media", "📱"),
        "organic video" | "paid video" => ("Video", "📺"),
        "referral" => ("Referral", "🔄"),
        "email" => ("Email Marketing", "📧"),
        "display" => ("Display", "🖼"),
        _ => ("Other", "🌐"),
    }
}

/// Session share per channel, as whole percentages.
///
/// Each share is `round(sessions / total * 100)` with the total floored at 1,
/// so an all-zero input yields all-zero shares. Rounding can overshoot by a
/// point or two; the overshoot is taken back from the largest shares so the
/// sum never exceeds 100.
pub fn traffic_sources(rows: &[ReportRow]) -> Vec<CategoryShare> {
    let sessions: Vec<u64> = rows.iter().map(|row| row.metric_u64(0)).collect();
    let mut shares = percentages(&sessions);
    cap_at_hundred(&mut shares);

    rows.iter()
        .zip(shares)
        .map(|(row, value)| {
            let label = row.dimension(0);
            let (category, icon) = channel_attrs(label);
            CategoryShare {
                label: label.to_string(),
                value,
                category: Some(category.to_string()),
                icon: Some(icon.to_string()),
            }
        })
        .collect()
}

fn saturating_total(values: &[u64]) -> u64 {
    values.iter().fold(0_u64, |acc, v| acc.saturating_add(*v))
}

fn percentages(values: &[u64]) -> Vec<u64> {
    let total = saturating_total(values).max(1);
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let shares = values
        .iter()
        .map(|v| (*v as f64 / total as f64 * 100.0).round() as u64)
        .collect();
    shares
}

fn cap_at_hundred(shares: &mut [u64]) {
    let mut excess = saturating_total(shares).saturating_sub(100);
    if excess == 0 {
        return;
    }
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|a, b| shares[*b].cmp(&shares[*a]));
    for idx in order.into_iter().cycle() {
        if excess == 0 {
            break;
        }
        if shares[idx] > 0 {
            shares[idx] -= 1;
            excess -= 1;
        }
    }
}

/// One record per distinct (source, medium, campaign), ranked by sessions.
pub fn detailed_sources(rows: &[ReportRow]) -> Vec<DetailedSource> {
    let mut order: Vec<(String, String, String)> = Vec::new();
    let mut totals: HashMap<(String, String, String), (u64, u64)> = HashMap::new();

    for row in rows {
        let key = (
            row.dimension(0).to_string(),
            row.dimension(1).to_string(),
            row.dimension(2).to_string(),
        );
        let entry = totals.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (0, 0)
        });
        entry.0 = entry.0.saturating_add(row.metric_u64(0));
        entry.1 = entry.1.saturating_add(row.metric_u64(1));
    }

    let mut records: Vec<DetailedSource> = order
        .into_iter()
        .map(|key| {
            let (sessions, users) = totals.get(&key).copied().unwrap_or_default();
            let (source, medium, campaign) = key;
            let platform = classify_source(&source, &medium);
            DetailedSource {
                display_name: format!("{} ({medium})", platform.name),
                platform: platform.name.to_string(),
                category: platform.category.to_string(),
                icon: platform.icon.to_string(),
                source,
                medium,
                campaign,
                sessions,
                users,
            }
        })
        .collect();

    records.sort_by(|a, b| b.sessions.cmp(&a.sessions));
    records.truncate(DETAILED_SOURCES_LIMIT as usize);
    records
}

/// Raw aggregates in key-metrics request order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricTotals {
    pub visitors: f64,
    pub page_views: f64,
    pub avg_session_secs: f64,
    pub bounce_rate: f64,
}

impl MetricTotals {
    pub fn from_row(row: Option<&ReportRow>) -> Self {
        row.map_or_else(Self::default, |r| Self {
            visitors: r.metric_f64(0),
            page_views: r.metric_f64(1),
            avg_session_secs: r.metric_f64(2),
            bounce_rate: r.metric_f64(3),
        })
    }
}

fn relative_change(current: f64, previous: f64) -> f64 {
    if previous <= 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

pub fn key_metrics(current: MetricTotals, previous: MetricTotals) -> KeyMetrics {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = |v: f64| group_thousands(v.max(0.0).trunc() as u64);
    KeyMetrics {
        total_visitors: count(current.visitors),
        page_views: count(current.page_views),
        avg_session_duration: format_duration(current.avg_session_secs),
        bounce_rate: format!("{:.1}%", current.bounce_rate * 100.0),
        change_deltas: ChangeDeltas {
            visitors: format_change(relative_change(current.visitors, previous.visitors)),
            page_views: format_change(relative_change(current.page_views, previous.page_views)),
            duration: format_change(relative_change(
                current.avg_session_secs,
                previous.avg_session_secs,
            )),
            bounce_rate: format_change(relative_change(current.bounce_rate, previous.bounce_rate)),
        },
    }
}
