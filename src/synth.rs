//! Bounded-random substitute datasets.
//!
//! Used whenever real provider data is unavailable. Output has exactly the
//! shape of real output for the same family; only the numbers are random.
//! Nothing here touches I/O or shared state.

use crate::gateway::classify::classify_source;
use crate::model::{
    format_change, group_thousands, CategoryShare, ChangeDeltas, DetailedSource, Family,
    FamilyData, KeyMetrics, RealtimePage, SeriesPoint,
};
use rand::Rng;

/// Inclusive integer range.
#[derive(Debug, Clone, Copy)]
pub struct Span(pub u64, pub u64);

impl Span {
    fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> u64 {
        rng.random_range(self.0..=self.1)
    }
}

/// Half-open float range used for percentage changes.
#[derive(Debug, Clone, Copy)]
pub struct Band(pub f64, pub f64);

impl Band {
    fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f64 {
        rng.random_range(self.0..self.1)
    }
}

#[derive(Debug)]
pub struct RealtimeSeed {
    pub page: &'static str,
    pub visitors: Span,
    pub recency: &'static str,
}

#[derive(Debug)]
pub struct ShareSeed {
    pub label: &'static str,
    pub value: Span,
    pub category: Option<&'static str>,
    pub icon: Option<&'static str>,
}

#[derive(Debug)]
pub struct SourceSeed {
    pub source: &'static str,
    pub medium: &'static str,
    pub campaign: &'static str,
    pub sessions: Span,
    pub users: Span,
}

#[derive(Debug)]
pub struct MetricsSeed {
    pub visitors: Span,
    pub page_views: Span,
    pub session_minutes: Span,
    pub bounce_whole: Span,
    pub visitors_change: Band,
    pub page_views_change: Band,
    pub duration_change: Band,
    /// Sampled magnitude; bounce rate change is always reported as a drop.
    pub bounce_change: Band,
}

/// A complete set of value ranges for every family.
#[derive(Debug)]
pub struct FallbackProfile {
    pub realtime: &'static [RealtimeSeed],
    pub weekdays: Span,
    pub pages: &'static [&'static str],
    pub page_views: Span,
    pub devices: &'static [ShareSeed],
    pub traffic: &'static [ShareSeed],
    pub detailed: &'static [SourceSeed],
    pub metrics: MetricsSeed,
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const fn share(
    label: &'static str,
    lo: u64,
    hi: u64,
    category: &'static str,
    icon: &'static str,
) -> ShareSeed {
    ShareSeed {
        label,
        value: Span(lo, hi),
        category: Some(category),
        icon: Some(icon),
    }
}

const fn device(label: &'static str, lo: u64, hi: u64) -> ShareSeed {
    ShareSeed {
        label,
        value: Span(lo, hi),
        category: None,
        icon: None,
    }
}

const fn seed(
    source: &'static str,
    medium: &'static str,
    campaign: &'static str,
    sessions: (u64, u64),
    users: (u64, u64),
) -> SourceSeed {
    SourceSeed {
        source,
        medium,
        campaign,
        sessions: Span(sessions.0, sessions.1),
        users: Span(users.0, users.1),
    }
}

const DETAILED_SEEDS: [SourceSeed; 10] = [
    seed("google", "organic", "(not set)", (800, 1299), (600, 999)),
    seed("facebook.com", "referral", "(not set)", (300, 499), (250, 429)),
    seed("instagram.com", "referral", "(not set)", (200, 349), (180, 299)),
    seed("tiktok.com", "referral", "(not set)", (150, 249), (120, 199)),
    seed("youtube.com", "referral", "(not set)", (120, 199), (100, 169)),
    seed("twitter.com", "referral", "(not set)", (80, 139), (70, 119)),
    seed("linkedin.com", "referral", "(not set)", (70, 119), (60, 99)),
    seed("(direct)", "(none)", "(not set)", (400, 699), (350, 599)),
    seed("newsletter", "email", "weekly_digest", (60, 99), (50, 84)),
    seed("reddit.com", "referral", "(not set)", (40, 69), (35, 59)),
];

/// Ranges used by the gateway when the provider cannot answer.
pub const SERVER: FallbackProfile = FallbackProfile {
    realtime: &[
        RealtimeSeed {
            page: "/analytics",
            visitors: Span(15, 39),
            recency: "1 min ago",
        },
        RealtimeSeed {
            page: "/dashboard",
            visitors: Span(10, 29),
            recency: "2 min ago",
        },
        RealtimeSeed {
            page: "/",
            visitors: Span(30, 69),
            recency: "30 sec ago",
        },
        RealtimeSeed {
            page: "/portfolio",
            visitors: Span(8, 22),
            recency: "3 min ago",
        },
        RealtimeSeed {
            page: "/contact",
            visitors: Span(5, 16),
            recency: "4 min ago",
        },
    ],
    weekdays: Span(500, 1300),
    pages: &["Home", "Analytics", "Dashboard", "Portfolio", "Contact", "About"],
    page_views: Span(1200, 3699),
    devices: &[
        device("Desktop", 35, 74),
        device("Mobile", 40, 84),
        device("Tablet", 10, 29),
    ],
    traffic: &[
        share("Organic Search", 30, 38, "Organic Search", "🔍"),
        share("Direct", 20, 26, "Direct", "🔗"),
        share("Organic Social", 14, 18, "Social Media", "📱"),
        share("Referral", 6, 9, "Referral", "🔄"),
        share("Email", 3, 5, "Email Marketing", "📧"),
    ],
    detailed: &DETAILED_SEEDS,
    metrics: MetricsSeed {
        visitors: Span(12_000, 19_999),
        page_views: Span(25_000, 39_999),
        session_minutes: Span(2, 4),
        bounce_whole: Span(28, 42),
        visitors_change: Band(7.0, 25.0),
        page_views_change: Band(5.0, 17.0),
        duration_change: Band(10.0, 32.0),
        bounce_change: Band(3.0, 11.0),
    },
};

/// Ranges used by the dashboard client when the gateway itself is unreachable.
pub const DASHBOARD: FallbackProfile = FallbackProfile {
    realtime: &[
        RealtimeSeed {
            page: "/portfolio",
            visitors: Span(10, 59),
            recency: "2 min ago",
        },
        RealtimeSeed {
            page: "/services",
            visitors: Span(5, 34),
            recency: "3 min ago",
        },
        RealtimeSeed {
            page: "/",
            visitors: Span(20, 79),
            recency: "1 min ago",
        },
        RealtimeSeed {
            page: "/contact",
            visitors: Span(5, 24),
            recency: "4 min ago",
        },
        RealtimeSeed {
            page: "/blog",
            visitors: Span(3, 17),
            recency: "5 min ago",
        },
    ],
    weekdays: Span(500, 1499),
    pages: &["Home", "Portfolio", "Services", "About", "Contact", "Blog"],
    page_views: Span(1000, 3999),
    devices: &[
        device("Desktop", 3, 7),
        device("Mobile", 4, 11),
        device("Tablet", 1, 3),
    ],
    traffic: &[
        share("Google Search", 25, 31, "Organic Search", "🔍"),
        share("Facebook", 8, 11, "Social Media", "📘"),
        share("Direct Traffic", 14, 18, "Direct", "🔗"),
        share("Instagram", 5, 7, "Social Media", "📷"),
        share("TikTok", 4, 6, "Social Media", "🎵"),
        share("YouTube", 3, 5, "Video", "📺"),
        share("Twitter/X", 2, 4, "Social Media", "🐦"),
        share("LinkedIn", 2, 4, "Social Media", "💼"),
        share("Email Campaign", 2, 4, "Email Marketing", "📧"),
        share("Referral Sites", 3, 5, "Referral", "🔄"),
    ],
    detailed: &DETAILED_SEEDS,
    metrics: MetricsSeed {
        visitors: Span(10_000, 14_999),
        page_views: Span(20_000, 29_999),
        session_minutes: Span(2, 3),
        bounce_whole: Span(25, 44),
        visitors_change: Band(5.0, 25.0),
        page_views_change: Band(3.0, 18.0),
        duration_change: Band(8.0, 33.0),
        bounce_change: Band(2.0, 12.0),
    },
};

/// Synthesize a gateway-side substitute dataset for `family`.
pub fn synthesize(family: Family) -> FamilyData {
    SERVER.synthesize(family)
}

impl FallbackProfile {
    pub fn synthesize(&self, family: Family) -> FamilyData {
        self.synthesize_with(family, &mut rand::rng())
    }

    pub fn synthesize_with<R: Rng + ?Sized>(&self, family: Family, rng: &mut R) -> FamilyData {
        match family {
            Family::Realtime => FamilyData::Realtime(self.realtime(rng)),
            Family::VisitorTrend => FamilyData::Series(self.visitor_trend(rng)),
            Family::PageViews => FamilyData::Series(self.page_views(rng)),
            Family::Devices => FamilyData::Breakdown(self.devices(rng)),
            Family::TrafficSources => FamilyData::Breakdown(self.traffic_sources(rng)),
            Family::DetailedTrafficSources => FamilyData::Detailed(self.detailed_sources(rng)),
            Family::KeyMetrics => FamilyData::KeyMetrics(self.key_metrics(rng)),
        }
    }

    pub fn realtime<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<RealtimePage> {
        self.realtime
            .iter()
            .map(|s| RealtimePage {
                page: s.page.to_string(),
                active_visitors: s.visitors.sample(rng),
                recency_label: s.recency.to_string(),
            })
            .collect()
    }

    pub fn visitor_trend<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<SeriesPoint> {
        WEEKDAYS
            .iter()
            .map(|day| SeriesPoint::new(*day, self.weekdays.sample(rng)))
            .collect()
    }

    pub fn page_views<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<SeriesPoint> {
        self.pages
            .iter()
            .map(|page| SeriesPoint::new(*page, self.page_views.sample(rng)))
            .collect()
    }

    /// Device shares are percentage-like but deliberately not normalized;
    /// they need not sum to 100.
    pub fn devices<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<CategoryShare> {
        Self::shares(self.devices, rng)
    }

    pub fn traffic_sources<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<CategoryShare> {
        Self::shares(self.traffic, rng)
    }

    pub fn detailed_sources<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<DetailedSource> {
        let mut rows: Vec<DetailedSource> = self
            .detailed
            .iter()
            .map(|s| {
                let platform = classify_source(s.source, s.medium);
                DetailedSource {
                    source: s.source.to_string(),
                    medium: s.medium.to_string(),
                    campaign: s.campaign.to_string(),
                    platform: platform.name.to_string(),
                    display_name: format!("{} ({})", platform.name, s.medium),
                    sessions: s.sessions.sample(rng),
                    users: s.users.sample(rng),
                    category: platform.category.to_string(),
                    icon: platform.icon.to_string(),
                }
            })
            .collect();
        rows.sort_by(|a, b| b.sessions.cmp(&a.sessions));
        rows
    }

    pub fn key_metrics<R: Rng + ?Sized>(&self, rng: &mut R) -> KeyMetrics {
        let m = &self.metrics;
        KeyMetrics {
            total_visitors: group_thousands(m.visitors.sample(rng)),
            page_views: group_thousands(m.page_views.sample(rng)),
            avg_session_duration: format!(
                "{}m {}s",
                m.session_minutes.sample(rng),
                rng.random_range(0..60_u32)
            ),
            bounce_rate: format!(
                "{}.{}%",
                m.bounce_whole.sample(rng),
                rng.random_range(0..10_u32)
            ),
            change_deltas: ChangeDeltas {
                visitors: format_change(m.visitors_change.sample(rng)),
                page_views: format_change(m.page_views_change.sample(rng)),
                duration: format_change(m.duration_change.sample(rng)),
                bounce_rate: format_change(-m.bounce_change.sample(rng)),
            },
        }
    }

    fn shares<R: Rng + ?Sized>(seeds: &[ShareSeed], rng: &mut R) -> Vec<CategoryShare> {
        seeds
            .iter()
            .map(|s| CategoryShare {
                label: s.label.to_string(),
                value: s.value.sample(rng),
                category: s.category.map(String::from),
                icon: s.icon.map(String::from),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn shape(data: &FamilyData) -> Vec<String> {
        let value = serde_json::to_value(data).unwrap();
        match value {
            serde_json::Value::Array(rows) => rows
                .iter()
                .map(|row| {
                    let mut keys: Vec<_> = row.as_object().unwrap().keys().cloned().collect();
                    keys.sort();
                    keys.join(",")
                })
                .collect(),
            serde_json::Value::Object(map) => {
                let mut keys: Vec<_> = map.keys().cloned().collect();
                keys.sort();
                vec![keys.join(",")]
            }
            other => panic!("unexpected shape {other}"),
        }
    }

    #[test]
    fn test_every_family_is_non_empty() {
        for profile in [&SERVER, &DASHBOARD] {
            for family in Family::ALL {
                assert!(!profile.synthesize(family).is_empty(), "{family}");
            }
        }
    }

    #[test]
    fn test_repeated_calls_keep_shape() {
        for family in Family::ALL {
            let a = synthesize(family);
            let b = synthesize(family);
            assert_eq!(shape(&a), shape(&b), "{family}");
        }
    }

    #[test]
    fn test_visitor_trend_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let series = SERVER.visitor_trend(&mut rng);
            assert_eq!(series.len(), 7);
            assert_eq!(series[0].label, "Mon");
            assert!(series.iter().all(|p| (500..=1300).contains(&p.value)));
        }
    }

    #[test]
    fn test_devices_have_three_fixed_categories() {
        let mut rng = StdRng::seed_from_u64(11);
        let devices = SERVER.devices(&mut rng);
        let labels: Vec<_> = devices.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["Desktop", "Mobile", "Tablet"]);
    }

    #[test]
    fn test_traffic_shares_never_exceed_hundred() {
        let mut rng = StdRng::seed_from_u64(3);
        for profile in [&SERVER, &DASHBOARD] {
            for _ in 0..200 {
                let total: u64 = profile.traffic_sources(&mut rng).iter().map(|s| s.value).sum();
                assert!(total <= 100, "total {total}");
            }
        }
    }

    #[test]
    fn test_traffic_shares_carry_category_and_icon() {
        let mut rng = StdRng::seed_from_u64(5);
        for row in DASHBOARD.traffic_sources(&mut rng) {
            assert!(row.category.is_some());
            assert!(row.icon.is_some());
        }
    }

    #[test]
    fn test_detailed_sources_sorted_and_classified() {
        let mut rng = StdRng::seed_from_u64(9);
        let rows = SERVER.detailed_sources(&mut rng);
        assert_eq!(rows.len(), DETAILED_SEEDS.len());
        assert!(rows.windows(2).all(|w| w[0].sessions >= w[1].sessions));
        let direct = rows.iter().find(|r| r.source == "(direct)").unwrap();
        assert_eq!(direct.platform, "Direct Traffic");
        assert_eq!(direct.category, "Direct");
    }

    #[test]
    fn test_key_metrics_formatting() {
        let mut rng = StdRng::seed_from_u64(1);
        let metrics = SERVER.key_metrics(&mut rng);
        assert!(metrics.total_visitors.contains(','));
        assert!(metrics.avg_session_duration.ends_with('s'));
        assert!(metrics.bounce_rate.ends_with('%'));
        assert!(metrics.change_deltas.visitors.starts_with('+'));
        assert!(metrics.change_deltas.bounce_rate.starts_with('-'));
    }

    #[test]
    fn test_profiles_differ() {
        let mut rng = StdRng::seed_from_u64(2);
        let labels = |points: Vec<SeriesPoint>| -> Vec<String> {
            points.into_iter().map(|p| p.label).collect()
        };
        let server_pages = labels(SERVER.page_views(&mut rng));
        let client_pages = labels(DASHBOARD.page_views(&mut rng));
        assert_ne!(server_pages, client_pages);
    }
}
