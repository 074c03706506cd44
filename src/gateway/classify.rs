//! Source/medium → platform decision table.
//!
//! Rules are evaluated top to bottom; the first match wins and anything
//! unmatched lands in [`OTHER`]. Matching is case-insensitive.

/// Display attributes for a traffic platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub name: &'static str,
    pub icon: &'static str,
    pub category: &'static str,
}

/// How a needle is compared against a source or medium.
#[derive(Debug, Clone, Copy)]
enum Needle {
    Contains(&'static str),
    /// Whole-value match, for short hosts like `t.co` that appear inside
    /// unrelated domains.
    Exact(&'static str),
}

impl Needle {
    fn matches(self, haystack: &str) -> bool {
        match self {
            Self::Contains(n) => haystack.contains(n),
            Self::Exact(n) => haystack == n || haystack.ends_with(&format!(".{n}")),
        }
    }
}

struct Rule {
    /// Any of these must match the source; empty means "any source".
    source: &'static [Needle],
    /// Any of these must match the medium; empty means "any medium".
    medium: &'static [Needle],
    platform: Platform,
}

impl Rule {
    fn matches(&self, source: &str, medium: &str) -> bool {
        let hit = |needles: &[Needle], value: &str| {
            needles.is_empty() || needles.iter().any(|n| n.matches(value))
        };
        hit(self.source, source) && hit(self.medium, medium)
    }
}

const fn platform(name: &'static str, icon: &'static str, category: &'static str) -> Platform {
    Platform {
        name,
        icon,
        category,
    }
}

use Needle::{Contains, Exact};

const PAID: &[Needle] = &[Contains("cpc"), Contains("ppc"), Contains("paid")];

const RULES: &[Rule] = &[
    Rule {
        source: &[Exact("(direct)")],
        medium: &[],
        platform: platform("Direct Traffic", "🔗", "Direct"),
    },
    Rule {
        source: &[],
        medium: &[Contains("email"), Contains("newsletter")],
        platform: platform("Email", "📧", "Email Marketing"),
    },
    Rule {
        source: &[Contains("newsletter"), Contains("mail")],
        medium: &[],
        platform: platform("Email", "📧", "Email Marketing"),
    },
    Rule {
        source: &[Contains("google")],
        medium: PAID,
        platform: platform("Google Ads", "💰", "Paid Search"),
    },
    Rule {
        source: &[Contains("google")],
        medium: &[],
        platform: platform("Google", "🔍", "Organic Search"),
    },
    Rule {
        source: &[Contains("bing")],
        medium: &[],
        platform: platform("Bing", "🔍", "Organic Search"),
    },
    Rule {
        source: &[Contains("duckduckgo")],
        medium: &[],
        platform: platform("DuckDuckGo", "🔍", "Organic Search"),
    },
    Rule {
        source: &[Contains("yahoo")],
        medium: &[],
        platform: platform("Yahoo", "🔍", "Organic Search"),
    },
    Rule {
        source: &[Contains("facebook"), Exact("fb.com"), Exact("fb.me")],
        medium: &[],
        platform: platform("Facebook", "📘", "Social Media"),
    },
    Rule {
        source: &[Contains("instagram")],
        medium: &[],
        platform: platform("Instagram", "📷", "Social Media"),
    },
    Rule {
        source: &[Contains("tiktok")],
        medium: &[],
        platform: platform("TikTok", "🎵", "Social Media"),
    },
    Rule {
        source: &[Contains("youtube"), Exact("youtu.be")],
        medium: &[],
        platform: platform("YouTube", "📺", "Video"),
    },
    Rule {
        source: &[Contains("reddit")],
        medium: &[],
        platform: platform("Reddit", "🔴", "Social Media"),
    },
    Rule {
        source: &[Contains("twitter"), Exact("t.co"), Exact("x.com")],
        medium: &[],
        platform: platform("Twitter/X", "🐦", "Social Media"),
    },
    Rule {
        source: &[Contains("linkedin"), Exact("lnkd.in")],
        medium: &[],
        platform: platform("LinkedIn", "💼", "Social Media"),
    },
    Rule {
        source: &[Contains("pinterest")],
        medium: &[],
        platform: platform("Pinterest", "📌", "Social Media"),
    },
    Rule {
        source: &[],
        medium: PAID,
        platform: platform("Paid Ads", "💰", "Paid Search"),
    },
    Rule {
        source: &[],
        medium: &[Contains("social")],
        platform: platform("Social Network", "💬", "Social Media"),
    },
    Rule {
        source: &[],
        medium: &[Exact("organic")],
        platform: platform("Search Engine", "🔍", "Organic Search"),
    },
    Rule {
        source: &[],
        medium: &[Exact("referral")],
        platform: platform("Referral Site", "🔄", "Referral"),
    },
];

/// Catch-all platform for anything no rule recognizes.
pub const OTHER: Platform = platform("Other", "🌐", "Other");

/// Classify a raw (source, medium) pair. Total and deterministic.
pub fn classify_source(source: &str, medium: &str) -> Platform {
    let source = source.trim().to_ascii_lowercase();
    let medium = medium.trim().to_ascii_lowercase();
    RULES
        .iter()
        .find(|rule| rule.matches(&source, &medium))
        .map_or(OTHER, |rule| rule.platform)
}
