use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// Coarse time-window selector sent by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RangeToken {
    Day,
    #[default]
    Week,
    Month,
    Quarter,
}

impl RangeToken {
    pub const ALL: [Self; 4] = [Self::Day, Self::Week, Self::Month, Self::Quarter];

    /// Parse a range token. Anything unrecognized (including an absent
    /// parameter) resolves to the 7-day window.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("1d") => Self::Day,
            Some("30d") => Self::Month,
            Some("90d") => Self::Quarter,
            _ => Self::Week,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "1d",
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
        }
    }

    pub const fn days(self) -> u64 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete, inclusive pair of calendar dates.
///
/// Invariant: `start_date <= end_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TimeWindow {
    /// The window for `token` ending today (UTC).
    pub fn for_token(token: RangeToken) -> Self {
        Self::ending_on(token, Utc::now().date_naive())
    }

    /// The window for `token` ending on `end`; `start = end - token.days()`.
    pub fn ending_on(token: RangeToken, end: NaiveDate) -> Self {
        let start = end
            .checked_sub_days(Days::new(token.days()))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start_date: start,
            end_date: end,
        }
    }

    /// Length in days, counting both endpoints.
    pub fn span_days(&self) -> u64 {
        let diff = (self.end_date - self.start_date).num_days();
        u64::try_from(diff).unwrap_or(0) + 1
    }

    /// The window of equal length that ends the day before this one starts.
    pub fn previous(&self) -> Self {
        let end = self
            .start_date
            .pred_opt()
            .unwrap_or(self.start_date);
        let start = end
            .checked_sub_days(Days::new(self.span_days() - 1))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start_date: start,
            end_date: end,
        }
    }
}
