use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::formatter::format_time_remaining;

/// Severity of a utilization percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationLevel {
    /// Under 50%
    Normal,
    /// 50% up to 80%
    Warning,
    /// 80% and above
    Critical,
}

impl UtilizationLevel {
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization >= 80.0 {
            Self::Critical
        } else if utilization >= 50.0 {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

/// One rate-limit accounting window as reported by the usage endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    /// Percentage of the window that has been used (0.0 - 100.0)
    pub utilization: f64,
    /// ISO-8601 timestamp at which the window resets
    #[serde(default)]
    pub resets_at: Option<String>,
}

impl UsageWindow {
    /// Parsed reset timestamp. Unparseable values count as absent.
    pub fn resets_at_date(&self) -> Option<DateTime<Utc>> {
        self.resets_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.resets_at_date().map(|reset| reset - now)
    }

    /// "2h 15m", "45m", or "0m" once the window has reset or has no reset time.
    pub fn formatted_time_remaining(&self, now: DateTime<Utc>) -> String {
        let seconds = self
            .time_remaining(now)
            .map(|d| d.num_seconds())
            .unwrap_or(0);
        format_time_remaining(seconds)
    }
}

/// Supplementary monthly credit allowance. Credit amounts are in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraUsage {
    pub is_enabled: bool,
    #[serde(default)]
    pub monthly_limit: Option<i64>,
    #[serde(default)]
    pub used_credits: Option<f64>,
    #[serde(default)]
    pub utilization: Option<f64>,
}

impl ExtraUsage {
    pub fn spent_dollars(&self) -> f64 {
        self.used_credits.unwrap_or(0.0) / 100.0
    }

    pub fn limit_dollars(&self) -> f64 {
        self.monthly_limit.unwrap_or(0) as f64 / 100.0
    }
}

/// Latest snapshot returned by the usage endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageResponse {
    /// Rolling 5-hour session window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub five_hour: Option<UsageWindow>,
    /// Rolling 7-day window across all models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seven_day: Option<UsageWindow>,
    /// Rolling 7-day window for Sonnet only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seven_day_sonnet: Option<UsageWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seven_day_oauth_apps: Option<UsageWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seven_day_opus: Option<UsageWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_usage: Option<ExtraUsage>,
}
