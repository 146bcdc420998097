use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::core::error::UsageError;
use crate::core::formatter::{format_dollars, format_last_updated, format_reset_time, ZoneName};
use crate::core::models::usage::{UsageResponse, UsageWindow, UtilizationLevel};

const PLACEHOLDER: &str = "--";

/// Everything the display layer needs, as of the last refresh.
///
/// A failed refresh sets `error` but keeps `response` from the last success.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewState {
    pub response: Option<UsageResponse>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<UsageError>,
    pub last_updated: Option<DateTime<Utc>>,
    pub subscription_type: Option<String>,
    pub is_loading: bool,
}

fn serialize_error<S>(error: &Option<UsageError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ViewState {
    fn five_hour(&self) -> Option<&UsageWindow> {
        self.response.as_ref().and_then(|r| r.five_hour.as_ref())
    }

    fn seven_day(&self) -> Option<&UsageWindow> {
        self.response.as_ref().and_then(|r| r.seven_day.as_ref())
    }

    fn sonnet(&self) -> Option<&UsageWindow> {
        self.response.as_ref().and_then(|r| r.seven_day_sonnet.as_ref())
    }

    fn reset_text<Tz>(window: Option<&UsageWindow>, now: &DateTime<Utc>, tz: &Tz) -> String
    where
        Tz: ZoneName,
        Tz::Offset: Display,
    {
        window
            .and_then(|w| w.resets_at_date())
            .map(|date| format_reset_time(&date, now, tz))
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    // Current session (5-hour window)

    pub fn five_hour_utilization(&self) -> f64 {
        self.five_hour().map(|w| w.utilization).unwrap_or(0.0)
    }

    pub fn five_hour_time_remaining(&self, now: DateTime<Utc>) -> String {
        self.five_hour()
            .map(|w| w.formatted_time_remaining(now))
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    fn five_hour_seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.five_hour()
            .and_then(|w| w.time_remaining(now))
            .map(|d| d.num_seconds().max(0))
            .unwrap_or(0)
    }

    pub fn five_hour_hours_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.five_hour_seconds_remaining(now) / 3600
    }

    pub fn five_hour_minutes_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.five_hour_seconds_remaining(now) % 3600) / 60
    }

    pub fn five_hour_reset_text<Tz>(&self, now: &DateTime<Utc>, tz: &Tz) -> String
    where
        Tz: ZoneName,
        Tz::Offset: Display,
    {
        Self::reset_text(self.five_hour(), now, tz)
    }

    // Current week (all models)

    pub fn seven_day_utilization(&self) -> f64 {
        self.seven_day().map(|w| w.utilization).unwrap_or(0.0)
    }

    pub fn seven_day_reset_text<Tz>(&self, now: &DateTime<Utc>, tz: &Tz) -> String
    where
        Tz: ZoneName,
        Tz::Offset: Display,
    {
        Self::reset_text(self.seven_day(), now, tz)
    }

    // Current week (Sonnet only)

    pub fn sonnet_utilization(&self) -> f64 {
        self.sonnet().map(|w| w.utilization).unwrap_or(0.0)
    }

    pub fn sonnet_reset_text<Tz>(&self, now: &DateTime<Utc>, tz: &Tz) -> String
    where
        Tz: ZoneName,
        Tz::Offset: Display,
    {
        Self::reset_text(self.sonnet(), now, tz)
    }

    // Extra usage

    pub fn extra_usage_is_enabled(&self) -> bool {
        self.response
            .as_ref()
            .and_then(|r| r.extra_usage.as_ref())
            .is_some_and(|e| e.is_enabled)
    }

    pub fn extra_usage_utilization(&self) -> f64 {
        self.response
            .as_ref()
            .and_then(|r| r.extra_usage.as_ref())
            .and_then(|e| e.utilization)
            .unwrap_or(0.0)
    }

    pub fn extra_usage_spent(&self) -> String {
        match self.response.as_ref().and_then(|r| r.extra_usage.as_ref()) {
            Some(extra) if extra.is_enabled => format_dollars(extra.spent_dollars()),
            _ => PLACEHOLDER.to_string(),
        }
    }

    pub fn extra_usage_limit(&self) -> String {
        match self.response.as_ref().and_then(|r| r.extra_usage.as_ref()) {
            Some(extra) if extra.is_enabled => format_dollars(extra.limit_dollars()),
            _ => PLACEHOLDER.to_string(),
        }
    }

    // Labels

    /// "CC: 42% [2h 15m]" or "CC: Error".
    pub fn menu_bar_text(&self, now: DateTime<Utc>) -> String {
        if self.error.is_some() {
            return "CC: Error".to_string();
        }
        format!(
            "CC: {}% [{}]",
            self.five_hour_utilization().max(0.0).trunc() as u64,
            self.five_hour_time_remaining(now)
        )
    }

    /// "CC•42%·2h15m" or "CC·Error".
    pub fn compact_label(&self, now: DateTime<Utc>) -> String {
        if self.error.is_some() {
            return "CC·Error".to_string();
        }
        format!(
            "CC•{}%·{}h{}m",
            self.five_hour_utilization().max(0.0).trunc() as u64,
            self.five_hour_hours_remaining(now),
            self.five_hour_minutes_remaining(now)
        )
    }

    pub fn utilization_level(&self) -> UtilizationLevel {
        UtilizationLevel::from_utilization(self.five_hour_utilization())
    }

    pub fn last_updated_text<Tz>(&self, now: &DateTime<Utc>, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        format_last_updated(self.last_updated.as_ref(), now, tz)
    }

    // Errors

    pub fn is_auth_error(&self) -> bool {
        self.error.as_ref().is_some_and(UsageError::is_auth)
    }

    pub fn error_title(&self) -> String {
        match &self.error {
            None => "Error".to_string(),
            Some(UsageError::NoToken(_)) => "No Authentication".to_string(),
            Some(UsageError::Http(401)) => "Authentication Expired".to_string(),
            Some(UsageError::Http(code)) => format!("HTTP Error ({})", code),
            Some(UsageError::Network(_)) => "Network Error".to_string(),
            Some(UsageError::InvalidResponse(_)) => "Invalid Response".to_string(),
        }
    }

    pub fn error_message(&self) -> String {
        match &self.error {
            None => "Unknown error".to_string(),
            Some(e) if e.is_auth() => {
                "Please sign in using the Claude Code CLI:\n\nclaude login".to_string()
            }
            Some(e) => e.to_string(),
        }
    }
}
