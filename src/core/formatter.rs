use std::fmt::Display;

use chrono::{DateTime, Datelike, FixedOffset, Local, TimeZone, Utc};

/// "2h 15m", "45m", or "0m" when nothing remains.
pub fn format_time_remaining(seconds: i64) -> String {
    if seconds <= 0 {
        return "0m".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Truncated integer percentage, e.g. `42.9` → "42%".
pub fn format_percent(utilization: f64) -> String {
    format!("{}%", utilization.max(0.0).trunc() as u64)
}

pub fn format_dollars(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// "1/5/25, 3:04 PM"
pub fn format_date_time<Tz>(dt: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    dt.format("%-m/%-d/%y, %-I:%M %p").to_string()
}

/// Time zones that can name themselves in reset labels.
pub trait ZoneName: TimeZone {
    fn zone_name(dt: &DateTime<Self>) -> String;
}

impl ZoneName for Utc {
    fn zone_name(_dt: &DateTime<Self>) -> String {
        "UTC".to_string()
    }
}

impl ZoneName for FixedOffset {
    fn zone_name(dt: &DateTime<Self>) -> String {
        dt.format("%Z").to_string()
    }
}

/// The system zone identifier ("Europe/Berlin"), or the offset if it is unknown.
impl ZoneName for Local {
    fn zone_name(dt: &DateTime<Self>) -> String {
        iana_time_zone::get_timezone().unwrap_or_else(|_| dt.format("%Z").to_string())
    }
}

/// Reset time relative to `now`, rendered in `tz`:
/// same day → "Resets 3pm (UTC)", within a week → "Resets Jan 5 at 3PM (UTC)",
/// otherwise → "Resets Jan 5 (UTC)".
pub fn format_reset_time<Tz>(resets_at: &DateTime<Utc>, now: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: ZoneName,
    Tz::Offset: Display,
{
    let local_reset = resets_at.with_timezone(tz);
    let local_now = now.with_timezone(tz);
    let zone = Tz::zone_name(&local_reset);

    if local_reset.date_naive() == local_now.date_naive() {
        let time = local_reset.format("%-I%p").to_string().to_lowercase();
        return format!("Resets {} ({})", time, zone);
    }

    let days_until = (*resets_at - *now).num_days();
    if days_until < 7 {
        return format!(
            "Resets {} ({})",
            local_reset.format("%b %-d at %-I%p"),
            zone
        );
    }

    format!("Resets {} ({})", local_reset.format("%b %-d"), zone)
}

/// Extra usage resets on the first day of the next calendar month.
pub fn format_monthly_reset<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: ZoneName,
    Tz::Offset: Display,
{
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let label = match chrono::NaiveDate::from_ymd_opt(year, month, 1) {
        Some(date) => date.format("%b %-d").to_string(),
        None => return String::new(),
    };
    format!("Resets {} ({})", label, Tz::zone_name(now))
}

/// "Never", "Just now", "5m ago", or a short date-time after an hour.
pub fn format_last_updated<Tz>(
    last_updated: Option<&DateTime<Utc>>,
    now: &DateTime<Utc>,
    tz: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(last) = last_updated else {
        return "Never".to_string();
    };
    let elapsed = (*now - *last).num_seconds();
    if elapsed < 60 {
        "Just now".to_string()
    } else if elapsed < 3600 {
        format!("{}m ago", elapsed / 60)
    } else {
        format_date_time(&last.with_timezone(tz))
    }
}

/// Returns "[████░░░░░░░░]" where █ = used portion, ░ = remaining portion.
pub fn format_usage_bar(used_percent: f64, width: usize) -> String {
    let used_percent = used_percent.clamp(0.0, 100.0);
    let used_blocks = ((used_percent / 100.0) * width as f64).round() as usize;
    let remaining_blocks = width.saturating_sub(used_blocks);

    format!("[{}{}]", "█".repeat(used_blocks), "░".repeat(remaining_blocks))
}
