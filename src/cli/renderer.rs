use std::fmt::Display;

use chrono::{DateTime, Utc};
use colored::{control, ColoredString, Colorize};

use crate::core::formatter::{
    format_monthly_reset, format_percent, format_reset_time, format_usage_bar, ZoneName,
};
use crate::core::models::usage::{UsageWindow, UtilizationLevel};
use crate::core::view::ViewState;

const BAR_WIDTH: usize = 20;
const LABEL_WIDTH: usize = 27;

/// Render the usage panel as a colored (or plain) string.
///
/// Layout:
/// ```text
///  Claude Code (Pro)
///   Current session              42% [████████░░░░░░░░░░░░]
///                                Resets 3pm (UTC) · 2h 15m left
///   Current week (all models)    61% [████████████░░░░░░░░]
///                                Resets Dec 8 at 5PM (UTC)
///   Current week (Sonnet only)   12% [██░░░░░░░░░░░░░░░░░░]
///   Extra usage                  24% [█████░░░░░░░░░░░░░░░]
///                                $12.34 / $50.00 spent · Resets Jan 1 (UTC)
///   Updated                      Just now
/// ```
pub fn render_panel<Tz>(state: &ViewState, now: &DateTime<Utc>, tz: &Tz, use_color: bool) -> String
where
    Tz: ZoneName,
    Tz::Offset: Display,
{
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();

    let plan = state.subscription_type.as_deref().unwrap_or("Unknown");
    lines.push(format!(" Claude Code ({})", plan).bold().to_string());

    if state.error.is_some() {
        render_error(&mut lines, state);
    } else {
        let session_reset = state.five_hour_reset_text(now, tz);
        let session_sub = if session_reset == "--" {
            None
        } else {
            Some(format!(
                "{} · {} left",
                session_reset,
                state.five_hour_time_remaining(*now)
            ))
        };
        render_window(&mut lines, "Current session", state.five_hour_utilization(), session_sub);
        render_window(
            &mut lines,
            "Current week (all models)",
            state.seven_day_utilization(),
            non_placeholder(state.seven_day_reset_text(now, tz)),
        );
        render_window(
            &mut lines,
            "Current week (Sonnet only)",
            state.sonnet_utilization(),
            non_placeholder(state.sonnet_reset_text(now, tz)),
        );

        if let Some(response) = &state.response {
            let optional: [(&str, Option<&UsageWindow>); 2] = [
                ("Current week (Opus)", response.seven_day_opus.as_ref()),
                ("Current week (OAuth apps)", response.seven_day_oauth_apps.as_ref()),
            ];
            for (label, window) in optional {
                let Some(window) = window else { continue };
                let reset = window
                    .resets_at_date()
                    .map(|date| format_reset_time(&date, now, tz));
                render_window(&mut lines, label, window.utilization, reset);
            }
        }

        if state.extra_usage_is_enabled() {
            let spent = format!(
                "{} / {} spent · {}",
                state.extra_usage_spent(),
                state.extra_usage_limit(),
                format_monthly_reset(&now.with_timezone(tz))
            );
            render_window(&mut lines, "Extra usage", state.extra_usage_utilization(), Some(spent));
        }
    }

    lines.push(format!(
        "  {}{}",
        pad_label("Updated").cyan(),
        state.last_updated_text(now, tz)
    ));

    lines.join("\n")
}

fn non_placeholder(text: String) -> Option<String> {
    (text != "--").then_some(text)
}

fn pad_label(label: &str) -> String {
    format!("{:<width$}", label, width = LABEL_WIDTH + 2)
}

fn render_window(lines: &mut Vec<String>, label: &str, utilization: f64, subline: Option<String>) {
    let level = UtilizationLevel::from_utilization(utilization);
    let percent = format!("{:>4}", format_percent(utilization));
    let bar = format_usage_bar(utilization, BAR_WIDTH);

    lines.push(format!(
        "  {}{} {}",
        pad_label(label).cyan(),
        color_by_level(level, &percent),
        color_by_level(level, &bar)
    ));

    if let Some(subline) = subline {
        lines.push(format!("  {}{}", " ".repeat(LABEL_WIDTH + 2), subline.dimmed()));
    }
}

fn render_error(lines: &mut Vec<String>, state: &ViewState) {
    let title = state.error_title();
    let title = if state.is_auth_error() {
        title.yellow().bold()
    } else {
        title.red().bold()
    };
    lines.push(format!("  {}", title));
    for line in state.error_message().lines() {
        lines.push(format!("  {}", line));
    }
    lines.push(format!("  {}", "Retrying on next refresh".dimmed()));
}

/// Green under 50%, yellow under 80%, red from 80%.
fn color_by_level(level: UtilizationLevel, text: &str) -> ColoredString {
    match level {
        UtilizationLevel::Normal => text.green(),
        UtilizationLevel::Warning => text.yellow(),
        UtilizationLevel::Critical => text.red(),
    }
}
