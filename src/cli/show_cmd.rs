use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::{build_monitor, renderer};
use crate::core::config::AppConfig;
use crate::core::models::usage::UtilizationLevel;
use crate::core::view::ViewState;

#[derive(Serialize)]
struct ShowPayload<'a> {
    #[serde(flatten)]
    state: &'a ViewState,
    menu_bar_text: String,
    utilization_level: UtilizationLevel,
}

fn payload(state: &ViewState, now: DateTime<Utc>) -> ShowPayload<'_> {
    ShowPayload {
        state,
        menu_bar_text: state.menu_bar_text(now),
        utilization_level: state.utilization_level(),
    }
}

pub fn render_json(state: &ViewState, now: DateTime<Utc>, pretty: bool) -> Result<String> {
    let payload = payload(state, now);
    let json = if pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    Ok(json)
}

/// Refresh once and print the panel. Exits with status 1 when the refresh failed.
pub async fn run(config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let monitor = build_monitor(config)?;

    // Show spinner on stderr (text mode only)
    let spinner = if matches!(opts.format, OutputFormat::Text) {
        Some(tokio::spawn(async move {
            let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
            let mut i = 0usize;
            loop {
                eprint!("\r {} Fetching usage data...", frames[i % frames.len()]);
                i = i.wrapping_add(1);
                tokio::time::sleep(std::time::Duration::from_millis(80)).await;
            }
        }))
    } else {
        None
    };

    monitor.refresh().await;

    // Stop spinner and clear the line
    if let Some(s) = spinner {
        s.abort();
        eprint!("\r\x1b[2K");
    }

    let state = monitor.state();
    let now = Utc::now();
    match opts.format {
        OutputFormat::Text => {
            println!("{}", renderer::render_panel(&state, &now, &Local, opts.use_color));
        }
        OutputFormat::Json => {
            println!("{}", render_json(&state, now, opts.pretty)?);
        }
    }

    if let Some(error) = &state.error {
        if opts.verbose {
            eprintln!("Error fetching usage: {}", error);
        }
        std::process::exit(1);
    }

    Ok(())
}
