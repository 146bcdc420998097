use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use colored::Colorize;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    style::Print,
    terminal::{self, ClearType},
    ExecutableCommand, QueueableCommand,
};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::{build_monitor, renderer, show_cmd, Monitor};
use crate::core::config::AppConfig;
use crate::core::view::ViewState;

const REDRAW_INTERVAL: Duration = Duration::from_secs(1);
const KEY_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Refresh,
    Quit,
}

fn key_action(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyAction> {
    match (code, modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(KeyAction::Quit),
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => Some(KeyAction::Quit),
        (KeyCode::Char('r'), _) => Some(KeyAction::Refresh),
        _ => None,
    }
}

/// RAII guard that restores terminal state on drop (even on panic).
struct ScreenGuard;

impl ScreenGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        io::stdout()
            .execute(terminal::EnterAlternateScreen)?
            .execute(cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        let _ = io::stdout().execute(cursor::Show);
        let _ = io::stdout().execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Poll until interrupted. Interactive terminals get a live panel; pipes get
/// one line (or one JSON object) per completed refresh. `compact` switches the
/// status line to the short "CC•42%·2h15m" label.
pub async fn run(
    config: &AppConfig,
    interval: Duration,
    compact: bool,
    opts: &OutputOptions,
) -> Result<()> {
    let monitor = Arc::new(build_monitor(config)?);
    let mut updates = monitor.subscribe();
    let handle = monitor.start(interval);
    debug!(interval_secs = interval.as_secs(), "poll task started");

    let interactive = opts.format == OutputFormat::Text
        && io::stdout().is_terminal()
        && io::stdin().is_terminal();

    let result = if interactive {
        run_interactive(&monitor, &mut updates, compact, opts).await
    } else {
        run_stream(&monitor, &mut updates, compact, opts).await
    };

    handle.stop().await;
    result
}

fn status_text(state: &ViewState, compact: bool) -> String {
    let now = Utc::now();
    if compact {
        state.compact_label(now)
    } else {
        state.menu_bar_text(now)
    }
}

fn stream_line(state: &ViewState, compact: bool, opts: &OutputOptions) -> Result<String> {
    match opts.format {
        OutputFormat::Json => show_cmd::render_json(state, Utc::now(), false),
        OutputFormat::Text => Ok(status_text(state, compact)),
    }
}

async fn run_stream(
    monitor: &Arc<Monitor>,
    updates: &mut watch::Receiver<u64>,
    compact: bool,
    opts: &OutputOptions,
) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", stream_line(&monitor.state(), compact, opts)?);
            }
        }
    }
    Ok(())
}

/// Tells the key reader thread to exit, on every path out of the watch loop.
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn spawn_key_reader(
    tx: mpsc::UnboundedSender<KeyAction>,
    stop: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match event::poll(KEY_POLL_INTERVAL) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(_) => break,
            }
            let Ok(Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            })) = event::read()
            else {
                continue;
            };
            if kind != KeyEventKind::Press {
                continue;
            }
            if let Some(action) = key_action(code, modifiers) {
                if tx.send(action).is_err() {
                    break;
                }
            }
        }
    })
}

fn footer(state: &ViewState, compact: bool) -> String {
    let mut parts = vec![status_text(state, compact)];
    if state.is_loading {
        parts.push("refreshing…".to_string());
    }
    parts.push("r refresh".to_string());
    parts.push("q quit".to_string());
    format!("  {}", parts.join("  ·  "))
}

fn draw(out: &mut impl Write, state: &ViewState, compact: bool, use_color: bool) -> io::Result<()> {
    let now = Utc::now();
    let panel = renderer::render_panel(state, &now, &Local, use_color);

    out.queue(cursor::MoveTo(0, 0))?;
    out.queue(terminal::Clear(ClearType::All))?;
    for line in panel.lines() {
        out.queue(Print(line))?;
        out.queue(Print("\r\n"))?;
    }
    out.queue(Print("\r\n"))?;
    out.queue(Print(footer(state, compact).dimmed()))?;
    out.flush()
}

async fn run_interactive(
    monitor: &Arc<Monitor>,
    updates: &mut watch::Receiver<u64>,
    compact: bool,
    opts: &OutputOptions,
) -> Result<()> {
    let _guard = ScreenGuard::enable().context("Failed to set up terminal")?;

    let stop = StopOnDrop(Arc::new(AtomicBool::new(false)));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _reader = spawn_key_reader(tx, Arc::clone(&stop.0));

    let mut stdout = io::stdout();
    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        tokio::select! {
            _ = redraw.tick() => {}
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            action = rx.recv() => match action {
                Some(KeyAction::Refresh) => {
                    let monitor = Arc::clone(monitor);
                    tokio::spawn(async move { monitor.refresh().await });
                    tokio::task::yield_now().await;
                }
                Some(KeyAction::Quit) | None => break,
            },
        }
        draw(&mut stdout, &monitor.state(), compact, opts.use_color)?;
    }

    Ok(())
}
