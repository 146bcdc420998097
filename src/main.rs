mod cli;
mod core;

use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "usagebar", about = "Claude subscription usage monitor", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format (text|json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch usage once and display it
    Show,
    /// Keep polling and redraw the panel (r: refresh, q: quit)
    Watch {
        /// Seconds between refreshes (default from config, 60)
        #[arg(short, long)]
        interval: Option<u64>,
        /// Use the short "CC•42%·2h15m" status label
        #[arg(long)]
        compact: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    core::logging::init(cli.verbose);

    let config = cli::load_config();

    let format_name = if cli.json {
        "json"
    } else {
        cli.format
            .as_deref()
            .unwrap_or(config.settings.default_format.as_str())
    };
    let format = match cli::output::OutputFormat::parse(format_name) {
        Some(format) => format,
        None => {
            eprintln!("Unknown format: '{}' (expected text or json)", format_name);
            std::process::exit(2);
        }
    };

    let output_opts = cli::output::OutputOptions {
        format,
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color, &config.settings.color),
        verbose: cli.verbose,
    };

    match cli.command {
        None | Some(Commands::Show) => cli::show_cmd::run(&config, &output_opts).await?,
        Some(Commands::Watch { interval, compact }) => {
            let interval = interval
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.settings.refresh_interval());
            cli::watch_cmd::run(&config, interval, compact, &output_opts).await?
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(&output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(&output_opts)?,
            ConfigAction::Path => cli::config_cmd::path(&output_opts)?,
        },
    }

    Ok(())
}
