mod commands;
mod config;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{cmd_blame, cmd_dump, cmd_summary, cmd_time_series, cmd_today};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "fat",
    version,
    about = "Food accumulator: analyze a plain-text food log",
    long_about = "\n\n  ███████╗ █████╗ ████████╗
  ██╔════╝██╔══██╗╚══██╔══╝
  █████╗  ███████║   ██║
  ██╔══╝  ██╔══██║   ██║
  ██║     ██║  ██║   ██║
  ╚═╝     ╚═╝  ╚═╝   ╚═╝
   where did the calories come from?
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which log files to read and which window to look at.
#[derive(Args, Debug, Clone)]
pub(crate) struct LogArgs {
    /// Food log files, read in order ("-" for stdin; default: the configured log)
    pub(crate) files: Vec<PathBuf>,
    /// Only consider food eaten at or after this time (e.g. "yesterday", "2024-01-15", "@1463977331")
    #[arg(short, long)]
    pub(crate) begin: Option<String>,
    /// Only consider food eaten before this time
    #[arg(short, long)]
    pub(crate) end: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ingredient table and every meal in the window
    Dump {
        #[command(flatten)]
        log: LogArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which ingredients and meals contributed most
    Blame {
        #[command(flatten)]
        log: LogArgs,
        /// Entries to show per leaderboard
        #[arg(short = 'n', long, default_value = "5")]
        top: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the daily average over the window
    Summary {
        #[command(flatten)]
        log: LogArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show everything eaten since midnight and today's totals
    Today {
        #[command(flatten)]
        log: LogArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a day-by-day series of calories and macro split
    TimeSeries {
        #[command(flatten)]
        log: LogArgs,
        /// Days between rows
        #[arg(short, long, default_value = "1")]
        step: f64,
        /// Days averaged into each row (trailing)
        #[arg(short, long, default_value = "1")]
        window: f64,
        /// Output as CSV
        #[arg(long, conflicts_with = "json")]
        csv: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// `RUST_LOG` picks the filter; `FAT_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fat=warn,fat_core=warn"));
    let json = std::env::var("FAT_LOG_FORMAT").is_ok_and(|f| f == "json");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Dump { log, json } => cmd_dump(&config, &log, json),
        Commands::Blame { log, top, json } => cmd_blame(&config, &log, top, json),
        Commands::Summary { log, json } => cmd_summary(&config, &log, json),
        Commands::Today { log, json } => cmd_today(&config, &log, json),
        Commands::TimeSeries {
            log,
            step,
            window,
            csv,
            json,
        } => cmd_time_series(&config, &log, step, window, csv, json),
    }
}
