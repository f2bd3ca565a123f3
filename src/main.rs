mod cli;
mod config;
mod server;
mod usage;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ccdeck")]
#[command(about = "Local dashboard for Claude Code and OpenCode usage", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Open the dashboard in a browser
        #[arg(long)]
        open: bool,
    },
    /// Print a usage report to the terminal
    Usage {
        /// Data source: claude or opencode
        #[arg(short, long, default_value = "claude")]
        source: String,
        /// Report period: daily, weekly, monthly, session or blocks
        #[arg(long, default_value = "daily")]
        period: String,
        /// Cost mode: auto, calculate or display
        #[arg(short, long)]
        mode: Option<String>,
        /// IANA timezone for bucketing
        #[arg(long)]
        timezone: Option<String>,
        /// First day of the week for weekly reports
        #[arg(long = "start-of-week")]
        start_of_week: Option<String>,
        /// Include per-model breakdowns where available
        #[arg(long)]
        breakdown: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, open }) => cli::commands::serve::run(port, open).await,
        Some(Commands::Usage {
            source,
            period,
            mode,
            timezone,
            start_of_week,
            breakdown,
        }) => {
            cli::commands::usage::run(source, period, mode, timezone, start_of_week, breakdown)
                .await
        }
        // Bare invocation starts the dashboard with config defaults.
        None => cli::commands::serve::run(None, false).await,
    }
}
