mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use vigil_core::config::get_data_dir;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Foreground window time tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the tracking daemon
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Stop the tracking daemon
    Stop,
    /// Check daemon status and the current session
    Status,
    /// Pause session tracking
    Pause,
    /// Resume session tracking
    Resume,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Summarize tracked time per application
    Report {
        /// Time period: today, yesterday, week, month, all, or YYYY-MM-DD
        #[arg(default_value = "today")]
        period: String,
        /// Break the period down by hour of day
        #[arg(long)]
        hourly: bool,
    },
    /// List tracked applications
    Apps {
        /// Only show applications matching this query
        query: Option<String>,
    },
    /// Export sessions to JSON or CSV
    Export {
        /// Output format: json or csv
        format: String,
        /// Output file path
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Delete recorded sessions
    Purge {
        /// Delete sessions recorded before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,
        /// Delete all recorded sessions
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., idle-threshold)
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., idle-threshold)
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let data_dir = get_data_dir()?;

    match cli.command {
        Commands::Start => commands::daemon::start_daemon(&data_dir),
        Commands::DaemonInternalStart => commands::daemon::run_daemon_process().await,
        Commands::Stop => commands::daemon::stop_daemon(&data_dir).await,
        Commands::Status => commands::daemon::show_status(&data_dir).await,
        Commands::Pause => commands::config::pause_command(),
        Commands::Resume => commands::config::resume_command(),
        Commands::Config { action } => commands::config::handle_config_command(action),
        Commands::Report { period, hourly } => {
            commands::report::handle_report_command(&period, hourly)
        }
        Commands::Apps { query } => commands::report::handle_apps_command(query.as_deref()),
        Commands::Export { format, output } => {
            commands::export::handle_export_command(&format, output)
        }
        Commands::Purge { before, all } => {
            commands::purge::handle_purge_command(before.as_deref(), all)
        }
    }
}
