mod commands;
mod events;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use r2g_telemetry::LogFormat;

/// r2g -- replay recorded change history into a git repository.
#[derive(Parser)]
#[command(name = "r2g", version, about)]
struct Cli {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open or create the sandbox repository and write the initial commit.
    Init {
        /// Sandbox directory (must exist).
        #[arg(long)]
        repo: PathBuf,
        /// TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Replay change and tag events from a JSON-lines file.
    Replay {
        /// Sandbox directory (must exist).
        #[arg(long)]
        repo: PathBuf,
        /// TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Events file, one JSON object per line.
        #[arg(long)]
        events: PathBuf,
        /// Skip the garbage collection and leftover report at the end.
        #[arg(long)]
        no_close: bool,
    },

    /// Validate a configuration file and print the resolved settings.
    CheckConfig {
        /// TOML configuration file.
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    r2g_telemetry::init_logging("r2g", format, &cli.log_level);

    match cli.command {
        Commands::Init { repo, config } => {
            commands::init::run(&repo, config.as_deref())?;
        }
        Commands::Replay {
            repo,
            config,
            events,
            no_close,
        } => {
            commands::replay::run(&repo, config.as_deref(), &events, !no_close)?;
        }
        Commands::CheckConfig { config } => {
            commands::check_config::run(&config)?;
        }
    }

    Ok(())
}
