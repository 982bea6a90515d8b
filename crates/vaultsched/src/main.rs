//! vaultsched: periodic maintenance scheduler for a self-hosted credential
//! vault.
//!
//! Main binary with subcommands:
//! - `daemon`: run the scheduler loop
//! - `validate`: check the configuration and exit
//! - `jobs`: list configured jobs and their dueness
//! - `history`: print recorded run history

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod daemon;
mod inspect;

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

#[derive(Parser)]
#[command(name = "vaultsched")]
#[command(about = "Periodic vault maintenance scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler daemon
    Daemon {
        /// Configuration file
        #[arg(long, env = "VAULTSCHED_CONFIG", default_value = "vaultsched.toml")]
        config: PathBuf,

        /// Execute one evaluation pass and exit instead of looping
        #[arg(long, env = "VAULTSCHED_ONCE", value_parser = parse_bool_env, default_value = "false")]
        once: bool,

        /// Log which jobs would run, without executing or recording anything
        #[arg(long, env = "VAULTSCHED_DRY_RUN", value_parser = parse_bool_env, default_value = "false")]
        dry_run: bool,
    },

    /// Validate the configuration and exit non-zero if it is rejected
    Validate {
        /// Configuration file
        #[arg(long, env = "VAULTSCHED_CONFIG", default_value = "vaultsched.toml")]
        config: PathBuf,
    },

    /// List configured jobs, their schedules, and last outcomes
    Jobs {
        /// Configuration file
        #[arg(long, env = "VAULTSCHED_CONFIG", default_value = "vaultsched.toml")]
        config: PathBuf,
    },

    /// Print recorded run history
    History {
        /// Configuration file
        #[arg(long, env = "VAULTSCHED_CONFIG", default_value = "vaultsched.toml")]
        config: PathBuf,

        /// Restrict to a single job id
        #[arg(long)]
        job: Option<String>,

        /// Records to show per job
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "vaultsched=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            config,
            once,
            dry_run,
        } => daemon::run(&config, once, dry_run).await,

        Commands::Validate { config } => inspect::validate(&config),

        Commands::Jobs { config } => inspect::jobs(&config),

        Commands::History { config, job, limit } => inspect::history(&config, job.as_deref(), limit),
    }
}
