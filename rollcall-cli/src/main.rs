//! Rollcall CLI - find users by email or phone, seed administrators

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{logs, lookup, seed};
use rollcall_core::services::ResolveStrategy;

/// Rollcall - identifier resolution and user matching
#[derive(Parser)]
#[command(name = "rollcall", version, about, long_about = None)]
struct Cli {
    /// Store connection string (duckdb:PATH, file:// URL, a path, or :memory:)
    #[arg(long, global = true, env = "ROLLCALL_DB_URL", hide_env_values = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the active user an email or phone number refers to
    Lookup {
        /// Email address or phone number, in any common format
        identifier: String,
        /// Print the candidates and predicates used
        #[arg(long)]
        explain: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Like lookup, but one query per candidate and inactive users included
    Probe {
        /// Email address or phone number, in any common format
        identifier: String,
        /// Print the candidates and predicates used
        #[arg(long)]
        explain: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every active user an identifier matches
    Matches {
        /// Email address or phone number, in any common format
        identifier: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create or update an administrator account
    SeedAdmin(seed::SeedArgs),

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Commands::Lookup {
            identifier,
            explain,
            json,
        } => lookup::run(db, &identifier, ResolveStrategy::Filtered, explain, json),
        Commands::Probe {
            identifier,
            explain,
            json,
        } => lookup::run(db, &identifier, ResolveStrategy::Quick, explain, json),
        Commands::Matches { identifier, json } => {
            lookup::run(db, &identifier, ResolveStrategy::All, false, json)
        }
        Commands::SeedAdmin(args) => seed::run(db, args),
        Commands::Logs { command } => logs::run(command),
    }
}
