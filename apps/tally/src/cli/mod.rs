//! # Tally CLI Module
//!
//! This module implements the CLI interface for Tally.
//!
//! ## Available Commands
//!
//! - `repl` - Interactive keyboard calculator (default)
//! - `eval` - Run one key sequence and print the result
//! - `server` - Start the history HTTP server
//! - `history` - List recent calculations
//! - `clear-history` - Delete all calculations
//! - `stats` - Operator counts and date range
//! - `session` - Create a session or show its counters
//! - `init` - Initialize a new history database

mod commands;
mod repl;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally_core::{BackendKind, CalcError, Theme};

pub use commands::*;
pub use repl::{Recorder, render_snapshot, run_repl};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Tally - keyboard calculator with history
///
/// Type key sequences such as `12.5*4=`; completed calculations are kept in
/// a local store or sent to a history service.
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a tally.toml configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the history database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "memory" or "redb"
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<BackendKind>,

    /// Use the history service at this URL instead of the local store
    #[arg(long, global = true)]
    pub history_url: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive calculator (default)
    Repl {
        /// Color theme: light or dark
        #[arg(long)]
        theme: Option<Theme>,

        /// Record calculations under this session id
        #[arg(long)]
        session: Option<String>,
    },

    /// Evaluate a key sequence on a fresh calculator
    Eval {
        /// Keys, e.g. `5+3*2=` or `7 m+ ac mr`
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        keys: Vec<String>,

        /// Store completed calculations in the history
        #[arg(short, long)]
        record: bool,
    },

    /// Start the history HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List recent calculations, newest first
    History {
        /// Number of entries to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Delete all stored calculations
    ClearHistory,

    /// Show operator counts and date range of recent history
    Stats,

    /// Manage calculator sessions
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Initialize a new empty history database
    Init {
        /// Replace the database if it already exists
        #[arg(short, long)]
        force: bool,
    },
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Create a new session
    New,
    /// Show counters of a session
    Stats {
        /// Session id
        id: String,
    },
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Load the configuration file and apply command line overrides.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, CalcError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.storage.database.clone_from(database);
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    if let Some(url) = &cli.history_url {
        config.history.url = Some(url.clone());
    }
    Ok(config)
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CalcError> {
    let config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Repl { theme, session }) => cmd_repl(&config, theme, session).await,
        Some(Commands::Eval { keys, record }) => {
            cmd_eval(&config, &keys.join(" "), record, json_mode).await
        }
        Some(Commands::Server { host, port }) => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::History { limit }) => {
            let limit = limit.unwrap_or(config.history.limit);
            cmd_history(&config, limit, json_mode).await
        }
        Some(Commands::ClearHistory) => cmd_clear_history(&config, json_mode).await,
        Some(Commands::Stats) => cmd_stats(&config, json_mode).await,
        Some(Commands::Session { action }) => match action {
            SessionCommand::New => cmd_session_new(&config, json_mode).await,
            SessionCommand::Stats { id } => cmd_session_stats(&config, &id, json_mode).await,
        },
        Some(Commands::Init { force }) => cmd_init(&config.storage.database, force),
        None => cmd_repl(&config, None, None).await,
    }
}
