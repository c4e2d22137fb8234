//! # SchoolHub CLI Module
//!
//! This module implements the CLI interface for SchoolHub.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server and notification poller
//! - `init` - Initialize a new database
//! - `status` - Show the dashboard
//! - `load` - Bulk-load employees, classes and students from JSON
//! - `export` - Export the school to a snapshot file
//! - `import` - Import a snapshot (file backend only)
//! - `hash` - Compute the BLAKE3 hash of the canonical snapshot
//! - `dispatch` - Deliver due notifications once
//! - `defaulters` - List students with overdue fees

mod commands;
mod roster;

use crate::config::{Backend, ServerConfig};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use schoolhub_core::SchoolError;
use std::path::PathBuf;

pub use commands::*;
pub use roster::{LoadSummary, RosterFile, load_roster};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// SchoolHub - school records server
///
/// Students, staff, attendance, fees, exams, homework and notifications
/// behind one JSON API.
#[derive(Parser, Debug)]
#[command(name = "schoolhub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database (default: schoolhub.db)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (default: redb)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds between notification dispatch passes
        #[arg(long)]
        poll_interval: Option<u64>,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show the school dashboard
    Status {
        /// Report date (YYYY-MM-DD, default: today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Bulk-load employees, classes and students from a JSON roster
    Load {
        /// Path to the roster file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export the school as a canonical snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a snapshot into an empty school (file backend only)
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute BLAKE3 cryptographic hash of the snapshot
    Hash,

    /// Deliver every notification that is due now
    Dispatch,

    /// List students with overdue fees
    Defaulters {
        /// Report date (YYYY-MM-DD, default: today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration: file and environment first, then global flags.
pub fn resolve_config(cli: &Cli) -> Result<ServerConfig, SchoolError> {
    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.database.clone_from(database);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), SchoolError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server {
            host,
            port,
            poll_interval,
        }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(secs) = poll_interval {
                config.poll_interval_secs = secs;
            }
            config.validate()?;
            cmd_server(config).await
        }
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Status { today }) => cmd_status(&config, json_mode, today),
        Some(Commands::Load { file }) => cmd_load(&config, json_mode, &file),
        Some(Commands::Export { output }) => cmd_export(&config, &output),
        Some(Commands::Import { input }) => cmd_import(&config, &input),
        Some(Commands::Hash) => cmd_hash(&config, json_mode),
        Some(Commands::Dispatch) => cmd_dispatch(&config, json_mode),
        Some(Commands::Defaulters { today }) => cmd_defaulters(&config, json_mode, today),
        None => cmd_status(&config, json_mode, None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "schoolhub",
            "defaulters",
            "--today",
            "2025-10-01",
            "-B",
            "file",
            "-D",
            "school.snap",
        ])
        .unwrap();
        assert_eq!(cli.backend, Some(Backend::File));
        assert_eq!(cli.database, Some(PathBuf::from("school.snap")));
        assert!(matches!(
            cli.command,
            Some(Commands::Defaulters { today: Some(d) }) if d == NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
        ));
    }

    #[test]
    fn unknown_backend_rejected() {
        assert!(Cli::try_parse_from(["schoolhub", "-B", "sqlite", "status"]).is_err());
    }
}
