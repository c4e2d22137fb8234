//! # SchoolHub - School Records Server
//!
//! The main binary for SchoolHub.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for records, reports and snapshots
//! - Background delivery of scheduled notifications
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                    apps/schoolhub (THE BINARY)              |
//! |                                                             |
//! |   +-----------+     +-------------+     +---------------+   |
//! |   |   CLI     |     |  HTTP API   |     |   Notification|   |
//! |   |  (clap)   |     |   (axum)    |     |   poller      |   |
//! |   +-----+-----+     +------+------+     +-------+-------+   |
//! |         |                  |                    |           |
//! |         +------------------+--------------------+           |
//! |                            v                                |
//! |                   +-----------------+                       |
//! |                   | schoolhub-core  |                       |
//! |                   |  (THE RULES)    |                       |
//! |                   +-----------------+                       |
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! schoolhub server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! schoolhub status
//! schoolhub load -f roster.json
//! schoolhub defaulters --today 2025-10-01
//! ```

use clap::Parser;
use schoolhub::cli;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Text logs by default; `SCHOOLHUB_LOG_FORMAT=json` switches to one JSON
/// object per line. `RUST_LOG` overrides the filter.
fn init_tracing() {
    let json = std::env::var("SCHOOLHUB_LOG_FORMAT").is_ok_and(|format| format == "json");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("schoolhub=info,schoolhub_core=info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}

/// Print the SchoolHub startup banner.
fn print_banner() {
    println!(
        r#"
   ____       _                 _ _   _       _
  / ___|  ___| |__   ___   ___ | | | | |_   _| |__
  \___ \ / __| '_ \ / _ \ / _ \| | |_| | | | | '_ \
   ___) | (__| | | | (_) | (_) | |  _  | |_| | |_) |
  |____/ \___|_| |_|\___/ \___/|_|_| |_|\__,_|_.__/

  School Records Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
