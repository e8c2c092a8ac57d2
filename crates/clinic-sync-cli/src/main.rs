//! Clinic Sync CLI
//!
//! Operator tool for a clinic sync store.
//!
//! # Commands
//!
//! - `init` - Create the database file and schema
//! - `pull` - Print everything changed since a watermark
//! - `push` - Apply a push body read from a file (or stdin)
//! - `seed-clinic` - Add a clinic to the reference data

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use clinic_sync_core::models::Clinic;
use clinic_sync_core::{
    Credentials, Principal, StaticCallerResolver, SyncConfig, SyncService,
};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Token the CLI presents to its own resolver.
const OPERATOR_TOKEN: &str = "clinic-sync-cli";

/// Clinic sync command-line tools.
#[derive(Parser)]
#[command(name = "clinic-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database
    #[arg(global = true, short, long, env = "CLINIC_SYNC_DATABASE")]
    database: Option<PathBuf>,

    /// How long to wait on a locked database, in milliseconds
    #[arg(global = true, long, default_value = "5000")]
    busy_timeout_ms: u64,

    /// Reject pushes carrying more records than this
    #[arg(global = true, long)]
    max_push_records: Option<usize>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and schema
    Init,

    /// Print everything changed since a watermark
    Pull {
        /// Epoch milliseconds or ISO-8601 time of the last sync
        #[arg(short, long, default_value = "0")]
        since: String,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Apply a push body
    Push {
        /// Epoch milliseconds or ISO-8601 time of the last sync
        #[arg(short, long)]
        since: String,

        /// File holding the push body, `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: PathBuf,
    },

    /// Add or rename a clinic
    SeedClinic {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,
    },
}

fn read_body(file: &PathBuf) -> anyhow::Result<Value> {
    let mut raw = String::new();
    if file.as_os_str() == "-" {
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("reading push body from stdin")?;
    } else {
        raw = std::fs::read_to_string(file)
            .with_context(|| format!("reading push body from {}", file.display()))?;
    }
    serde_json::from_str(&raw).context("push body is not valid JSON")
}

fn print_json(value: &impl serde::Serialize, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr, so stdout stays JSON)
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = cli.database else {
        bail!("database path required (--database or CLINIC_SYNC_DATABASE)");
    };
    let mut config =
        SyncConfig::new(&path).with_busy_timeout(Duration::from_millis(cli.busy_timeout_ms));
    if let Some(max) = cli.max_push_records {
        config = config.with_max_push_records(max);
    }

    let resolver = StaticCallerResolver::new().with_token(
        OPERATOR_TOKEN,
        Principal {
            user_id: "operator".to_string(),
            clinic_id: None,
        },
    );
    let service = SyncService::open(config, Arc::new(resolver))
        .with_context(|| format!("opening {}", path.display()))?;
    let credentials = Credentials::Token(OPERATOR_TOKEN.to_string());

    match cli.command {
        Commands::Init => {
            info!(path = %path.display(), "database ready");
        }
        Commands::Pull { since, pretty } => {
            let response = service.handle_pull(&credentials, Some(&Value::String(since)))?;
            print_json(&response, pretty)?;
        }
        Commands::Push { since, file } => {
            let body = read_body(&file)?;
            let response = service.handle_push(&credentials, Some(&Value::String(since)), body)?;
            print_json(&response, false)?;
        }
        Commands::SeedClinic { id, name } => {
            let db = service.database();
            let db = db
                .lock()
                .map_err(|e| anyhow::anyhow!("database lock poisoned: {e}"))?;
            db.seed_clinic(&Clinic::new(id.as_str(), name.as_str()))?;
            info!(%id, %name, "clinic seeded");
        }
    }

    Ok(())
}
