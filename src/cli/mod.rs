//! CLI layer: clap command definitions, output formatting, and the wiring
//! from configuration to file stores and services.

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};

pub use context::CliContext;
pub use output::{output, truncate, CommandOutput};

#[derive(Parser)]
#[command(name = "proctor")]
#[command(about = "Proctor - governance pipeline for self-improving agents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize proctor configuration and state directory
    Init(commands::init::InitArgs),

    /// Improvement scope commands
    Scope(commands::scope::ScopeArgs),

    /// Conflict detection commands
    Conflicts(commands::conflict::ConflictArgs),

    /// Pattern clustering commands
    Clusters(commands::cluster::ClusterArgs),

    /// Health indicator commands
    Health(commands::health::HealthArgs),

    /// Root cause analysis commands
    #[command(name = "root-cause")]
    RootCause(commands::root_cause::RootCauseArgs),
}

/// Print a failure and exit non-zero, honoring `--json`.
pub fn handle_error(err: anyhow::Error, json_mode: bool) {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
