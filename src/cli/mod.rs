//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Artifact lifecycle orchestrator
#[derive(Parser)]
#[command(name = "hatchery", version, about)]
pub struct Cli {
    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from a specific file instead of the default
    /// hierarchy
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the project-local configuration and database
    Init,

    /// Run the control loop daemon until interrupted
    Daemon,

    /// Manage owners (tenants)
    Owner {
        #[command(subcommand)]
        command: OwnerCommands,
    },

    /// Submit a generation request
    Generate {
        /// Owner ID the artifact belongs to
        #[arg(long)]
        owner: Uuid,

        /// Natural-language requirement
        #[arg(long)]
        requirement: String,

        /// Model identifier (configured default when omitted)
        #[arg(long)]
        model: Option<String>,

        /// Block until the generation reaches a terminal state
        #[arg(long)]
        wait: bool,
    },

    /// Show the status of a generation task
    Status {
        /// Task (artifact) ID
        task_id: Uuid,
    },

    /// Deploy a ready artifact and supervise it in the foreground
    Deploy {
        /// Artifact ID
        artifact_id: Uuid,
    },

    /// List artifact records
    List {
        /// Filter by status (generating/testing/ready/deployed/failed/archived)
        #[arg(long)]
        status: Option<String>,
    },

    /// Generate a quality report for an artifact
    Report {
        /// Artifact ID
        artifact_id: Uuid,

        /// Metrics window: 1h, 6h, 24h, 7d, 30d
        #[arg(long, default_value = "24h")]
        window: String,
    },
}

#[derive(Subcommand)]
pub enum OwnerCommands {
    /// Register a new owner
    Add {
        /// Display name
        name: String,
    },

    /// List registered owners
    List,
}

/// Print an error consistently and exit nonzero.
pub fn handle_error(err: anyhow::Error, json: bool) {
    if json {
        let output = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
