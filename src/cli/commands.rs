//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Edge deploy - provisions a project onto the edge platform.
#[derive(Parser, Debug)]
#[command(name = "edge-deploy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project directory.
    #[arg(short, long, global = true, env = "EDGE_DEPLOY_PROJECT", default_value = ".")]
    pub project: PathBuf,

    /// Path to the manifest file (searched for in the project by default).
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy the project.
    Deploy {
        /// Static asset directory to upload.
        #[arg(long)]
        path: Option<PathBuf>,

        /// Built function artifact.
        #[arg(long)]
        artifact: Option<PathBuf>,

        /// Preset (language or framework) of the project.
        #[arg(long)]
        preset: Option<String>,

        /// Template the project was generated from.
        #[arg(long)]
        template: Option<String>,

        /// Attach the function to the edge firewall.
        #[arg(long)]
        firewall: bool,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        auto: bool,
    },

    /// Show what a deploy would do.
    Plan {
        /// Preset to plan with.
        #[arg(long)]
        preset: Option<String>,

        /// Template to plan with.
        #[arg(long)]
        template: Option<String>,
    },

    /// Validate the manifest.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Manage local state.
    State {
        /// State subcommand.
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// State management subcommands.
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Show current state.
    Show,

    /// Lock the state.
    Lock {
        /// Lock holder identifier.
        #[arg(long)]
        holder: Option<String>,
    },

    /// Unlock the state.
    Unlock {
        /// Lock ID to unlock.
        #[arg(long)]
        lock_id: Option<String>,

        /// Remove the lock whoever holds it.
        #[arg(long)]
        force: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}
