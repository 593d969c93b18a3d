//! CLI module for the edge deploy tool.
//!
//! This module provides the command-line interface for deploying projects
//! and inspecting their local state.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat, StateCommands};
pub use output::OutputFormatter;
