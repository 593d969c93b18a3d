//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::deploy::{DeployResult, StepOutcome, StepPreview};
use crate::manifest::{Manifest, ValidationResult};
use crate::state::{LocalState, LockInfo};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Step row for table display.
#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Tracked resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the steps a deploy would run.
    #[must_use]
    pub fn format_preview(&self, project: &str, preview: &[StepPreview]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "project": project,
                "steps": preview,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("\nDeploy plan for {project}\n\n");

                let rows: Vec<StepRow> = preview
                    .iter()
                    .enumerate()
                    .map(|(i, p)| StepRow {
                        index: i + 1,
                        step: p.step.to_string(),
                        action: Self::format_outcome(p.outcome),
                        detail: Self::truncate(&p.detail, 60),
                    })
                    .collect();
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');

                let work = preview.iter().filter(|p| p.outcome.did_work()).count();
                let _ = write!(
                    output,
                    "\nPlan: {} of {} steps will run\n",
                    work.to_string().green(),
                    preview.len()
                );
                output
            }
        }
    }

    /// Formats the result of a successful deploy.
    #[must_use]
    pub fn format_result(&self, result: &DeployResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();

                let rows: Vec<StepRow> = result
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(i, r)| StepRow {
                        index: i + 1,
                        step: r.step.to_string(),
                        action: Self::format_outcome(r.outcome),
                        detail: Self::truncate(&r.detail, 60),
                    })
                    .collect();
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');

                if !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                let _ = write!(
                    output,
                    "\n{} Your project is available at {}\n",
                    "✓".green(),
                    result.url.bold()
                );
                output.push_str(
                    "   Domain propagation across the edge network can take a few minutes.\n",
                );
                output
            }
        }
    }

    /// Formats manifest validation findings.
    #[must_use]
    pub fn format_validation(
        &self,
        manifest: &Manifest,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "valid": result.is_valid(),
                "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "warnings": result.warnings,
                "resources": manifest.resource_count(),
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();

                if result.is_valid() {
                    let _ = writeln!(output, "{} Manifest is valid", "✓".green());
                } else {
                    let _ = writeln!(
                        output,
                        "{} Manifest has {} error(s):",
                        "✗".red(),
                        result.error_count()
                    );
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                }

                if show_warnings && result.warning_count() > 0 {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output.push_str("\nManifest summary:\n");
                let _ = writeln!(output, "   Applications: {}", manifest.applications.len());
                let _ = writeln!(output, "   Origins: {}", manifest.origins.len());
                let _ = writeln!(output, "   Buckets: {}", manifest.buckets.len());
                let _ = writeln!(output, "   Functions: {}", manifest.functions.len());
                let _ = writeln!(output, "   Domains: {}", manifest.domains.len());
                let _ = writeln!(output, "   Rules: {}", manifest.rules.len());
                output
            }
        }
    }

    /// Formats local state.
    #[must_use]
    pub fn format_state(&self, state: &LocalState) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(state).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("\nState: {}\n\n", state.name);

                let _ = writeln!(output, "   Version: {}", state.version);
                let _ = writeln!(output, "   Preset: {}", Self::or_dash(&state.preset));
                let _ = writeln!(output, "   Template: {}", Self::or_dash(&state.template));
                let _ = writeln!(output, "   Last updated: {}", state.last_updated);
                let _ = writeln!(output, "   First run done: {}\n", state.not_first_run);

                let rows = Self::resource_rows(state);
                if rows.is_empty() {
                    output.push_str("   No resources provisioned.\n");
                } else {
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                if !state.history.is_empty() {
                    let _ = writeln!(output, "\n   Recent history ({}):", state.history.len());
                    for entry in state.history.iter().rev().take(5) {
                        let _ = writeln!(
                            output,
                            "     {} {} - {} ({})",
                            "✓".green(),
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.domain.as_deref().unwrap_or("-"),
                            entry.steps.join(", ")
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats lock information.
    #[must_use]
    pub fn format_lock(&self, lock: &LockInfo) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(lock).unwrap_or_default(),
            OutputFormat::Text => format!(
                "State locked: {}\n   Holder: {}\n   Expires in: {}s\n",
                lock.lock_id,
                lock.holder,
                lock.remaining_secs()
            ),
        }
    }

    fn resource_rows(state: &LocalState) -> Vec<ResourceRow> {
        let mut rows = Vec::new();
        let mut push = |resource: &str, name: Option<&str>, id: Option<u64>| {
            if name.is_some() || id.is_some() {
                rows.push(ResourceRow {
                    resource: resource.to_string(),
                    name: name.unwrap_or("-").to_string(),
                    id: id.map_or_else(|| String::from("-"), |id| id.to_string()),
                });
            }
        };

        push("application", None, state.application.id);
        push("origin", None, state.origin.id);
        push("bucket", state.bucket.as_deref(), None);
        push("function", state.function.file.as_deref(), state.function.id);
        push("function instance", None, state.function.instance_id);
        for rule in &state.rules_engine.rules {
            push(&format!("rule ({})", rule.phase), Some(&rule.name), Some(rule.id));
        }
        for origin in &state.origins {
            push("origin", Some(&origin.name), Some(origin.id));
        }
        for bucket in &state.buckets {
            push("bucket", Some(bucket), None);
        }
        push("domain", state.domain.name.as_deref(), state.domain.id);

        rows
    }

    /// Formats a step outcome with color.
    fn format_outcome(outcome: StepOutcome) -> String {
        match outcome {
            StepOutcome::Created => "+create".green().to_string(),
            StepOutcome::Updated => "~update".yellow().to_string(),
            StepOutcome::Adopted => "adopt".cyan().to_string(),
            StepOutcome::Completed => "run".green().to_string(),
            StepOutcome::Skipped => "skip".dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{kept}...")
        }
    }

    fn or_dash(s: &str) -> &str {
        if s.is_empty() { "-" } else { s }
    }
}
