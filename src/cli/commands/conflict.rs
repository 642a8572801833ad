//! Conflict detection CLI commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::CliContext;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Conflict, ConflictReport, ConflictType};
use crate::domain::ports::ConflictFilter;
use crate::services::suggest_resolution;

#[derive(Args, Debug)]
pub struct ConflictArgs {
    #[command(subcommand)]
    pub command: ConflictCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConflictCommands {
    /// Run all checks between two improvements without persisting
    Detect {
        /// First improvement ID
        a: String,
        /// Second improvement ID
        b: String,
    },
    /// List stored conflicts
    List {
        /// Only unresolved conflicts
        #[arg(short, long)]
        unresolved: bool,
        /// Only conflicts involving this improvement
        #[arg(short, long)]
        improvement: Option<String>,
        /// Filter by conflict type
        #[arg(short = 't', long = "type")]
        conflict_type: Option<String>,
    },
    /// Resolve a conflict with notes
    Resolve {
        /// Conflict ID
        id: Uuid,
        /// Resolution notes
        #[arg(short, long)]
        notes: String,
    },
    /// Detect and persist conflicts against all other active improvements
    Analyze {
        /// Improvement ID
        id: String,
    },
    /// Report whether an improvement is clear to promote
    #[command(name = "can-promote")]
    CanPromote {
        /// Improvement ID
        id: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ConflictOutput {
    pub id: String,
    pub conflict_type: String,
    pub severity: String,
    pub improvement_a: String,
    pub improvement_b: String,
    pub description: String,
    pub resolved: bool,
    pub suggested_resolution: String,
}

impl From<&Conflict> for ConflictOutput {
    fn from(conflict: &Conflict) -> Self {
        Self {
            id: conflict.conflict_id.to_string(),
            conflict_type: conflict.conflict_type.as_str().to_string(),
            severity: conflict.severity.as_str().to_string(),
            improvement_a: conflict.improvement_a.clone(),
            improvement_b: conflict.improvement_b.clone(),
            description: conflict.description.clone(),
            resolved: conflict.resolved,
            suggested_resolution: suggest_resolution(conflict.conflict_type).to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ConflictListOutput {
    pub conflicts: Vec<ConflictOutput>,
    pub total: usize,
}

impl CommandOutput for ConflictListOutput {
    fn to_human(&self) -> String {
        if self.conflicts.is_empty() {
            return "No conflicts found.".to_string();
        }

        let mut lines = vec![format!("Found {} conflict(s):\n", self.total)];
        lines.push(format!(
            "{:<36} {:<26} {:<9} {:<30}",
            "ID", "TYPE", "SEVERITY", "BETWEEN"
        ));
        lines.push("-".repeat(104));
        for c in &self.conflicts {
            let pair = format!("{} / {}", c.improvement_a, c.improvement_b);
            let marker = if c.resolved { " (resolved)" } else { "" };
            lines.push(format!(
                "{:<36} {:<26} {:<9} {:<30}{marker}",
                c.id,
                c.conflict_type,
                c.severity,
                truncate(&pair, 30)
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ReportOutput {
    pub improvement_id: String,
    pub conflicts: Vec<ConflictOutput>,
    pub blocking_count: usize,
    pub warning_count: usize,
    pub blocking_reasons: Vec<String>,
    pub can_promote: bool,
}

impl From<&ConflictReport> for ReportOutput {
    fn from(report: &ConflictReport) -> Self {
        Self {
            improvement_id: report.improvement_id.clone(),
            conflicts: report.conflicts.iter().map(ConflictOutput::from).collect(),
            blocking_count: report.blocking_count,
            warning_count: report.warning_count,
            blocking_reasons: report.blocking_reasons.clone(),
            can_promote: report.can_promote,
        }
    }
}

impl CommandOutput for ReportOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Conflict report for {}", self.improvement_id),
            format!(
                "Blocking: {}  Warnings: {}  Can promote: {}",
                self.blocking_count, self.warning_count, self.can_promote
            ),
        ];
        if !self.blocking_reasons.is_empty() {
            lines.push("\nBlocking reasons:".to_string());
            for reason in &self.blocking_reasons {
                lines.push(format!("  - {reason}"));
            }
        }
        if !self.conflicts.is_empty() {
            lines.push("\nConflicts:".to_string());
            for c in &self.conflicts {
                lines.push(format!(
                    "  [{}] {} vs {}: {}",
                    c.severity, c.improvement_a, c.improvement_b, c.description
                ));
                lines.push(format!("    suggestion: {}", c.suggested_resolution));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ResolveOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for ResolveOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ConflictArgs, json_mode: bool) -> Result<()> {
    let ctx = CliContext::load()?;
    let detector = ctx.conflict_detector();

    match args.command {
        ConflictCommands::Detect { a, b } => {
            let conflicts = detector.detect_conflicts(&a, &b).await?;
            let out = ConflictListOutput {
                total: conflicts.len(),
                conflicts: conflicts.iter().map(ConflictOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        ConflictCommands::List {
            unresolved,
            improvement,
            conflict_type,
        } => {
            let conflict_type = match conflict_type {
                Some(t) => Some(
                    ConflictType::from_str(&t).ok_or_else(|| anyhow!("Invalid conflict type: {t}"))?,
                ),
                None => None,
            };
            let conflicts = detector
                .list_conflicts(ConflictFilter {
                    improvement_id: improvement,
                    conflict_type,
                    unresolved_only: unresolved,
                })
                .await?;
            let out = ConflictListOutput {
                total: conflicts.len(),
                conflicts: conflicts.iter().map(ConflictOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        ConflictCommands::Resolve { id, notes } => {
            let resolved = detector.resolve_conflict(id, &notes).await?;
            let out = ResolveOutput {
                success: resolved,
                message: if resolved {
                    format!("Conflict resolved: {id}")
                } else {
                    format!("Conflict not found: {id}")
                },
            };
            output(&out, json_mode);
        }

        ConflictCommands::Analyze { id } => {
            let report = detector.analyze_improvement(&id).await?;
            output(&ReportOutput::from(&report), json_mode);
        }

        ConflictCommands::CanPromote { id } => {
            let report = detector.can_promote(&id).await?;
            output(&ReportOutput::from(&report), json_mode);
        }
    }

    Ok(())
}
