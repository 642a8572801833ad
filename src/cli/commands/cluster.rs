//! Pattern clustering CLI commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{AccuracyMetrics, ClusterProposal, ClusterStatus};
use crate::services::ClusterStatistics;

#[derive(Args, Debug)]
pub struct ClusterArgs {
    #[command(subcommand)]
    pub command: ClusterCommands,
}

#[derive(Subcommand, Debug)]
pub enum ClusterCommands {
    /// Cluster active improvements by similarity
    Analyze {
        /// Minimum proposals per cluster (defaults to config)
        #[arg(long)]
        min_size: Option<usize>,
        /// Minimum pairwise similarity for merging (defaults to config)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// List clusters
    List {
        /// Filter by status (proposed, approved, rejected, merged)
        #[arg(short, long)]
        status: Option<String>,
        /// Only clusters below the high-confidence threshold
        #[arg(long)]
        needs_validation: bool,
        /// Only stale low-confidence clusters
        #[arg(long)]
        stale: bool,
    },
    /// Show one cluster in full
    Show {
        /// Cluster ID
        id: String,
    },
    /// Approve a cluster with its final generalization
    Approve {
        /// Cluster ID
        id: String,
        /// Final generalization text
        #[arg(short, long)]
        generalization: String,
        /// Review notes
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Reject a cluster with a reason
    Reject {
        /// Cluster ID
        id: String,
        /// Rejection reason
        #[arg(short, long)]
        reason: String,
    },
    /// Mark an approved cluster as merged into the queue
    #[command(name = "mark-merged")]
    MarkMerged {
        /// Cluster ID
        id: String,
    },
    /// Decision calibration metrics
    Accuracy,
    /// Cluster counts by status
    Stats,
}

#[derive(Debug, serde::Serialize)]
pub struct ClusterOutput {
    pub cluster_id: String,
    pub status: String,
    pub members: usize,
    pub confidence: f64,
    pub requires_validation: bool,
    pub domains: Vec<String>,
    pub generalization: String,
}

impl ClusterOutput {
    fn from_cluster(cluster: &ClusterProposal, high_confidence_threshold: f64) -> Self {
        Self {
            cluster_id: cluster.cluster_id.clone(),
            status: cluster.status.as_str().to_string(),
            members: cluster.members.len(),
            confidence: cluster.confidence,
            requires_validation: cluster.requires_human_validation(high_confidence_threshold),
            domains: cluster.domain_coverage.clone(),
            generalization: cluster.proposed_generalization.clone(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ClusterListOutput {
    pub clusters: Vec<ClusterOutput>,
    pub total: usize,
}

impl CommandOutput for ClusterListOutput {
    fn to_human(&self) -> String {
        if self.clusters.is_empty() {
            return "No clusters found.".to_string();
        }

        let mut lines = vec![format!("Found {} cluster(s):\n", self.total)];
        lines.push(format!(
            "{:<14} {:<9} {:>7} {:>10} {:<6} {:<40}",
            "ID", "STATUS", "MEMBERS", "CONFIDENCE", "REVIEW", "GENERALIZATION"
        ));
        lines.push("-".repeat(92));
        for c in &self.clusters {
            lines.push(format!(
                "{:<14} {:<9} {:>7} {:>10.2} {:<6} {:<40}",
                truncate(&c.cluster_id, 14),
                c.status,
                c.members,
                c.confidence,
                if c.requires_validation { "yes" } else { "no" },
                truncate(&c.generalization, 40)
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ClusterDetailOutput {
    pub cluster: ClusterOutput,
    pub member_ids: Vec<String>,
    pub review_notes: Option<String>,
}

impl CommandOutput for ClusterDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Cluster: {}", self.cluster.cluster_id),
            format!("Status: {}", self.cluster.status),
            format!("Confidence: {:.2}", self.cluster.confidence),
            format!("Requires validation: {}", self.cluster.requires_validation),
            format!("Domains: {}", self.cluster.domains.join(", ")),
            format!("Generalization: {}", self.cluster.generalization),
        ];
        lines.push("\nMembers:".to_string());
        for id in &self.member_ids {
            lines.push(format!("  - {id}"));
        }
        if let Some(notes) = &self.review_notes {
            lines.push(format!("\nReview notes: {notes}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ClusterActionOutput {
    pub success: bool,
    pub message: String,
    pub cluster: Option<ClusterOutput>,
}

impl CommandOutput for ClusterActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AccuracyOutput {
    pub metrics: AccuracyMetrics,
}

impl CommandOutput for AccuracyOutput {
    fn to_human(&self) -> String {
        let m = &self.metrics;
        if m.total_decisions == 0 {
            return "No decisions logged yet.".to_string();
        }
        vec![
            format!("Decisions: {}", m.total_decisions),
            format!("Agreement rate: {:.2}", m.agreement_rate),
            format!(
                "High confidence: {}/{} agreed",
                m.high_confidence_agreements, m.high_confidence_decisions
            ),
            format!(
                "Low confidence: {}/{} agreed",
                m.low_confidence_agreements, m.low_confidence_decisions
            ),
        ]
        .join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StatsOutput {
    pub stats: ClusterStatistics,
}

impl CommandOutput for StatsOutput {
    fn to_human(&self) -> String {
        let s = &self.stats;
        let mut lines = vec![format!("Total clusters: {}", s.total)];
        for (status, count) in &s.by_status {
            lines.push(format!("  {status}: {count}"));
        }
        lines.push(format!("Awaiting validation: {}", s.awaiting_validation));
        lines.push(format!("Average confidence: {:.2}", s.average_confidence));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn action_output(
    verb: &str,
    id: &str,
    cluster: Option<ClusterProposal>,
    threshold: f64,
) -> ClusterActionOutput {
    match cluster {
        Some(cluster) => ClusterActionOutput {
            success: true,
            message: format!("Cluster {verb}: {} (status: {})", id, cluster.status.as_str()),
            cluster: Some(ClusterOutput::from_cluster(&cluster, threshold)),
        },
        None => ClusterActionOutput {
            success: false,
            message: format!("Cluster not found: {id}"),
            cluster: None,
        },
    }
}

pub async fn execute(args: ClusterArgs, json_mode: bool) -> Result<()> {
    let ctx = CliContext::load()?;
    let manager = ctx.clustering_manager();
    let threshold = manager.high_confidence_threshold();

    match args.command {
        ClusterCommands::Analyze { min_size, threshold: sim } => {
            let created = manager
                .analyze_and_cluster(
                    min_size.unwrap_or(ctx.config.clustering.min_cluster_size),
                    sim.unwrap_or(ctx.config.clustering.similarity_threshold),
                )
                .await?;
            let out = ClusterListOutput {
                total: created.len(),
                clusters: created
                    .iter()
                    .map(|c| ClusterOutput::from_cluster(c, threshold))
                    .collect(),
            };
            output(&out, json_mode);
        }

        ClusterCommands::List {
            status,
            needs_validation,
            stale,
        } => {
            let clusters = if stale {
                manager.list_stale().await?
            } else if needs_validation {
                manager.list_requiring_validation().await?
            } else {
                let status = match status {
                    Some(s) => Some(
                        ClusterStatus::from_str(&s).ok_or_else(|| anyhow!("Invalid status: {s}"))?,
                    ),
                    None => None,
                };
                manager.list_by_status(status).await?
            };
            let out = ClusterListOutput {
                total: clusters.len(),
                clusters: clusters
                    .iter()
                    .map(|c| ClusterOutput::from_cluster(c, threshold))
                    .collect(),
            };
            output(&out, json_mode);
        }

        ClusterCommands::Show { id } => {
            let cluster = manager
                .get_cluster(&id)
                .await?
                .ok_or_else(|| anyhow!("Cluster not found: {id}"))?;
            let out = ClusterDetailOutput {
                member_ids: cluster.member_ids().iter().map(ToString::to_string).collect(),
                review_notes: cluster.review_notes.clone(),
                cluster: ClusterOutput::from_cluster(&cluster, threshold),
            };
            output(&out, json_mode);
        }

        ClusterCommands::Approve {
            id,
            generalization,
            notes,
        } => {
            let cluster = manager.approve(&id, &generalization, notes).await?;
            output(&action_output("approved", &id, cluster, threshold), json_mode);
        }

        ClusterCommands::Reject { id, reason } => {
            let cluster = manager.reject(&id, &reason).await?;
            output(&action_output("rejected", &id, cluster, threshold), json_mode);
        }

        ClusterCommands::MarkMerged { id } => {
            let cluster = manager.mark_merged(&id).await?;
            output(&action_output("merged", &id, cluster, threshold), json_mode);
        }

        ClusterCommands::Accuracy => {
            let metrics = manager.get_accuracy_metrics().await?;
            output(&AccuracyOutput { metrics }, json_mode);
        }

        ClusterCommands::Stats => {
            let stats = manager.statistics().await?;
            output(&StatsOutput { stats }, json_mode);
        }
    }

    Ok(())
}
