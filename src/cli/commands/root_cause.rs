//! Root cause analysis CLI commands.

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{FailurePattern, ResolvedPattern, RootCauseAnalysis};
use crate::domain::ports::CacheStats;

#[derive(Args, Debug)]
pub struct RootCauseArgs {
    #[command(subcommand)]
    pub command: RootCauseCommands,
}

#[derive(Subcommand, Debug)]
pub enum RootCauseCommands {
    /// Analyze one failure pattern
    Analyze {
        /// Pattern ID (see `root-cause patterns`)
        pattern_id: String,
        /// Skip the analysis cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Analyze every frequent failure pattern
    Batch {
        /// Minimum occurrences (defaults to config)
        #[arg(long)]
        min_occurrences: Option<usize>,
    },
    /// List failure patterns found in the execution log
    Patterns {
        /// Minimum occurrences (defaults to 1)
        #[arg(long, default_value = "1")]
        min_occurrences: usize,
    },
    /// List cached analyses
    List,
    /// Record how a pattern was resolved
    Resolve {
        /// Pattern ID
        pattern_id: String,
        /// What fixed it
        #[arg(short, long)]
        resolution: String,
    },
    /// Show analysis cache statistics
    #[command(name = "cache-stats")]
    CacheStats,
    /// Delete all cached analyses
    #[command(name = "clear-cache")]
    ClearCache,
}

#[derive(Debug, serde::Serialize)]
pub struct AnalysisOutput {
    pub analysis: RootCauseAnalysis,
}

impl CommandOutput for AnalysisOutput {
    fn to_human(&self) -> String {
        let a = &self.analysis;
        let mut lines = vec![
            format!("Pattern: {}", a.pattern_id),
            format!(
                "Method: {}  Confidence: {:.2}",
                a.analysis_method.as_str(),
                a.confidence
            ),
            "\nWhy chain:".to_string(),
        ];
        for (i, why) in a.why_chain.iter().enumerate() {
            lines.push(format!("  {}. {why}", i + 1));
        }
        lines.push(format!("\nRoot cause: {}", a.root_cause));
        lines.push(format!("Capability gap: {}", a.capability_gap));
        lines.push(format!("Counterfactual: {}", a.counterfactual));
        if !a.similar_patterns.is_empty() {
            lines.push("\nSimilar resolved patterns:".to_string());
            for s in &a.similar_patterns {
                lines.push(format!(
                    "  {:.2}  {}: {}",
                    s.similarity, s.pattern_id, s.resolution
                ));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AnalysisListOutput {
    pub analyses: Vec<RootCauseAnalysis>,
    pub total: usize,
}

impl CommandOutput for AnalysisListOutput {
    fn to_human(&self) -> String {
        if self.analyses.is_empty() {
            return "No analyses found.".to_string();
        }
        let mut lines = vec![format!("Found {} analysis(es):\n", self.total)];
        lines.push(format!(
            "{:<40} {:<19} {:>10}  {}",
            "PATTERN", "METHOD", "CONFIDENCE", "ROOT CAUSE"
        ));
        lines.push("-".repeat(110));
        for a in &self.analyses {
            lines.push(format!(
                "{:<40} {:<19} {:>10.2}  {}",
                truncate(&a.pattern_id, 40),
                a.analysis_method.as_str(),
                a.confidence,
                truncate(&a.root_cause, 40)
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PatternListOutput {
    pub patterns: Vec<FailurePattern>,
    pub total: usize,
}

impl CommandOutput for PatternListOutput {
    fn to_human(&self) -> String {
        if self.patterns.is_empty() {
            return "No failure patterns found.".to_string();
        }
        let mut lines = vec![format!("Found {} pattern(s):\n", self.total)];
        lines.push(format!("{:>5}  {:<20} {}", "COUNT", "TYPE", "PATTERN"));
        lines.push("-".repeat(90));
        for p in &self.patterns {
            lines.push(format!(
                "{:>5}  {:<20} {}",
                p.occurrences,
                truncate(&p.error_type, 20),
                truncate(&p.pattern_id, 60)
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CacheStatsOutput {
    pub stats: CacheStats,
}

impl CommandOutput for CacheStatsOutput {
    fn to_human(&self) -> String {
        format!(
            "Cached analyses: {}  ({} bytes)",
            self.stats.entries, self.stats.total_bytes
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ActionOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for ActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RootCauseArgs, json_mode: bool) -> Result<()> {
    let ctx = CliContext::load()?;
    let analyzer = ctx.root_cause_analyzer();

    match args.command {
        RootCauseCommands::Analyze {
            pattern_id,
            no_cache,
        } => {
            let analysis = analyzer
                .analyze_by_id(&pattern_id, !no_cache)
                .await?
                .ok_or_else(|| anyhow!("Pattern not found in execution log: {pattern_id}"))?;
            output(&AnalysisOutput { analysis }, json_mode);
        }

        RootCauseCommands::Batch { min_occurrences } => {
            let analyses = analyzer.batch_analyze(min_occurrences).await?;
            let out = AnalysisListOutput {
                total: analyses.len(),
                analyses,
            };
            output(&out, json_mode);
        }

        RootCauseCommands::Patterns { min_occurrences } => {
            let patterns = ctx
                .failure_clusterer()
                .cluster_failures(min_occurrences)
                .await?;
            let out = PatternListOutput {
                total: patterns.len(),
                patterns,
            };
            output(&out, json_mode);
        }

        RootCauseCommands::List => {
            let analyses = analyzer.list_analyses().await?;
            let out = AnalysisListOutput {
                total: analyses.len(),
                analyses,
            };
            output(&out, json_mode);
        }

        RootCauseCommands::Resolve {
            pattern_id,
            resolution,
        } => {
            let pattern = ctx
                .failure_clusterer()
                .find_pattern(&pattern_id)
                .await?
                .ok_or_else(|| anyhow!("Pattern not found in execution log: {pattern_id}"))?;
            analyzer
                .record_resolved(&ResolvedPattern {
                    pattern_id: pattern.pattern_id.clone(),
                    description: format!("{} {}", pattern.error_type, pattern.normalized_message),
                    resolution,
                    resolved_at: Utc::now(),
                })
                .await?;
            let out = ActionOutput {
                success: true,
                message: format!("Resolution recorded for {pattern_id}"),
            };
            output(&out, json_mode);
        }

        RootCauseCommands::CacheStats => {
            let stats = analyzer.cache_stats().await?;
            output(&CacheStatsOutput { stats }, json_mode);
        }

        RootCauseCommands::ClearCache => {
            let removed = analyzer.clear_cache().await?;
            let out = ActionOutput {
                success: true,
                message: format!("Removed {removed} cached analysis(es)."),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
