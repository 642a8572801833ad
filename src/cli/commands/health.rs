//! Health indicator CLI commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::CliContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{HealthAlert, HealthSnapshot, IndicatorKind, ThresholdTable};

#[derive(Args, Debug)]
pub struct HealthArgs {
    #[command(subcommand)]
    pub command: HealthCommands,
}

#[derive(Subcommand, Debug)]
pub enum HealthCommands {
    /// Compute a fresh snapshot of all indicators
    Snapshot,
    /// Show recent snapshots
    History {
        /// Maximum snapshots to display
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show thresholds, optionally updating one
    Thresholds {
        /// Update one threshold, as indicator:level:value
        #[arg(long)]
        set: Option<String>,
    },
    /// List alerts
    Alerts {
        /// Include resolved alerts
        #[arg(long)]
        all: bool,
    },
    /// Acknowledge an alert
    Acknowledge {
        /// Alert ID
        id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct SnapshotOutput {
    pub snapshot: HealthSnapshot,
}

impl CommandOutput for SnapshotOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Overall: {}  ({})",
            self.snapshot.overall_status.as_str(),
            self.snapshot.taken_at.format("%Y-%m-%d %H:%M UTC")
        )];
        for i in &self.snapshot.indicators {
            let value = i
                .value
                .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
            lines.push(format!(
                "  {:<22} {:<8} {:>6}  {}",
                i.kind.as_str(),
                i.status.as_str(),
                value,
                i.message
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HistoryOutput {
    pub snapshots: Vec<HealthSnapshot>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.snapshots.is_empty() {
            return "No snapshots recorded.".to_string();
        }
        self.snapshots
            .iter()
            .map(|s| {
                let indicators: Vec<String> = s
                    .indicators
                    .iter()
                    .map(|i| format!("{}={}", i.kind.as_str(), i.status.as_str()))
                    .collect();
                format!(
                    "{}  {:<8} {}",
                    s.taken_at.format("%Y-%m-%d %H:%M"),
                    s.overall_status.as_str(),
                    indicators.join(" ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ThresholdsOutput {
    pub thresholds: ThresholdTable,
}

impl CommandOutput for ThresholdsOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{:<22} {:>9} {:>9}",
            "INDICATOR", "GREEN_MAX", "AMBER_MAX"
        )];
        for kind in IndicatorKind::ALL {
            let t = self.thresholds.for_indicator(kind);
            lines.push(format!(
                "{:<22} {:>9.2} {:>9.2}",
                kind.as_str(),
                t.green_max,
                t.amber_max
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AlertListOutput {
    pub alerts: Vec<HealthAlert>,
    pub total: usize,
}

impl CommandOutput for AlertListOutput {
    fn to_human(&self) -> String {
        if self.alerts.is_empty() {
            return "No alerts.".to_string();
        }
        let mut lines = vec![format!("Found {} alert(s):\n", self.total)];
        for a in &self.alerts {
            let mut flags = Vec::new();
            if a.acknowledged {
                flags.push("acked");
            }
            if a.is_resolved() {
                flags.push("resolved");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            lines.push(format!(
                "{}  {:<22} {:<6} {}{flags}",
                a.id,
                a.indicator.as_str(),
                a.severity.as_str(),
                a.message
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AckOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for AckOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: HealthArgs, json_mode: bool) -> Result<()> {
    let ctx = CliContext::load()?;
    let manager = ctx.health_manager();

    match args.command {
        HealthCommands::Snapshot => {
            let snapshot = manager.get_health_snapshot().await?;
            output(&SnapshotOutput { snapshot }, json_mode);
        }

        HealthCommands::History { limit } => {
            let snapshots = manager.get_history(limit).await?;
            output(&HistoryOutput { snapshots }, json_mode);
        }

        HealthCommands::Thresholds { set } => {
            let thresholds = match set {
                Some(spec) => {
                    let parts: Vec<&str> = spec.splitn(3, ':').collect();
                    let &[indicator, level, value] = parts.as_slice() else {
                        return Err(anyhow!(
                            "Invalid --set '{spec}', expected indicator:level:value"
                        ));
                    };
                    let value: f64 = value
                        .parse()
                        .map_err(|_| anyhow!("Invalid threshold value: {value}"))?;
                    manager.set_threshold(indicator, level, value).await?
                }
                None => manager.get_thresholds().await?,
            };
            output(&ThresholdsOutput { thresholds }, json_mode);
        }

        HealthCommands::Alerts { all } => {
            let alerts = manager.list_alerts(all).await?;
            let out = AlertListOutput {
                total: alerts.len(),
                alerts,
            };
            output(&out, json_mode);
        }

        HealthCommands::Acknowledge { id } => {
            let acked = manager.acknowledge_alert(id).await?;
            let out = AckOutput {
                success: acked,
                message: if acked {
                    format!("Alert acknowledged: {id}")
                } else {
                    format!("Alert not found: {id}")
                },
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
