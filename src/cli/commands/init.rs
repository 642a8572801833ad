//! Implementation of the `proctor init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};

const CONFIG_TEMPLATE: &str = "\
# Proctor configuration. Every value shown is the default; uncomment to
# override. PROCTOR_* environment variables win over this file
# (nested keys join with __, e.g. PROCTOR_CLUSTERING__MIN_CLUSTER_SIZE).

# state_dir: .proctor/state

# clustering:
#   high_confidence_threshold: 0.8
#   min_cluster_size: 2
#   similarity_threshold: 0.55
#   stale_age_days: 7

# health:
#   window_days: 7
#   baseline_days: 14
#   known_domains: [api, web, cli, data, testing]

# root_cause:
#   model_command: null
#   model_timeout_secs: 60
#   similar_pattern_threshold: 0.7
#   min_occurrences: 3
";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub directories_created: Vec<String>,
    pub config_written: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.config_written {
            lines.push("\nConfiguration written to .proctor/config.yaml".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let proctor_dir = target_path.join(".proctor");
    let config_path = proctor_dir.join("config.yaml");

    if config_path.exists() && !args.force {
        let out = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path,
            directories_created: vec![],
            config_written: false,
        };
        output(&out, json_mode);
        return Ok(());
    }

    let mut directories_created = vec![];
    let dirs = [
        proctor_dir.clone(),
        proctor_dir.join("state"),
        proctor_dir.join("state").join("analysis_cache"),
    ];
    for dir in &dirs {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let relative = dir
                .strip_prefix(&target_path)
                .unwrap_or(dir)
                .to_string_lossy()
                .to_string();
            directories_created.push(relative);
        }
    }

    fs::write(&config_path, CONFIG_TEMPLATE)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let out = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path,
        directories_created,
        config_written: true,
    };
    output(&out, json_mode);
    Ok(())
}
