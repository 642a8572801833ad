//! Improvement scope CLI commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{ImprovementScope, ResourceRef};
use crate::domain::ports::ProposalRepository;
use crate::services::infer_scope;

#[derive(Args, Debug)]
pub struct ScopeArgs {
    #[command(subcommand)]
    pub command: ScopeCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScopeCommands {
    /// Declare the scope of an improvement
    Set {
        /// Improvement ID
        id: String,
        /// Behavior the improvement changes (repeatable)
        #[arg(short, long = "behavior")]
        behaviors: Vec<String>,
        /// Domain the improvement applies to (repeatable)
        #[arg(short, long = "domain")]
        domains: Vec<String>,
        /// Precondition the improvement assumes (repeatable)
        #[arg(short, long = "precondition")]
        preconditions: Vec<String>,
        /// Effect the improvement produces (repeatable)
        #[arg(short, long = "effect")]
        effects: Vec<String>,
        /// Resource used, as kind:name (repeatable)
        #[arg(short, long = "resource")]
        resources: Vec<String>,
    },
    /// Show the declared scope of an improvement
    Get {
        /// Improvement ID
        id: String,
    },
    /// Infer a scope from the improvement's text
    Infer {
        /// Improvement ID
        id: String,
        /// Persist the inferred scope to the registry
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ScopeOutput {
    pub improvement_id: String,
    pub behaviors: Vec<String>,
    pub domains: Vec<String>,
    pub preconditions: Vec<String>,
    pub effects: Vec<String>,
    pub resources: Vec<String>,
    pub complete: bool,
}

impl From<&ImprovementScope> for ScopeOutput {
    fn from(scope: &ImprovementScope) -> Self {
        Self {
            improvement_id: scope.improvement_id.clone(),
            behaviors: scope.affected_behaviors.clone(),
            domains: scope.domain_applicability.clone(),
            preconditions: scope.preconditions.clone(),
            effects: scope.effects.clone(),
            resources: scope
                .resources_used
                .iter()
                .map(|r| format!("{}:{}", r.kind, r.name))
                .collect(),
            complete: scope.is_complete(),
        }
    }
}

impl CommandOutput for ScopeOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Scope for {}", self.improvement_id)];
        let sections = [
            ("Behaviors", &self.behaviors),
            ("Domains", &self.domains),
            ("Preconditions", &self.preconditions),
            ("Effects", &self.effects),
            ("Resources", &self.resources),
        ];
        for (label, items) in sections {
            if items.is_empty() {
                lines.push(format!("{label}: (none)"));
            } else {
                lines.push(format!("{label}: {}", items.join(", ")));
            }
        }
        lines.push(format!("Complete: {}", self.complete));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn parse_resource(spec: &str) -> Result<ResourceRef> {
    let (kind, name) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid resource '{spec}', expected kind:name"))?;
    Ok(ResourceRef::new(kind, name))
}

pub async fn execute(args: ScopeArgs, json_mode: bool) -> Result<()> {
    let ctx = CliContext::load()?;
    let detector = ctx.conflict_detector();

    match args.command {
        ScopeCommands::Set {
            id,
            behaviors,
            domains,
            preconditions,
            effects,
            resources,
        } => {
            let resources = resources
                .iter()
                .map(|r| parse_resource(r))
                .collect::<Result<Vec<_>>>()?;
            let scope = ImprovementScope::new(id)
                .with_behaviors(behaviors)
                .with_domains(domains)
                .with_preconditions(preconditions)
                .with_effects(effects)
                .with_resources(resources);
            detector.set_scope(&scope).await?;
            output(&ScopeOutput::from(&scope), json_mode);
        }

        ScopeCommands::Get { id } => {
            let scope = detector
                .get_scope(&id)
                .await?
                .ok_or_else(|| anyhow!("No scope declared for improvement: {id}"))?;
            output(&ScopeOutput::from(&scope), json_mode);
        }

        ScopeCommands::Infer { id, save } => {
            let proposal = ctx
                .proposals()
                .get(&id)
                .await?
                .ok_or_else(|| anyhow!("Improvement not found: {id}"))?;
            let scope = infer_scope(&proposal);
            if save {
                detector.set_scope(&scope).await?;
            }
            output(&ScopeOutput::from(&scope), json_mode);
        }
    }

    Ok(())
}
