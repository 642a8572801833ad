//! Improvement proposal model.
//!
//! Proposals are written by an external generator into the improvement
//! queue; Proctor only reads them. Statuses are free-form strings from the
//! generator's lifecycle, so the model tolerates values it does not know.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate behavioral change to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Queue key; not serialized inside the record itself.
    #[serde(skip)]
    pub id: String,
    /// Description of the recurring problem this proposal addresses.
    #[serde(default)]
    pub problem_pattern: String,
    /// Proposed behavioral change.
    #[serde(default)]
    pub proposed_solution: String,
    /// Lifecycle status assigned by the external generator.
    #[serde(default = "default_status")]
    pub status: String,
    /// Domains the proposal claims to affect.
    #[serde(default)]
    pub affected_domains: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Fields the generator writes that Proctor does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_status() -> String {
    "pending".to_string()
}

impl Proposal {
    pub fn new(id: impl Into<String>, problem: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            problem_pattern: problem.into(),
            proposed_solution: solution.into(),
            status: default_status(),
            affected_domains: Vec::new(),
            created_at: Some(Utc::now()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.affected_domains = domains;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Rejected and merged proposals are excluded from conflict analysis
    /// and clustering; everything else counts as active.
    pub fn is_active(&self) -> bool {
        !matches!(self.status.as_str(), "rejected" | "merged")
    }

    /// Combined problem and solution text, used for similarity comparisons.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.problem_pattern, self.proposed_solution)
    }
}
