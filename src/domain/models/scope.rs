//! Improvement scope model.
//!
//! A scope is the declared or inferred blast-radius of a proposal: the
//! behaviors and domains it touches, its preconditions and effects, and the
//! shared resources it uses. Scopes are keyed by improvement ID, overwritten
//! on re-set, and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A shared resource a proposal touches, e.g. `{file, config.yaml}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Normalized form used for contention comparison.
    pub fn normalized(&self) -> (String, String) {
        (normalize(&self.kind), normalize(&self.name))
    }
}

/// Lowercase and collapse whitespace for set comparisons.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// The blast-radius of one improvement proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementScope {
    pub improvement_id: String,
    #[serde(default)]
    pub affected_behaviors: Vec<String>,
    #[serde(default)]
    pub domain_applicability: Vec<String>,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub resources_used: Vec<ResourceRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImprovementScope {
    pub fn new(improvement_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            improvement_id: improvement_id.into(),
            affected_behaviors: Vec::new(),
            domain_applicability: Vec::new(),
            preconditions: Vec::new(),
            effects: Vec::new(),
            resources_used: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_behaviors(mut self, behaviors: Vec<String>) -> Self {
        self.affected_behaviors = behaviors;
        self
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domain_applicability = domains;
        self
    }

    pub fn with_preconditions(mut self, preconditions: Vec<String>) -> Self {
        self.preconditions = preconditions;
        self
    }

    pub fn with_effects(mut self, effects: Vec<String>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_resources(mut self, resources: Vec<ResourceRef>) -> Self {
        self.resources_used = resources;
        self
    }

    /// A scope is complete when it declares at least one behavior, domain,
    /// or effect. Preconditions and resources alone say nothing about reach.
    pub fn is_complete(&self) -> bool {
        !self.affected_behaviors.is_empty()
            || !self.domain_applicability.is_empty()
            || !self.effects.is_empty()
    }

    /// Normalized behavior set for overlap comparison.
    pub fn behavior_set(&self) -> BTreeSet<String> {
        self.affected_behaviors.iter().map(|b| normalize(b)).collect()
    }

    /// Normalized domain set for overlap comparison.
    pub fn domain_set(&self) -> BTreeSet<String> {
        self.domain_applicability.iter().map(|d| normalize(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scope_is_incomplete() {
        let scope = ImprovementScope::new("imp-1");
        assert!(!scope.is_complete());
    }

    #[test]
    fn test_any_reach_field_completes() {
        let s = ImprovementScope::new("a").with_behaviors(vec!["retry".into()]);
        assert!(s.is_complete());
        let s = ImprovementScope::new("b").with_domains(vec!["api".into()]);
        assert!(s.is_complete());
        let s = ImprovementScope::new("c").with_effects(vec!["faster".into()]);
        assert!(s.is_complete());
        let s = ImprovementScope::new("d").with_preconditions(vec!["config".into()]);
        assert!(!s.is_complete());
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize("  Error   Handling "), "error handling");
        let s = ImprovementScope::new("a").with_behaviors(vec!["Retry  Logic".into()]);
        assert!(s.behavior_set().contains("retry logic"));
    }

    #[test]
    fn test_resource_normalized() {
        let a = ResourceRef::new("File", "Config.yaml ");
        let b = ResourceRef::new("file", "config.yaml");
        assert_eq!(a.normalized(), b.normalized());
    }
}
