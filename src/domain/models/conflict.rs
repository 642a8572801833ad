//! Conflict model: pairwise incompatibilities between improvement proposals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The dimension along which two proposals conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Solutions prescribe opposing behavior for the same behavior noun.
    BehavioralContradiction,
    /// Declared behavior/domain scopes intersect.
    ScopeOverlap,
    /// One side's effects negate the other's preconditions.
    DependencyConflict,
    /// Both sides touch the same shared resource.
    ResourceContention,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BehavioralContradiction => "behavioral_contradiction",
            Self::ScopeOverlap => "scope_overlap",
            Self::DependencyConflict => "dependency_conflict",
            Self::ResourceContention => "resource_contention",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "behavioral_contradiction" => Some(Self::BehavioralContradiction),
            "scope_overlap" => Some(Self::ScopeOverlap),
            "dependency_conflict" => Some(Self::DependencyConflict),
            "resource_contention" => Some(Self::ResourceContention),
            _ => None,
        }
    }
}

/// Whether a conflict blocks promotion or merely warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Blocking,
    Warning,
}

impl ConflictSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Warning => "warning",
        }
    }
}

/// A detected conflict between two improvement proposals.
///
/// Conflicts are persisted and mutated only via resolution; detection never
/// edits an existing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_id: Uuid,
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub improvement_a: String,
    pub improvement_b: String,
    pub description: String,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub resolution_notes: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl Conflict {
    pub fn new(
        conflict_type: ConflictType,
        severity: ConflictSeverity,
        improvement_a: impl Into<String>,
        improvement_b: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            conflict_id: Uuid::new_v4(),
            conflict_type,
            severity,
            improvement_a: improvement_a.into(),
            improvement_b: improvement_b.into(),
            description: description.into(),
            resolved: false,
            resolution_notes: None,
            detected_at: Utc::now(),
        }
    }

    /// Only unresolved blocking conflicts gate promotion.
    pub fn is_blocking(&self) -> bool {
        self.severity == ConflictSeverity::Blocking && !self.resolved
    }

    /// True if this conflict is between the given pair, in either order.
    pub fn involves_pair(&self, a: &str, b: &str) -> bool {
        (self.improvement_a == a && self.improvement_b == b)
            || (self.improvement_a == b && self.improvement_b == a)
    }

    pub fn involves(&self, id: &str) -> bool {
        self.improvement_a == id || self.improvement_b == id
    }

    pub fn resolve(&mut self, notes: impl Into<String>) {
        self.resolved = true;
        self.resolution_notes = Some(notes.into());
    }
}

/// Derived per-improvement conflict aggregate. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub improvement_id: String,
    pub conflicts: Vec<Conflict>,
    pub blocking_count: usize,
    pub warning_count: usize,
    pub blocking_reasons: Vec<String>,
    pub can_promote: bool,
}

impl ConflictReport {
    /// Aggregate a report from the conflicts involving one improvement.
    pub fn from_conflicts(improvement_id: impl Into<String>, conflicts: Vec<Conflict>) -> Self {
        let blocking: Vec<&Conflict> = conflicts.iter().filter(|c| c.is_blocking()).collect();
        let blocking_reasons = blocking.iter().map(|c| c.description.clone()).collect();
        let blocking_count = blocking.len();
        let warning_count = conflicts
            .iter()
            .filter(|c| c.severity == ConflictSeverity::Warning && !c.resolved)
            .count();
        Self {
            improvement_id: improvement_id.into(),
            can_promote: blocking_count == 0,
            blocking_count,
            warning_count,
            blocking_reasons,
            conflicts,
        }
    }
}
