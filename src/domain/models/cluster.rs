//! Cluster models: groups of near-duplicate proposals and the audit ledger
//! of human decisions about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a cluster proposal.
///
/// Legal transitions: Proposed -> Approved | Rejected, Approved -> Merged.
/// Anything else is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    Proposed,
    Approved,
    Rejected,
    Merged,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Merged => "merged",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "proposed" => Some(Self::Proposed),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "merged" => Some(Self::Merged),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        matches!(
            (self, new_status),
            (Self::Proposed, Self::Approved)
                | (Self::Proposed, Self::Rejected)
                | (Self::Approved, Self::Merged)
        )
    }
}

/// One proposal's membership in a cluster. Always embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub proposal_id: String,
    pub problem_pattern: String,
    pub proposed_solution: String,
    pub similarity_to_centroid: f64,
    #[serde(default)]
    pub domains: Vec<String>,
}

/// A proposed generalization of two or more near-duplicate proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProposal {
    pub cluster_id: String,
    pub members: Vec<ClusterMember>,
    pub proposed_generalization: String,
    /// System confidence in the grouping, in [0, 1].
    pub confidence: f64,
    /// Union of member domains.
    pub domain_coverage: Vec<String>,
    pub status: ClusterStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_notes: Option<String>,
}

impl ClusterProposal {
    /// Whether a human must look at this grouping before it acts.
    ///
    /// Always derived from confidence so it stays correct after reload,
    /// never stored as a separate fact.
    pub fn requires_human_validation(&self, high_confidence_threshold: f64) -> bool {
        self.confidence < high_confidence_threshold
    }

    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.proposal_id.as_str()).collect()
    }

    /// Age of the cluster in whole days.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

/// The kind of decision a reviewer made about a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Approve,
    Reject,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// Append-only audit record of one cluster decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDecision {
    pub cluster_id: String,
    pub decision: DecisionType,
    /// System confidence at the time of the decision.
    pub system_confidence: f64,
    /// Whether confidence cleared the high-confidence threshold then.
    pub high_confidence: bool,
    pub decided_at: DateTime<Utc>,
}

impl ClusterDecision {
    /// Did the human agree with the system's leaning?
    ///
    /// For a high-confidence cluster the system leaned approve, so approval
    /// counts as agreement; for a low-confidence cluster it leaned reject.
    pub fn agreement(&self) -> bool {
        if self.high_confidence {
            self.decision == DecisionType::Approve
        } else {
            self.decision == DecisionType::Reject
        }
    }
}

/// Aggregated calibration signal over all logged decisions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccuracyMetrics {
    pub total_decisions: usize,
    pub agreements: usize,
    pub agreement_rate: f64,
    pub high_confidence_decisions: usize,
    pub high_confidence_agreements: usize,
    pub low_confidence_decisions: usize,
    pub low_confidence_agreements: usize,
}

impl AccuracyMetrics {
    pub fn from_decisions(decisions: &[ClusterDecision]) -> Self {
        let mut metrics = Self::default();
        for d in decisions {
            metrics.total_decisions += 1;
            let agreed = d.agreement();
            if agreed {
                metrics.agreements += 1;
            }
            if d.high_confidence {
                metrics.high_confidence_decisions += 1;
                if agreed {
                    metrics.high_confidence_agreements += 1;
                }
            } else {
                metrics.low_confidence_decisions += 1;
                if agreed {
                    metrics.low_confidence_agreements += 1;
                }
            }
        }
        if metrics.total_decisions > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                metrics.agreement_rate =
                    metrics.agreements as f64 / metrics.total_decisions as f64;
            }
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(confidence: f64) -> ClusterProposal {
        ClusterProposal {
            cluster_id: "cluster-1".into(),
            members: vec![],
            proposed_generalization: "g".into(),
            confidence,
            domain_coverage: vec![],
            status: ClusterStatus::Proposed,
            created_at: Utc::now(),
            decided_at: None,
            review_notes: None,
        }
    }

    #[test]
    fn test_transitions() {
        assert!(ClusterStatus::Proposed.can_transition_to(ClusterStatus::Approved));
        assert!(ClusterStatus::Proposed.can_transition_to(ClusterStatus::Rejected));
        assert!(ClusterStatus::Approved.can_transition_to(ClusterStatus::Merged));
        assert!(!ClusterStatus::Rejected.can_transition_to(ClusterStatus::Merged));
        assert!(!ClusterStatus::Proposed.can_transition_to(ClusterStatus::Merged));
        assert!(!ClusterStatus::Merged.can_transition_to(ClusterStatus::Proposed));
    }

    #[test]
    fn test_validation_derived_from_confidence() {
        assert!(cluster(0.5).requires_human_validation(0.8));
        assert!(!cluster(0.9).requires_human_validation(0.8));
        // exactly at the threshold clears it
        assert!(!cluster(0.8).requires_human_validation(0.8));
    }

    #[test]
    fn test_validation_survives_round_trip() {
        let c = cluster(0.42);
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("requires_human_validation"));
        let back: ClusterProposal = serde_json::from_str(&json).unwrap();
        assert!(back.requires_human_validation(0.8));
    }

    #[test]
    fn test_agreement_semantics() {
        let approve_high = ClusterDecision {
            cluster_id: "c".into(),
            decision: DecisionType::Approve,
            system_confidence: 0.9,
            high_confidence: true,
            decided_at: Utc::now(),
        };
        assert!(approve_high.agreement());

        let approve_low = ClusterDecision {
            high_confidence: false,
            ..approve_high.clone()
        };
        assert!(!approve_low.agreement());

        let reject_low = ClusterDecision {
            decision: DecisionType::Reject,
            high_confidence: false,
            ..approve_high.clone()
        };
        assert!(reject_low.agreement());
    }

    #[test]
    fn test_accuracy_with_no_decisions() {
        let metrics = AccuracyMetrics::from_decisions(&[]);
        assert_eq!(metrics.total_decisions, 0);
        assert!((metrics.agreement_rate - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_accuracy_aggregation() {
        let now = Utc::now();
        let decisions = vec![
            ClusterDecision {
                cluster_id: "a".into(),
                decision: DecisionType::Approve,
                system_confidence: 0.9,
                high_confidence: true,
                decided_at: now,
            },
            ClusterDecision {
                cluster_id: "b".into(),
                decision: DecisionType::Approve,
                system_confidence: 0.4,
                high_confidence: false,
                decided_at: now,
            },
        ];
        let metrics = AccuracyMetrics::from_decisions(&decisions);
        assert_eq!(metrics.total_decisions, 2);
        assert_eq!(metrics.agreements, 1);
        assert!((metrics.agreement_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(metrics.high_confidence_decisions, 1);
        assert_eq!(metrics.low_confidence_agreements, 0);
    }
}
