//! Health indicator models: leading indicators, traffic-light thresholds,
//! snapshots, and alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// The four leading indicators watched by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// Trailing-7-day proposal rate over the 7-21 day baseline rate.
    ProposalRateChange,
    /// Max share of windowed failures attributable to one error type.
    ClusterConcentration,
    /// Fraction of retrievals whose outcome was "ignored".
    RetrievalMissRate,
    /// Fraction of executions tagged with an unrecognized domain.
    DomainDrift,
}

impl IndicatorKind {
    pub const ALL: [Self; 4] = [
        Self::ProposalRateChange,
        Self::ClusterConcentration,
        Self::RetrievalMissRate,
        Self::DomainDrift,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposalRateChange => "proposal_rate_change",
            Self::ClusterConcentration => "cluster_concentration",
            Self::RetrievalMissRate => "retrieval_miss_rate",
            Self::DomainDrift => "domain_drift",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "proposal_rate_change" => Some(Self::ProposalRateChange),
            "cluster_concentration" => Some(Self::ClusterConcentration),
            "retrieval_miss_rate" => Some(Self::RetrievalMissRate),
            "domain_drift" => Some(Self::DomainDrift),
            _ => None,
        }
    }
}

/// Traffic-light status of one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorStatus {
    Green,
    Amber,
    Red,
    /// Backing data entirely absent. Never reported as Green.
    Unknown,
}

impl IndicatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Amber => "amber",
            Self::Red => "red",
            Self::Unknown => "unknown",
        }
    }

    /// Severity rank for computing the overall status: Red > Amber >
    /// Unknown > Green, so missing telemetry never presents as healthy
    /// but never pages on its own either.
    pub fn severity_rank(&self) -> u8 {
        match self {
            Self::Green => 0,
            Self::Unknown => 1,
            Self::Amber => 2,
            Self::Red => 3,
        }
    }

    pub fn worst(statuses: impl IntoIterator<Item = Self>) -> Self {
        statuses
            .into_iter()
            .max_by_key(Self::severity_rank)
            .unwrap_or(Self::Unknown)
    }
}

/// Direction of an indicator relative to the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Falling,
    Flat,
    Unknown,
}

/// One computed indicator reading. Pure computation, embedded in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorValue {
    pub kind: IndicatorKind,
    /// The measured value; None when backing data is absent.
    pub value: Option<f64>,
    pub status: IndicatorStatus,
    pub trend: Trend,
    pub message: String,
    pub computed_at: DateTime<Utc>,
}

/// One full health reading; appended to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub taken_at: DateTime<Utc>,
    pub indicators: Vec<IndicatorValue>,
    pub overall_status: IndicatorStatus,
}

impl HealthSnapshot {
    pub fn indicator(&self, kind: IndicatorKind) -> Option<&IndicatorValue> {
        self.indicators.iter().find(|i| i.kind == kind)
    }
}

/// A raised alert with its lifecycle state.
///
/// Acknowledgment and resolution are independent: an operator may ack a
/// live alert, and an alert auto-resolves when its indicator returns green
/// whether or not anyone acknowledged it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlert {
    pub id: Uuid,
    pub indicator: IndicatorKind,
    pub severity: IndicatorStatus,
    pub message: String,
    pub value: Option<f64>,
    pub threshold: f64,
    #[serde(default)]
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl HealthAlert {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

/// Thresholds for one indicator. `amber_max` doubles as red_min: values at
/// or below `green_max` are green, at or below `amber_max` amber, above red.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorThresholds {
    pub green_max: f64,
    pub amber_max: f64,
}

impl IndicatorThresholds {
    pub fn classify(&self, value: f64) -> IndicatorStatus {
        if value <= self.green_max {
            IndicatorStatus::Green
        } else if value <= self.amber_max {
            IndicatorStatus::Amber
        } else {
            IndicatorStatus::Red
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.green_max > self.amber_max {
            return Err(DomainError::ValidationFailed(format!(
                "green_max ({}) must not exceed amber_max ({})",
                self.green_max, self.amber_max
            )));
        }
        Ok(())
    }
}

/// The full persisted threshold table, defaults supplied per indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub thresholds: BTreeMap<IndicatorKind, IndicatorThresholds>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let mut thresholds = BTreeMap::new();
        thresholds.insert(
            IndicatorKind::ProposalRateChange,
            IndicatorThresholds { green_max: 1.5, amber_max: 2.5 },
        );
        thresholds.insert(
            IndicatorKind::ClusterConcentration,
            IndicatorThresholds { green_max: 0.4, amber_max: 0.6 },
        );
        thresholds.insert(
            IndicatorKind::RetrievalMissRate,
            IndicatorThresholds { green_max: 0.3, amber_max: 0.5 },
        );
        thresholds.insert(
            IndicatorKind::DomainDrift,
            IndicatorThresholds { green_max: 0.2, amber_max: 0.4 },
        );
        Self { thresholds }
    }
}

impl ThresholdTable {
    pub fn for_indicator(&self, kind: IndicatorKind) -> IndicatorThresholds {
        self.thresholds.get(&kind).copied().unwrap_or_else(|| {
            ThresholdTable::default().thresholds[&kind]
        })
    }

    /// Set one threshold level, validated against known names and the
    /// green/amber ordering invariant.
    pub fn set(&mut self, kind: IndicatorKind, level: &str, value: f64) -> DomainResult<()> {
        let mut t = self.for_indicator(kind);
        match level {
            "green_max" => t.green_max = value,
            "amber_max" | "red_min" => t.amber_max = value,
            other => {
                return Err(DomainError::ValidationFailed(format!(
                    "unknown threshold level '{other}' (expected green_max or amber_max)"
                )))
            }
        }
        t.validate()?;
        self.thresholds.insert(kind, t);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_ordered() {
        let table = ThresholdTable::default();
        for kind in IndicatorKind::ALL {
            let t = table.for_indicator(kind);
            assert!(t.green_max <= t.amber_max, "{:?} misordered", kind);
        }
    }

    #[test]
    fn test_classification_boundaries() {
        let t = IndicatorThresholds { green_max: 0.4, amber_max: 0.6 };
        assert_eq!(t.classify(0.4), IndicatorStatus::Green);
        assert_eq!(t.classify(0.5), IndicatorStatus::Amber);
        assert_eq!(t.classify(0.6), IndicatorStatus::Amber);
        assert_eq!(t.classify(0.61), IndicatorStatus::Red);
    }

    #[test]
    fn test_worst_status_ordering() {
        use IndicatorStatus::{Amber, Green, Red, Unknown};
        assert_eq!(IndicatorStatus::worst([Green, Green]), Green);
        assert_eq!(IndicatorStatus::worst([Green, Unknown]), Unknown);
        assert_eq!(IndicatorStatus::worst([Unknown, Amber]), Amber);
        assert_eq!(IndicatorStatus::worst([Amber, Red, Green]), Red);
    }

    #[test]
    fn test_set_threshold_validates() {
        let mut table = ThresholdTable::default();
        assert!(table
            .set(IndicatorKind::DomainDrift, "green_max", 0.1)
            .is_ok());
        assert!(table
            .set(IndicatorKind::DomainDrift, "purple_max", 0.1)
            .is_err());
        // would invert the ordering
        assert!(table
            .set(IndicatorKind::DomainDrift, "green_max", 0.9)
            .is_err());
    }

    #[test]
    fn test_red_min_aliases_amber_max() {
        let mut table = ThresholdTable::default();
        table.set(IndicatorKind::RetrievalMissRate, "red_min", 0.7).unwrap();
        let t = table.for_indicator(IndicatorKind::RetrievalMissRate);
        assert!((t.amber_max - 0.7).abs() < f64::EPSILON);
    }
}
