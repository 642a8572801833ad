//! Domain models for the governance pipeline.

pub mod cluster;
pub mod config;
pub mod conflict;
pub mod execution;
pub mod health;
pub mod proposal;
pub mod root_cause;
pub mod scope;

pub use cluster::{
    AccuracyMetrics, ClusterDecision, ClusterMember, ClusterProposal, ClusterStatus, DecisionType,
};
pub use config::{ClusteringConfig, Config, HealthConfig, RootCauseConfig};
pub use conflict::{Conflict, ConflictReport, ConflictSeverity, ConflictType};
pub use execution::{ExecutionRecord, RetrievalOutcome, RetrievalRecord};
pub use health::{
    HealthAlert, HealthSnapshot, IndicatorKind, IndicatorStatus, IndicatorThresholds,
    IndicatorValue, ThresholdTable, Trend,
};
pub use proposal::Proposal;
pub use root_cause::{
    AnalysisMethod, FailureExample, FailurePattern, ResolvedPattern, RootCauseAnalysis,
    SimilarPattern,
};
pub use scope::{ImprovementScope, ResourceRef};
