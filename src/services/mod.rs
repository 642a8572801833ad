pub mod clustering;
pub mod conflict_detector;
pub mod failure_patterns;
pub mod health;
pub mod root_cause;

pub use clustering::{ClusterStatistics, ClusteringManager};
pub use conflict_detector::{infer_scope, suggest_resolution, ConflictDetector};
pub use failure_patterns::FailurePatternClusterer;
pub use health::HealthIndicatorsManager;
pub use root_cause::RootCauseAnalyzer;
