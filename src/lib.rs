//! Proctor - Governance Pipeline for Self-Improving Agents
//!
//! Proctor supervises the self-improvement loop of an autonomous coding
//! agent: it detects conflicts between proposed improvements, clusters
//! near-duplicate proposals into generalizations, watches leading health
//! indicators over the pipeline's telemetry, and runs root cause analysis
//! over recurring failures.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, port traits, and errors
//! - **Service Layer** (`services`): The four pipeline components
//! - **Adapters** (`adapters`): JSON file stores and the model subprocess
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use proctor::cli::CliContext;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = CliContext::load()?;
//!     let report = ctx.conflict_detector().can_promote("imp-001").await?;
//!     println!("can promote: {}", report.can_promote);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AccuracyMetrics, ClusterProposal, ClusterStatus, Config, Conflict, ConflictReport,
    ConflictSeverity, ConflictType, ExecutionRecord, FailurePattern, HealthAlert, HealthSnapshot,
    ImprovementScope, IndicatorKind, IndicatorStatus, Proposal, RootCauseAnalysis, ThresholdTable,
};
pub use domain::ports::{
    AnalysisCache, ClusterRepository, ConflictRepository, EmbeddingProvider, ExecutionLog,
    HealthStore, ProposalRepository, RetrievalLog, RootCauseModel, ScopeRepository,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ClusteringManager, ConflictDetector, FailurePatternClusterer, HealthIndicatorsManager,
    RootCauseAnalyzer,
};
