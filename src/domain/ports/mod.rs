//! Port interfaces between the governance services and their backends.

pub mod analysis_cache;
pub mod cluster_repository;
pub mod conflict_repository;
pub mod embedding;
pub mod execution_log;
pub mod health_store;
pub mod proposal_repository;
pub mod root_cause_model;
pub mod scope_repository;

pub use analysis_cache::{AnalysisCache, CacheStats};
pub use cluster_repository::{ClusterFilter, ClusterRepository, DecisionLedger};
pub use conflict_repository::{ConflictFilter, ConflictRepository};
pub use embedding::{cosine_similarity, EmbeddingProvider, NullEmbeddingProvider};
pub use execution_log::{ExecutionLog, RetrievalLog};
pub use health_store::HealthStore;
pub use proposal_repository::ProposalRepository;
pub use root_cause_model::{ModelAnalysis, NullRootCauseModel, RootCauseModel};
pub use scope_repository::ScopeRepository;
