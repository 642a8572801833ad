//! JSON-file adapters for every persistence port.
//!
//! Each store is an independent file under the state directory, so any one
//! can be deleted to reset that component without touching the others.
//! Swapping in a transactional backend later only touches this module.

pub mod analysis_cache;
pub mod cluster_store;
pub mod conflict_store;
pub mod document;
pub mod execution_log;
pub mod health_store;
pub mod proposal_store;
pub mod scope_store;

pub use analysis_cache::FileAnalysisCache;
pub use cluster_store::{JsonClusterStore, JsonlDecisionLedger};
pub use conflict_store::JsonConflictStore;
pub use execution_log::{JsonlExecutionLog, JsonlRetrievalLog};
pub use health_store::JsonHealthStore;
pub use proposal_store::JsonProposalStore;
pub use scope_store::JsonScopeStore;

use std::path::{Path, PathBuf};

/// Well-known file names under the state directory.
pub struct StateLayout {
    pub root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn improvement_queue(&self) -> PathBuf {
        self.root.join("improvement_queue.json")
    }

    pub fn execution_log(&self) -> PathBuf {
        self.root.join("execution_log.jsonl")
    }

    pub fn retrieval_outcomes(&self) -> PathBuf {
        self.root.join("retrieval_outcomes.jsonl")
    }

    pub fn scope_registry(&self) -> PathBuf {
        self.root.join("scope_registry.json")
    }

    pub fn conflicts(&self) -> PathBuf {
        self.root.join("conflicts.json")
    }

    pub fn clusters(&self) -> PathBuf {
        self.root.join("clusters.json")
    }

    pub fn cluster_decisions(&self) -> PathBuf {
        self.root.join("cluster_decisions.jsonl")
    }

    pub fn analysis_cache(&self) -> PathBuf {
        self.root.join("analysis_cache")
    }

    pub fn health_dir(&self) -> &Path {
        &self.root
    }
}
