//! Cluster store and decision ledger ports.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ClusterDecision, ClusterProposal, ClusterStatus};

/// Filter criteria for listing clusters.
#[derive(Debug, Clone, Default)]
pub struct ClusterFilter {
    pub status: Option<ClusterStatus>,
}

/// Persistence for cluster proposals.
#[async_trait]
pub trait ClusterRepository: Send + Sync {
    async fn insert(&self, cluster: &ClusterProposal) -> DomainResult<()>;

    /// Unknown IDs are `Ok(None)`.
    async fn get(&self, cluster_id: &str) -> DomainResult<Option<ClusterProposal>>;

    async fn update(&self, cluster: &ClusterProposal) -> DomainResult<()>;

    async fn list(&self, filter: ClusterFilter) -> DomainResult<Vec<ClusterProposal>>;
}

/// Append-only audit ledger of cluster decisions.
#[async_trait]
pub trait DecisionLedger: Send + Sync {
    async fn append(&self, decision: &ClusterDecision) -> DomainResult<()>;

    async fn all(&self) -> DomainResult<Vec<ClusterDecision>>;
}
