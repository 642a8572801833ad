//! Proposal repository port.
//!
//! The improvement queue is written by an external generator; this port is
//! read-only on purpose.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Proposal;

/// Read access to the externally-written improvement queue.
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    /// Get one proposal by ID. Unknown IDs are `Ok(None)`.
    async fn get(&self, id: &str) -> DomainResult<Option<Proposal>>;

    /// All proposals in the queue.
    async fn list(&self) -> DomainResult<Vec<Proposal>>;

    /// Proposals whose status is neither rejected nor merged.
    async fn list_active(&self) -> DomainResult<Vec<Proposal>> {
        Ok(self.list().await?.into_iter().filter(Proposal::is_active).collect())
    }
}
