//! Conflict store port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Conflict, ConflictType};

/// Filter criteria for listing conflicts.
#[derive(Debug, Clone, Default)]
pub struct ConflictFilter {
    pub improvement_id: Option<String>,
    pub conflict_type: Option<ConflictType>,
    pub unresolved_only: bool,
}

/// Persistence for detected conflicts.
#[async_trait]
pub trait ConflictRepository: Send + Sync {
    async fn insert(&self, conflict: &Conflict) -> DomainResult<()>;

    /// Unknown IDs are `Ok(None)`.
    async fn get(&self, conflict_id: Uuid) -> DomainResult<Option<Conflict>>;

    /// Replace a stored conflict (used by resolution).
    async fn update(&self, conflict: &Conflict) -> DomainResult<()>;

    async fn list(&self, filter: ConflictFilter) -> DomainResult<Vec<Conflict>>;
}
