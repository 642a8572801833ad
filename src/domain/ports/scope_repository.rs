//! Scope registry port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::ImprovementScope;

/// Persistence for declared/inferred improvement scopes.
///
/// One scope per improvement ID; `set` overwrites. Scopes are never deleted.
#[async_trait]
pub trait ScopeRepository: Send + Sync {
    async fn get(&self, improvement_id: &str) -> DomainResult<Option<ImprovementScope>>;

    async fn set(&self, scope: &ImprovementScope) -> DomainResult<()>;

    async fn all(&self) -> DomainResult<Vec<ImprovementScope>>;
}
