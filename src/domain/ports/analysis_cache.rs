//! Analysis cache and resolved-patterns ledger ports.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ResolvedPattern, RootCauseAnalysis};

/// Cache statistics for the command surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

/// On-disk cache of root cause analyses, keyed by pattern ID.
///
/// No TTL and no automatic invalidation: recomputation is idempotent and
/// side-effect-free, so entries may always be regenerated after a clear.
#[async_trait]
pub trait AnalysisCache: Send + Sync {
    async fn get(&self, pattern_id: &str) -> DomainResult<Option<RootCauseAnalysis>>;

    async fn put(&self, analysis: &RootCauseAnalysis) -> DomainResult<()>;

    async fn list(&self) -> DomainResult<Vec<RootCauseAnalysis>>;

    async fn stats(&self) -> DomainResult<CacheStats>;

    /// Remove every cached analysis; returns how many were removed.
    async fn clear(&self) -> DomainResult<usize>;

    /// The ledger of patterns with known fixes.
    async fn resolved_patterns(&self) -> DomainResult<Vec<ResolvedPattern>>;

    async fn record_resolved(&self, pattern: &ResolvedPattern) -> DomainResult<()>;
}
