//! Health state persistence port: thresholds, snapshot history, alerts.
//!
//! Each of the three documents is independently deletable; deleting one
//! resets that piece of state without touching the others.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{HealthAlert, HealthSnapshot, ThresholdTable};

#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Load the threshold table, falling back to defaults when absent.
    async fn load_thresholds(&self) -> DomainResult<ThresholdTable>;

    async fn save_thresholds(&self, table: &ThresholdTable) -> DomainResult<()>;

    /// Append one snapshot to the history ledger.
    async fn append_snapshot(&self, snapshot: &HealthSnapshot) -> DomainResult<()>;

    /// Most recent snapshots, newest last, at most `limit`.
    async fn recent_snapshots(&self, limit: usize) -> DomainResult<Vec<HealthSnapshot>>;

    async fn load_alerts(&self) -> DomainResult<Vec<HealthAlert>>;

    async fn save_alerts(&self, alerts: &[HealthAlert]) -> DomainResult<()>;
}
