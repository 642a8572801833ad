//! Read-only ports over the engine-written telemetry logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{ExecutionRecord, RetrievalRecord};

/// The append-only execution log written by the execution engine.
#[async_trait]
pub trait ExecutionLog: Send + Sync {
    /// All records; malformed lines are skipped with a warning.
    async fn all_records(&self) -> DomainResult<Vec<ExecutionRecord>>;

    /// Records whose start timestamp is at or after the cutoff. Records
    /// without a timestamp are excluded from windowed queries.
    async fn records_since(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<ExecutionRecord>> {
        Ok(self
            .all_records()
            .await?
            .into_iter()
            .filter(|r| r.timestamp_start.is_some_and(|t| t >= cutoff))
            .collect())
    }
}

/// The retrieval outcomes log, consumed only for the miss-rate indicator.
#[async_trait]
pub trait RetrievalLog: Send + Sync {
    async fn all_outcomes(&self) -> DomainResult<Vec<RetrievalRecord>>;

    async fn outcomes_since(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<RetrievalRecord>> {
        Ok(self
            .all_outcomes()
            .await?
            .into_iter()
            .filter(|r| r.timestamp.is_some_and(|t| t >= cutoff))
            .collect())
    }
}
