//! JSONL readers for the engine-written telemetry logs.

use async_trait::async_trait;
use std::path::PathBuf;

use super::document::read_jsonl;
use crate::domain::errors::DomainResult;
use crate::domain::models::{ExecutionRecord, RetrievalRecord};
use crate::domain::ports::{ExecutionLog, RetrievalLog};

pub struct JsonlExecutionLog {
    path: PathBuf,
}

impl JsonlExecutionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ExecutionLog for JsonlExecutionLog {
    async fn all_records(&self) -> DomainResult<Vec<ExecutionRecord>> {
        Ok(read_jsonl(&self.path).await)
    }
}

pub struct JsonlRetrievalLog {
    path: PathBuf,
}

impl JsonlRetrievalLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RetrievalLog for JsonlRetrievalLog {
    async fn all_outcomes(&self) -> DomainResult<Vec<RetrievalRecord>> {
        Ok(read_jsonl(&self.path).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_records_since_filters_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execution_log.jsonl");
        let now = Utc::now();
        let old = now - Duration::days(30);
        let lines = format!(
            "{}\n{}\n{}\n",
            serde_json::json!({"story_id": "s1", "status": "failed", "timestamp_start": now}),
            serde_json::json!({"story_id": "s2", "status": "failed", "timestamp_start": old}),
            serde_json::json!({"story_id": "s3", "status": "failed"}),
        );
        tokio::fs::write(&path, lines).await.unwrap();

        let log = JsonlExecutionLog::new(&path);
        assert_eq!(log.all_records().await.unwrap().len(), 3);
        let recent = log.records_since(now - Duration::days(7)).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].story_id, "s1");
    }

    #[tokio::test]
    async fn test_missing_log_is_empty() {
        let log = JsonlExecutionLog::new("/nonexistent/execution_log.jsonl");
        assert!(log.all_records().await.unwrap().is_empty());
    }
}
