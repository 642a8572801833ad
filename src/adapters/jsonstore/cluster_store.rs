//! File-backed cluster store and JSONL decision ledger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::document::{append_jsonl, load_or_default, read_jsonl, write_atomic};
use crate::domain::errors::DomainResult;
use crate::domain::models::{ClusterDecision, ClusterProposal};
use crate::domain::ports::{ClusterFilter, ClusterRepository, DecisionLedger};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ClusterDocument {
    #[serde(default)]
    clusters: BTreeMap<String, ClusterProposal>,
}

pub struct JsonClusterStore {
    path: PathBuf,
}

impl JsonClusterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ClusterRepository for JsonClusterStore {
    async fn insert(&self, cluster: &ClusterProposal) -> DomainResult<()> {
        let mut doc: ClusterDocument = load_or_default(&self.path).await;
        doc.clusters.insert(cluster.cluster_id.clone(), cluster.clone());
        write_atomic(&self.path, &doc).await
    }

    async fn get(&self, cluster_id: &str) -> DomainResult<Option<ClusterProposal>> {
        let doc: ClusterDocument = load_or_default(&self.path).await;
        Ok(doc.clusters.get(cluster_id).cloned())
    }

    async fn update(&self, cluster: &ClusterProposal) -> DomainResult<()> {
        self.insert(cluster).await
    }

    async fn list(&self, filter: ClusterFilter) -> DomainResult<Vec<ClusterProposal>> {
        let doc: ClusterDocument = load_or_default(&self.path).await;
        Ok(doc
            .clusters
            .into_values()
            .filter(|c| filter.status.is_none_or(|s| c.status == s))
            .collect())
    }
}

/// Append-only decision ledger backed by `cluster_decisions.jsonl`.
pub struct JsonlDecisionLedger {
    path: PathBuf,
}

impl JsonlDecisionLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DecisionLedger for JsonlDecisionLedger {
    async fn append(&self, decision: &ClusterDecision) -> DomainResult<()> {
        append_jsonl(&self.path, decision).await
    }

    async fn all(&self) -> DomainResult<Vec<ClusterDecision>> {
        Ok(read_jsonl(&self.path).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ClusterStatus, DecisionType};
    use chrono::Utc;

    fn cluster(id: &str, status: ClusterStatus) -> ClusterProposal {
        ClusterProposal {
            cluster_id: id.into(),
            members: vec![],
            proposed_generalization: "g".into(),
            confidence: 0.5,
            domain_coverage: vec![],
            status,
            created_at: Utc::now(),
            decided_at: None,
            review_notes: None,
        }
    }

    #[tokio::test]
    async fn test_cluster_round_trip_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonClusterStore::new(dir.path().join("clusters.json"));

        store.insert(&cluster("c1", ClusterStatus::Proposed)).await.unwrap();
        store.insert(&cluster("c2", ClusterStatus::Approved)).await.unwrap();

        let proposed = store
            .list(ClusterFilter { status: Some(ClusterStatus::Proposed) })
            .await
            .unwrap();
        assert_eq!(proposed.len(), 1);
        assert_eq!(proposed[0].cluster_id, "c1");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decision_ledger_appends() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlDecisionLedger::new(dir.path().join("cluster_decisions.jsonl"));

        let decision = ClusterDecision {
            cluster_id: "c1".into(),
            decision: DecisionType::Approve,
            system_confidence: 0.9,
            high_confidence: true,
            decided_at: Utc::now(),
        };
        ledger.append(&decision).await.unwrap();
        ledger.append(&decision).await.unwrap();
        assert_eq!(ledger.all().await.unwrap().len(), 2);
    }
}
