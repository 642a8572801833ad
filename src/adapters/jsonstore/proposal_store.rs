//! File-backed proposal repository over `improvement_queue.json`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::document::load_or_default;
use crate::domain::errors::DomainResult;
use crate::domain::models::Proposal;
use crate::domain::ports::ProposalRepository;

/// On-disk shape: `{"proposals": {id: record}}`.
#[derive(Debug, Default, Deserialize)]
struct QueueDocument {
    #[serde(default)]
    proposals: BTreeMap<String, Proposal>,
}

pub struct JsonProposalStore {
    path: PathBuf,
}

impl JsonProposalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Vec<Proposal> {
        let doc: QueueDocument = load_or_default(&self.path).await;
        doc.proposals
            .into_iter()
            .map(|(id, mut proposal)| {
                proposal.id = id;
                proposal
            })
            .collect()
    }
}

#[async_trait]
impl ProposalRepository for JsonProposalStore {
    async fn get(&self, id: &str) -> DomainResult<Option<Proposal>> {
        Ok(self.load().await.into_iter().find(|p| p.id == id))
    }

    async fn list(&self) -> DomainResult<Vec<Proposal>> {
        Ok(self.load().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_generator_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("improvement_queue.json");
        tokio::fs::write(
            &path,
            r#"{"proposals": {
                "imp-1": {"problem_pattern": "p", "proposed_solution": "s", "status": "pending"},
                "imp-2": {"problem_pattern": "q", "proposed_solution": "t", "status": "rejected"}
            }}"#,
        )
        .await
        .unwrap();

        let store = JsonProposalStore::new(&path);
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "imp-1");

        assert!(store.get("imp-2").await.unwrap().is_some());
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_queue_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("improvement_queue.json");
        tokio::fs::write(&path, "oops").await.unwrap();
        let store = JsonProposalStore::new(&path);
        assert!(store.list().await.unwrap().is_empty());
    }
}
