//! File-backed conflict store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

use super::document::{load_or_default, write_atomic};
use crate::domain::errors::DomainResult;
use crate::domain::models::Conflict;
use crate::domain::ports::{ConflictFilter, ConflictRepository};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConflictDocument {
    #[serde(default)]
    conflicts: BTreeMap<Uuid, Conflict>,
}

pub struct JsonConflictStore {
    path: PathBuf,
}

impl JsonConflictStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConflictRepository for JsonConflictStore {
    async fn insert(&self, conflict: &Conflict) -> DomainResult<()> {
        let mut doc: ConflictDocument = load_or_default(&self.path).await;
        doc.conflicts.insert(conflict.conflict_id, conflict.clone());
        write_atomic(&self.path, &doc).await
    }

    async fn get(&self, conflict_id: Uuid) -> DomainResult<Option<Conflict>> {
        let doc: ConflictDocument = load_or_default(&self.path).await;
        Ok(doc.conflicts.get(&conflict_id).cloned())
    }

    async fn update(&self, conflict: &Conflict) -> DomainResult<()> {
        self.insert(conflict).await
    }

    async fn list(&self, filter: ConflictFilter) -> DomainResult<Vec<Conflict>> {
        let doc: ConflictDocument = load_or_default(&self.path).await;
        Ok(doc
            .conflicts
            .into_values()
            .filter(|c| {
                filter
                    .improvement_id
                    .as_deref()
                    .is_none_or(|id| c.involves(id))
                    && filter.conflict_type.is_none_or(|t| c.conflict_type == t)
                    && (!filter.unresolved_only || !c.resolved)
            })
            .collect())
    }
}
