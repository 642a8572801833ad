//! File-backed scope registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::document::{load_or_default, write_atomic};
use crate::domain::errors::DomainResult;
use crate::domain::models::ImprovementScope;
use crate::domain::ports::ScopeRepository;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScopeDocument {
    #[serde(default)]
    scopes: BTreeMap<String, ImprovementScope>,
}

pub struct JsonScopeStore {
    path: PathBuf,
}

impl JsonScopeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScopeRepository for JsonScopeStore {
    async fn get(&self, improvement_id: &str) -> DomainResult<Option<ImprovementScope>> {
        let doc: ScopeDocument = load_or_default(&self.path).await;
        Ok(doc.scopes.get(improvement_id).cloned())
    }

    async fn set(&self, scope: &ImprovementScope) -> DomainResult<()> {
        let mut doc: ScopeDocument = load_or_default(&self.path).await;
        let mut stored = scope.clone();
        // preserve the original creation time on overwrite
        if let Some(existing) = doc.scopes.get(&scope.improvement_id) {
            stored.created_at = existing.created_at;
        }
        stored.updated_at = chrono::Utc::now();
        doc.scopes.insert(stored.improvement_id.clone(), stored);
        write_atomic(&self.path, &doc).await
    }

    async fn all(&self) -> DomainResult<Vec<ImprovementScope>> {
        let doc: ScopeDocument = load_or_default(&self.path).await;
        Ok(doc.scopes.into_values().collect())
    }
}
