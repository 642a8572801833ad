//! On-disk root cause analysis cache.
//!
//! One file per cached analysis under the cache directory, named
//! `rca_<hash16>.json` where the key is the first 16 hex characters of
//! sha256(pattern_id). The resolved-patterns ledger lives alongside as
//! `resolved_patterns.json`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::warn;

use super::document::{load_or_default, write_atomic};
use crate::domain::errors::DomainResult;
use crate::domain::models::{ResolvedPattern, RootCauseAnalysis};
use crate::domain::ports::{AnalysisCache, CacheStats};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResolvedDocument {
    #[serde(default)]
    patterns: Vec<ResolvedPattern>,
}

pub struct FileAnalysisCache {
    dir: PathBuf,
}

impl FileAnalysisCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stable truncated key for a pattern ID.
    pub fn cache_key(pattern_id: &str) -> String {
        let digest = Sha256::digest(pattern_id.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        hex[..16].to_string()
    }

    fn entry_path(&self, pattern_id: &str) -> PathBuf {
        self.dir.join(format!("rca_{}.json", Self::cache_key(pattern_id)))
    }

    fn ledger_path(&self) -> PathBuf {
        self.dir.join("resolved_patterns.json")
    }

    async fn entry_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return files;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("rca_") && name.ends_with(".json") {
                files.push(entry.path());
            }
        }
        files
    }
}

#[async_trait]
impl AnalysisCache for FileAnalysisCache {
    async fn get(&self, pattern_id: &str) -> DomainResult<Option<RootCauseAnalysis>> {
        let path = self.entry_path(pattern_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read cache entry");
                return Ok(None);
            }
        };
        match serde_json::from_slice::<RootCauseAnalysis>(&bytes) {
            Ok(analysis) => Ok(Some(analysis)),
            Err(err) => {
                warn!(path = %path.display(), %err, "malformed cache entry, ignoring");
                Ok(None)
            }
        }
    }

    async fn put(&self, analysis: &RootCauseAnalysis) -> DomainResult<()> {
        write_atomic(&self.entry_path(&analysis.pattern_id), analysis).await
    }

    async fn list(&self) -> DomainResult<Vec<RootCauseAnalysis>> {
        let mut analyses = Vec::new();
        for path in self.entry_files().await {
            if let Ok(bytes) = tokio::fs::read(&path).await {
                match serde_json::from_slice(&bytes) {
                    Ok(analysis) => analyses.push(analysis),
                    Err(err) => {
                        warn!(path = %path.display(), %err, "skipping malformed cache entry");
                    }
                }
            }
        }
        Ok(analyses)
    }

    async fn stats(&self) -> DomainResult<CacheStats> {
        let mut stats = CacheStats::default();
        for path in self.entry_files().await {
            stats.entries += 1;
            if let Ok(meta) = tokio::fs::metadata(&path).await {
                stats.total_bytes += meta.len();
            }
        }
        Ok(stats)
    }

    async fn clear(&self) -> DomainResult<usize> {
        let mut removed = 0;
        for path in self.entry_files().await {
            if tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn resolved_patterns(&self) -> DomainResult<Vec<ResolvedPattern>> {
        let doc: ResolvedDocument = load_or_default(&self.ledger_path()).await;
        Ok(doc.patterns)
    }

    async fn record_resolved(&self, pattern: &ResolvedPattern) -> DomainResult<()> {
        let mut doc: ResolvedDocument = load_or_default(&self.ledger_path()).await;
        doc.patterns.retain(|p| p.pattern_id != pattern.pattern_id);
        doc.patterns.push(pattern.clone());
        write_atomic(&self.ledger_path(), &doc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AnalysisMethod;
    use chrono::Utc;

    fn analysis(pattern_id: &str) -> RootCauseAnalysis {
        RootCauseAnalysis {
            pattern_id: pattern_id.into(),
            why_chain: vec!["w".into(); 5],
            root_cause: "r".into(),
            capability_gap: "g".into(),
            counterfactual: "c".into(),
            confidence: 0.6,
            similar_patterns: vec![],
            analysis_method: AnalysisMethod::Heuristic,
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn test_cache_key_stable_and_truncated() {
        let k1 = FileAnalysisCache::cache_key("timeout::api call timed out");
        let k2 = FileAnalysisCache::cache_key("timeout::api call timed out");
        assert_eq!(k1, k2);
        assert_eq!(k1.len(), 16);
        assert_ne!(k1, FileAnalysisCache::cache_key("other"));
    }

    #[tokio::test]
    async fn test_put_get_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAnalysisCache::new(dir.path().join("analysis_cache"));

        assert!(cache.get("p1").await.unwrap().is_none());
        cache.put(&analysis("p1")).await.unwrap();
        cache.put(&analysis("p2")).await.unwrap();

        assert_eq!(cache.get("p1").await.unwrap().unwrap().pattern_id, "p1");
        assert_eq!(cache.list().await.unwrap().len(), 2);

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 2);
        assert!(stats.total_bytes > 0);

        assert_eq!(cache.clear().await.unwrap(), 2);
        assert!(cache.get("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolved_ledger_upserts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAnalysisCache::new(dir.path().join("analysis_cache"));

        let pattern = ResolvedPattern {
            pattern_id: "p1".into(),
            description: "timeouts on api calls".into(),
            resolution: "added retry with backoff".into(),
            resolved_at: Utc::now(),
        };
        cache.record_resolved(&pattern).await.unwrap();
        cache.record_resolved(&pattern).await.unwrap();
        assert_eq!(cache.resolved_patterns().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_survives_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAnalysisCache::new(dir.path().join("analysis_cache"));
        cache
            .record_resolved(&ResolvedPattern {
                pattern_id: "p1".into(),
                description: "d".into(),
                resolution: "r".into(),
                resolved_at: Utc::now(),
            })
            .await
            .unwrap();
        cache.put(&analysis("p1")).await.unwrap();
        cache.clear().await.unwrap();
        assert_eq!(cache.resolved_patterns().await.unwrap().len(), 1);
    }
}
