//! File-backed health state: thresholds, snapshot history, alerts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::document::{append_jsonl, load_or_default, read_jsonl, write_atomic};
use crate::domain::errors::DomainResult;
use crate::domain::models::{HealthAlert, HealthSnapshot, ThresholdTable};
use crate::domain::ports::HealthStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AlertDocument {
    #[serde(default)]
    alerts: Vec<HealthAlert>,
}

/// Threshold document wrapper; `Option` distinguishes "file absent or
/// corrupt" (use defaults) from a stored table.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ThresholdDocument {
    #[serde(default)]
    table: Option<ThresholdTable>,
}

pub struct JsonHealthStore {
    thresholds_path: PathBuf,
    history_path: PathBuf,
    alerts_path: PathBuf,
}

impl JsonHealthStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            thresholds_path: state_dir.join("health_thresholds.json"),
            history_path: state_dir.join("health_history.jsonl"),
            alerts_path: state_dir.join("health_alerts.json"),
        }
    }
}

#[async_trait]
impl HealthStore for JsonHealthStore {
    async fn load_thresholds(&self) -> DomainResult<ThresholdTable> {
        let doc: ThresholdDocument = load_or_default(&self.thresholds_path).await;
        Ok(doc.table.unwrap_or_default())
    }

    async fn save_thresholds(&self, table: &ThresholdTable) -> DomainResult<()> {
        let doc = ThresholdDocument { table: Some(table.clone()) };
        write_atomic(&self.thresholds_path, &doc).await
    }

    async fn append_snapshot(&self, snapshot: &HealthSnapshot) -> DomainResult<()> {
        append_jsonl(&self.history_path, snapshot).await
    }

    async fn recent_snapshots(&self, limit: usize) -> DomainResult<Vec<HealthSnapshot>> {
        let mut snapshots: Vec<HealthSnapshot> = read_jsonl(&self.history_path).await;
        let skip = snapshots.len().saturating_sub(limit);
        Ok(snapshots.split_off(skip))
    }

    async fn load_alerts(&self) -> DomainResult<Vec<HealthAlert>> {
        let doc: AlertDocument = load_or_default(&self.alerts_path).await;
        Ok(doc.alerts)
    }

    async fn save_alerts(&self, alerts: &[HealthAlert]) -> DomainResult<()> {
        let doc = AlertDocument { alerts: alerts.to_vec() };
        write_atomic(&self.alerts_path, &doc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{IndicatorKind, IndicatorStatus};
    use chrono::Utc;

    #[tokio::test]
    async fn test_thresholds_default_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHealthStore::new(dir.path());
        let table = store.load_thresholds().await.unwrap();
        assert_eq!(table, ThresholdTable::default());
    }

    #[tokio::test]
    async fn test_thresholds_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHealthStore::new(dir.path());
        let mut table = ThresholdTable::default();
        table.set(IndicatorKind::DomainDrift, "green_max", 0.05).unwrap();
        store.save_thresholds(&table).await.unwrap();
        assert_eq!(store.load_thresholds().await.unwrap(), table);
    }

    #[tokio::test]
    async fn test_history_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHealthStore::new(dir.path());
        for _ in 0..5 {
            let snapshot = HealthSnapshot {
                taken_at: Utc::now(),
                indicators: vec![],
                overall_status: IndicatorStatus::Green,
            };
            store.append_snapshot(&snapshot).await.unwrap();
        }
        assert_eq!(store.recent_snapshots(3).await.unwrap().len(), 3);
        assert_eq!(store.recent_snapshots(10).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_alerts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHealthStore::new(dir.path());
        let alert = HealthAlert {
            id: uuid::Uuid::new_v4(),
            indicator: IndicatorKind::DomainDrift,
            severity: IndicatorStatus::Red,
            message: "drift".into(),
            value: Some(0.9),
            threshold: 0.4,
            acknowledged: false,
            created_at: Utc::now(),
            resolved_at: None,
        };
        store.save_alerts(&[alert.clone()]).await.unwrap();
        let back = store.load_alerts().await.unwrap();
        assert_eq!(back, vec![alert]);
    }
}
