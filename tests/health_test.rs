//! Integration tests for the health indicators over the JSON state files.

mod common;

use std::sync::Arc;

use proctor::adapters::jsonstore::{
    JsonHealthStore, JsonProposalStore, JsonlExecutionLog, JsonlRetrievalLog, StateLayout,
};
use proctor::domain::models::{HealthConfig, IndicatorKind, IndicatorStatus};
use proctor::services::HealthIndicatorsManager;

type Manager = HealthIndicatorsManager<
    JsonProposalStore,
    JsonlExecutionLog,
    JsonlRetrievalLog,
    JsonHealthStore,
>;

fn setup(state_dir: &std::path::Path) -> Manager {
    let layout = StateLayout::new(state_dir);
    HealthIndicatorsManager::new(
        Arc::new(JsonProposalStore::new(layout.improvement_queue())),
        Arc::new(JsonlExecutionLog::new(layout.execution_log())),
        Arc::new(JsonlRetrievalLog::new(layout.retrieval_outcomes())),
        Arc::new(JsonHealthStore::new(layout.health_dir())),
        HealthConfig::default(),
    )
}

#[tokio::test]
async fn test_no_data_is_unknown_not_green() {
    let dir = common::temp_state_dir();
    let manager = setup(dir.path());

    let snapshot = manager.get_health_snapshot().await.unwrap();

    assert_eq!(snapshot.overall_status, IndicatorStatus::Unknown);
    for indicator in &snapshot.indicators {
        assert_eq!(indicator.status, IndicatorStatus::Unknown);
        assert!(indicator.value.is_none());
    }
    // unknown indicators never page
    assert!(manager.list_alerts(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failure_concentration_goes_red() {
    let dir = common::temp_state_dir();
    for _ in 0..8 {
        common::append_failure(dir.path(), "timeout", "request timed out", Some("api"), 1);
    }
    common::append_failure(dir.path(), "parse_error", "bad json", Some("api"), 1);
    common::append_failure(dir.path(), "permission", "access denied", Some("api"), 1);
    let manager = setup(dir.path());

    let snapshot = manager.get_health_snapshot().await.unwrap();
    let concentration = snapshot
        .indicator(IndicatorKind::ClusterConcentration)
        .unwrap();

    assert_eq!(concentration.value, Some(0.8));
    assert_eq!(concentration.status, IndicatorStatus::Red);
    assert_eq!(snapshot.overall_status, IndicatorStatus::Red);

    let alerts = manager.list_alerts(false).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].indicator, IndicatorKind::ClusterConcentration);
    assert_eq!(alerts[0].severity, IndicatorStatus::Red);
}

#[tokio::test]
async fn test_alert_dedupe_and_auto_resolve() {
    let dir = common::temp_state_dir();
    for _ in 0..8 {
        common::append_failure(dir.path(), "timeout", "request timed out", Some("api"), 1);
    }
    common::append_failure(dir.path(), "parse_error", "bad json", Some("api"), 1);
    common::append_failure(dir.path(), "permission", "access denied", Some("api"), 1);
    let manager = setup(dir.path());

    manager.get_health_snapshot().await.unwrap();
    manager.get_health_snapshot().await.unwrap();
    // still exactly one open alert for the indicator
    assert_eq!(manager.list_alerts(false).await.unwrap().len(), 1);

    // widen the green band so the same data reads healthy, then snapshot:
    // the alert must auto-resolve without any acknowledgment
    manager
        .set_threshold("cluster_concentration", "amber_max", 0.95)
        .await
        .unwrap();
    manager
        .set_threshold("cluster_concentration", "green_max", 0.9)
        .await
        .unwrap();
    manager.get_health_snapshot().await.unwrap();

    assert!(manager.list_alerts(false).await.unwrap().is_empty());
    let all = manager.list_alerts(true).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_resolved());
    assert!(!all[0].acknowledged);
}

#[tokio::test]
async fn test_open_alert_escalates_when_indicator_worsens() {
    let dir = common::temp_state_dir();
    for _ in 0..8 {
        common::append_failure(dir.path(), "timeout", "request timed out", Some("api"), 1);
    }
    common::append_failure(dir.path(), "parse_error", "bad json", Some("api"), 1);
    common::append_failure(dir.path(), "permission", "access denied", Some("api"), 1);
    let manager = setup(dir.path());

    // widen the amber band so 0.8 concentration reads amber first
    manager
        .set_threshold("cluster_concentration", "amber_max", 0.9)
        .await
        .unwrap();
    manager.get_health_snapshot().await.unwrap();
    let alerts = manager.list_alerts(false).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, IndicatorStatus::Amber);
    let alert_id = alerts[0].id;

    // tighten it again: the same data now reads red, and the open alert
    // escalates in place rather than a second one being raised
    manager
        .set_threshold("cluster_concentration", "amber_max", 0.6)
        .await
        .unwrap();
    manager.get_health_snapshot().await.unwrap();
    let alerts = manager.list_alerts(true).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, alert_id);
    assert_eq!(alerts[0].severity, IndicatorStatus::Red);
    assert!((alerts[0].threshold - 0.6).abs() < f64::EPSILON);
    assert!(!alerts[0].is_resolved());
}

#[tokio::test]
async fn test_acknowledge_is_independent_of_resolution() {
    let dir = common::temp_state_dir();
    for _ in 0..5 {
        common::append_failure(dir.path(), "timeout", "request timed out", Some("api"), 1);
    }
    let manager = setup(dir.path());
    manager.get_health_snapshot().await.unwrap();

    let alerts = manager.list_alerts(false).await.unwrap();
    assert_eq!(alerts.len(), 1);

    assert!(manager.acknowledge_alert(alerts[0].id).await.unwrap());
    let alerts = manager.list_alerts(false).await.unwrap();
    assert!(alerts[0].acknowledged);
    assert!(!alerts[0].is_resolved());

    assert!(!manager.acknowledge_alert(uuid::Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn test_retrieval_miss_rate_amber_boundary() {
    let dir = common::temp_state_dir();
    common::append_retrieval(dir.path(), "helped", 1);
    common::append_retrieval(dir.path(), "used", 1);
    common::append_retrieval(dir.path(), "ignored", 2);
    common::append_retrieval(dir.path(), "ignored", 3);
    let manager = setup(dir.path());

    let snapshot = manager.get_health_snapshot().await.unwrap();
    let miss = snapshot.indicator(IndicatorKind::RetrievalMissRate).unwrap();

    assert_eq!(miss.value, Some(0.5));
    // default amber_max is exactly 0.5; boundary values stay amber
    assert_eq!(miss.status, IndicatorStatus::Amber);
}

#[tokio::test]
async fn test_domain_drift_counts_unrecognized_domains() {
    let dir = common::temp_state_dir();
    common::append_success(dir.path(), Some("api"), 1);
    common::append_success(dir.path(), Some("blockchain"), 1);
    common::append_success(dir.path(), Some("quantum"), 2);
    common::append_success(dir.path(), Some("web"), 2);
    let manager = setup(dir.path());

    let snapshot = manager.get_health_snapshot().await.unwrap();
    let drift = snapshot.indicator(IndicatorKind::DomainDrift).unwrap();

    assert_eq!(drift.value, Some(0.5));
    assert_eq!(drift.status, IndicatorStatus::Red);
}

#[tokio::test]
async fn test_proposal_rate_change_against_baseline() {
    let dir = common::temp_state_dir();
    // 7 proposals in the trailing week vs 7 over the 14-day baseline:
    // 1.0/day vs 0.5/day reads as a 2.0x rate change (amber by default)
    let mut entries = Vec::new();
    let ids: Vec<String> = (0..14).map(|i| format!("imp-{i}")).collect();
    for (i, id) in ids.iter().enumerate() {
        let days_ago = if i < 7 { 1 } else { 10 };
        entries.push((id.as_str(), "p", "s", days_ago));
    }
    seed_queue_with_ages(dir.path(), &entries);
    let manager = setup(dir.path());

    let snapshot = manager.get_health_snapshot().await.unwrap();
    let rate = snapshot.indicator(IndicatorKind::ProposalRateChange).unwrap();

    assert_eq!(rate.value, Some(2.0));
    assert_eq!(rate.status, IndicatorStatus::Amber);
}

#[tokio::test]
async fn test_thresholds_persist_and_validate() {
    let dir = common::temp_state_dir();
    let manager = setup(dir.path());

    manager
        .set_threshold("domain_drift", "green_max", 0.1)
        .await
        .unwrap();
    assert!(manager.set_threshold("domain_drift", "purple_max", 0.1).await.is_err());
    assert!(manager.set_threshold("no_such_indicator", "green_max", 0.1).await.is_err());

    // a fresh manager re-reads the persisted table
    let reloaded = setup(dir.path()).get_thresholds().await.unwrap();
    let t = reloaded.for_indicator(IndicatorKind::DomainDrift);
    assert!((t.green_max - 0.1).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_history_accumulates() {
    let dir = common::temp_state_dir();
    let manager = setup(dir.path());

    manager.get_health_snapshot().await.unwrap();
    manager.get_health_snapshot().await.unwrap();
    manager.get_health_snapshot().await.unwrap();

    assert_eq!(manager.get_history(2).await.unwrap().len(), 2);
    assert_eq!(manager.get_history(10).await.unwrap().len(), 3);
}

/// Seed the queue with per-proposal ages in days.
fn seed_queue_with_ages(state_dir: &std::path::Path, entries: &[(&str, &str, &str, i64)]) {
    let mut map = serde_json::Map::new();
    for (id, problem, solution, days_ago) in entries {
        map.insert(
            (*id).to_string(),
            serde_json::json!({
                "problem_pattern": problem,
                "proposed_solution": solution,
                "status": "pending",
                "affected_domains": [],
                "created_at": chrono::Utc::now() - chrono::Duration::days(*days_ago),
            }),
        );
    }
    let doc = serde_json::json!({ "proposals": map });
    std::fs::write(
        state_dir.join("improvement_queue.json"),
        serde_json::to_string_pretty(&doc).expect("serialize queue"),
    )
    .expect("write queue");
}
