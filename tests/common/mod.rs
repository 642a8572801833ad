//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers for seeding the JSON state files
//! the external generator and execution engine would normally write.

use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tempfile::TempDir;

/// Create a temporary state directory for test isolation
pub fn temp_state_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write an improvement queue with the given (id, problem, solution, domains)
/// entries, all pending.
pub fn seed_queue(state_dir: &Path, proposals: &[(&str, &str, &str, &[&str])]) {
    let mut map = serde_json::Map::new();
    for (id, problem, solution, domains) in proposals {
        map.insert(
            (*id).to_string(),
            serde_json::json!({
                "problem_pattern": problem,
                "proposed_solution": solution,
                "status": "pending",
                "affected_domains": domains,
                "created_at": Utc::now(),
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

/// Append one failed execution to the log, `days_ago` days in the past.
#[allow(dead_code)]
pub fn append_failure(
    state_dir: &Path,
    error_type: &str,
    error_message: &str,
    domain: Option<&str>,
    days_ago: i64,
) {
    let mut record = serde_json::json!({
        "story_id": format!("story-{error_type}"),
        "status": "failed",
        "error_type": error_type,
        "error_message": error_message,
        "timestamp_start": ts(days_ago),
    });
    if let Some(d) = domain {
        record["context"] = serde_json::json!({ "domain": d });
    }
    append_jsonl(state_dir, "execution_log.jsonl", &record);
}

/// Append one successful execution, `days_ago` days in the past.
#[allow(dead_code)]
pub fn append_success(state_dir: &Path, domain: Option<&str>, days_ago: i64) {
    let mut record = serde_json::json!({
        "story_id": "story-ok",
        "status": "success",
        "timestamp_start": ts(days_ago),
    });
    if let Some(d) = domain {
        record["context"] = serde_json::json!({ "domain": d });
    }
    append_jsonl(state_dir, "execution_log.jsonl", &record);
}

/// Append one retrieval outcome, `days_ago` days in the past.
#[allow(dead_code)]
pub fn append_retrieval(state_dir: &Path, outcome: &str, days_ago: i64) {
    let record = serde_json::json!({
        "outcome": outcome,
        "timestamp": ts(days_ago),
    });
    append_jsonl(state_dir, "retrieval_outcomes.jsonl", &record);
}

fn ts(days_ago: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days_ago)
}

fn append_jsonl(state_dir: &Path, file: &str, record: &serde_json::Value) {
    use std::io::Write;
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(state_dir.join(file))
        .expect("open jsonl");
    writeln!(f, "{}", serde_json::to_string(record).expect("serialize record"))
        .expect("append jsonl");
}
