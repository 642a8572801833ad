//! Execution log and retrieval outcome records.
//!
//! Both logs are append-only JSONL written by the execution engine; Proctor
//! only reads them. The `context` field is accepted both as a JSON object
//! and as a JSON-encoded string, since older engine versions wrote the
//! latter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One agent execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    #[serde(default)]
    pub story_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub timestamp_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_context")]
    pub context: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub fallback_count: u32,
}

impl ExecutionRecord {
    pub fn is_failure(&self) -> bool {
        matches!(self.status.as_str(), "failed" | "error" | "failure")
    }

    /// The domain this execution ran in, if the engine tagged one.
    pub fn domain(&self) -> Option<&str> {
        self.context.get("domain").and_then(|v| v.as_str())
    }

    /// Normalized error type for concentration grouping.
    pub fn normalized_error_type(&self) -> Option<String> {
        self.error_type
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
    }
}

fn deserialize_context<'de, D>(
    deserializer: D,
) -> Result<serde_json::Map<String, serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Object(map) => map,
        // legacy engines wrote the context object JSON-encoded as a string
        serde_json::Value::String(s) => serde_json::from_str::<serde_json::Value>(&s)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default(),
        _ => serde_json::Map::new(),
    })
}

/// How a retrieved memory fared during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalOutcome {
    Helped,
    Used,
    Ignored,
}

/// One retrieval outcome record from `retrieval_outcomes.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRecord {
    pub outcome: RetrievalOutcome,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub query: Option<String>,
}
