//! Failure pattern clustering over the execution log.
//!
//! Raw failures are grouped by a normalized signature of error type and
//! message so that "timeout after 31s on /api/v2/users" and "timeout after
//! 7s on /api/v2/orders" land in the same pattern.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::domain::errors::DomainResult;
use crate::domain::models::{ExecutionRecord, FailureExample, FailurePattern};
use crate::domain::ports::ExecutionLog;

static QUOTED: OnceLock<Regex> = OnceLock::new();
static PATHLIKE: OnceLock<Regex> = OnceLock::new();
static DIGITS: OnceLock<Regex> = OnceLock::new();

/// Normalize an error message into signature form: lowercase, quoted
/// payloads and path-like tokens replaced with placeholders, digit runs
/// collapsed to `#`.
pub fn normalize_message(message: &str) -> String {
    let quoted = QUOTED.get_or_init(|| {
        Regex::new(r#""[^"]*"|'[^']*'"#).unwrap_or_else(|_| unreachable!())
    });
    let pathlike =
        PATHLIKE.get_or_init(|| Regex::new(r"\S*/\S+").unwrap_or_else(|_| unreachable!()));
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").unwrap_or_else(|_| unreachable!()));

    let lower = message.to_lowercase();
    let stripped = quoted.replace_all(&lower, "<val>");
    let stripped = pathlike.replace_all(&stripped, "<path>");
    let stripped = digits.replace_all(&stripped, "#");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Signature combining error type and normalized message.
pub fn failure_signature(record: &ExecutionRecord) -> Option<String> {
    let error_type = record.normalized_error_type()?;
    let message = normalize_message(record.error_message.as_deref().unwrap_or(""));
    Some(format!("{error_type}::{message}"))
}

pub struct FailurePatternClusterer<X: ExecutionLog> {
    log: Arc<X>,
}

impl<X: ExecutionLog> FailurePatternClusterer<X> {
    pub fn new(log: Arc<X>) -> Self {
        Self { log }
    }

    /// Group logged failures by signature, keeping patterns seen at least
    /// `min_occurrences` times, most frequent first.
    pub async fn cluster_failures(
        &self,
        min_occurrences: usize,
    ) -> DomainResult<Vec<FailurePattern>> {
        let records = self.log.all_records().await?;
        let mut by_signature: BTreeMap<String, FailurePattern> = BTreeMap::new();

        for record in records.iter().filter(|r| r.is_failure()) {
            let Some(signature) = failure_signature(record) else {
                continue;
            };
            let pattern = by_signature.entry(signature.clone()).or_insert_with(|| {
                FailurePattern {
                    pattern_id: signature.clone(),
                    error_type: record.normalized_error_type().unwrap_or_default(),
                    normalized_message: normalize_message(
                        record.error_message.as_deref().unwrap_or(""),
                    ),
                    occurrences: 0,
                    examples: Vec::new(),
                    domains: Vec::new(),
                }
            });
            pattern.occurrences += 1;
            if pattern.examples.len() < 2 {
                pattern.examples.push(FailureExample {
                    story_id: record.story_id.clone(),
                    error_message: record.error_message.clone().unwrap_or_default(),
                    context: record.context.clone(),
                });
            }
            if let Some(domain) = record.domain() {
                if !pattern.domains.iter().any(|d| d == domain) {
                    pattern.domains.push(domain.to_string());
                }
            }
        }

        let mut patterns: Vec<FailurePattern> = by_signature
            .into_values()
            .filter(|p| p.occurrences >= min_occurrences.max(1))
            .collect();
        patterns.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        Ok(patterns)
    }

    /// Find one pattern by its ID, regardless of occurrence count.
    pub async fn find_pattern(&self, pattern_id: &str) -> DomainResult<Option<FailurePattern>> {
        Ok(self
            .cluster_failures(1)
            .await?
            .into_iter()
            .find(|p| p.pattern_id == pattern_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_variance() {
        let a = normalize_message("Timeout after 31s on /api/v2/users");
        let b = normalize_message("timeout  after 7s on /api/v2/orders");
        assert_eq!(a, b);
        assert_eq!(a, "timeout after #s on <path>");
    }

    #[test]
    fn test_normalize_strips_quoted_payloads() {
        let a = normalize_message("no handler for tool 'browser_click'");
        let b = normalize_message("no handler for tool 'fetch_page'");
        assert_eq!(a, b);
        assert!(a.contains("<val>"));
    }

    fn record(error_type: &str, message: &str, domain: Option<&str>) -> ExecutionRecord {
        let mut context = serde_json::Map::new();
        if let Some(d) = domain {
            context.insert("domain".into(), serde_json::Value::String(d.into()));
        }
        ExecutionRecord {
            story_id: "s".into(),
            status: "failed".into(),
            error_type: Some(error_type.into()),
            error_message: Some(message.into()),
            timestamp_start: Some(chrono::Utc::now()),
            context,
            retry_count: 0,
            fallback_count: 0,
        }
    }

    struct StaticLog(Vec<ExecutionRecord>);

    #[async_trait::async_trait]
    impl ExecutionLog for StaticLog {
        async fn all_records(&self) -> DomainResult<Vec<ExecutionRecord>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_clusters_by_signature() {
        let log = Arc::new(StaticLog(vec![
            record("timeout", "timeout after 31s on /a/b", Some("api")),
            record("timeout", "timeout after 7s on /c/d", Some("web")),
            record("timeout", "timeout after 2s on /e/f", None),
            record("not_found", "no handler for tool 'x'", None),
        ]));
        let clusterer = FailurePatternClusterer::new(log);

        let patterns = clusterer.cluster_failures(2).await.unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].occurrences, 3);
        assert_eq!(patterns[0].error_type, "timeout");
        assert_eq!(patterns[0].examples.len(), 2);
        assert_eq!(patterns[0].domains, vec!["api".to_string(), "web".to_string()]);

        let all = clusterer.cluster_failures(1).await.unwrap();
        assert_eq!(all.len(), 2);
        // most frequent first
        assert_eq!(all[0].error_type, "timeout");
    }

    #[tokio::test]
    async fn test_successes_and_untyped_failures_skipped() {
        let mut success = record("timeout", "whatever", None);
        success.status = "success".into();
        let mut untyped = record("", "boom", None);
        untyped.error_type = None;
        let clusterer = FailurePatternClusterer::new(Arc::new(StaticLog(vec![success, untyped])));
        assert!(clusterer.cluster_failures(1).await.unwrap().is_empty());
    }
}
