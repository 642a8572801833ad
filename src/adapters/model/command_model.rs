//! Subprocess-backed root cause model.
//!
//! Runs a configured shell command, writes the prompt to its stdin, and
//! extracts a JSON object from whatever the command prints. The call is
//! bounded by a timeout; the analyzer above this adapter turns every
//! failure into a heuristic fallback.

use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::FailurePattern;
use crate::domain::ports::{ModelAnalysis, RootCauseModel};

pub struct CommandModel {
    command: String,
    timeout_secs: u64,
}

impl CommandModel {
    pub fn new(command: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            timeout_secs,
        }
    }

    fn build_prompt(pattern: &FailurePattern) -> String {
        let mut prompt = format!(
            "Analyze this recurring agent failure pattern and answer with a single JSON \
             object containing the keys why_chain (array of exactly 5 strings), root_cause, \
             capability_gap, counterfactual, and confidence (0 to 1).\n\n\
             Error type: {}\nNormalized message: {}\nOccurrences: {}\nDomains: {}\n",
            pattern.error_type,
            pattern.normalized_message,
            pattern.occurrences,
            pattern.domains.join(", "),
        );
        for example in pattern.examples.iter().take(2) {
            prompt.push_str(&format!(
                "\nExample failure (story {}): {}\n",
                example.story_id, example.error_message
            ));
        }
        prompt
    }
}

/// Pull the first JSON object out of free-form model output.
///
/// The regex anchors candidate starts; brace counting finds the matching
/// close so prose around or after the object is ignored.
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    let open = OPEN.get_or_init(|| Regex::new(r"\{").unwrap_or_else(|_| unreachable!()));

    for m in open.find_iter(text) {
        let start = m.start();
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (offset, ch) in text[start..].char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' if in_string => escaped = true,
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &text[start..=start + offset];
                        if let Ok(value) = serde_json::from_str(candidate) {
                            return Some(value);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    None
}

#[async_trait]
impl RootCauseModel for CommandModel {
    async fn analyze(&self, pattern: &FailurePattern) -> DomainResult<ModelAnalysis> {
        let prompt = Self::build_prompt(pattern);
        debug!(pattern_id = %pattern.pattern_id, "invoking model command");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::ModelFailed(format!("spawn failed: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| DomainError::ModelFailed(format!("stdin write failed: {e}")))?;
            drop(stdin);
        }

        let output = timeout(Duration::from_secs(self.timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| DomainError::ModelTimeout(self.timeout_secs))?
            .map_err(|e| DomainError::ModelFailed(format!("wait failed: {e}")))?;

        if !output.status.success() {
            return Err(DomainError::ModelFailed(format!(
                "command exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let value = extract_json_object(&stdout)
            .ok_or_else(|| DomainError::ModelFailed("no JSON object in reply".to_string()))?;
        let analysis: ModelAnalysis = serde_json::from_value(value)
            .map_err(|e| DomainError::ModelFailed(format!("unparsable reply: {e}")))?;

        if analysis.why_chain.len() != 5 {
            return Err(DomainError::ModelFailed(format!(
                "expected 5 why statements, got {}",
                analysis.why_chain.len()
            )));
        }
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FailureExample;

    fn pattern() -> FailurePattern {
        FailurePattern {
            pattern_id: "timeout::call timed out".into(),
            error_type: "timeout".into(),
            normalized_message: "call timed out".into(),
            occurrences: 4,
            examples: vec![FailureExample {
                story_id: "s1".into(),
                error_message: "call timed out after 30s".into(),
                context: serde_json::Map::new(),
            }],
            domains: vec!["api".into()],
        }
    }

    #[test]
    fn test_extract_from_prose() {
        let text = "Sure, here is the analysis:\n{\"a\": 1}\nHope that helps.";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_nested_and_strings_with_braces() {
        let text = r#"noise {"outer": {"inner": "has } brace"}} trailing"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["outer"]["inner"], "has } brace");
    }

    #[test]
    fn test_extract_none_when_absent() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{broken").is_none());
    }

    #[tokio::test]
    async fn test_echo_command_round_trip() {
        let reply = serde_json::json!({
            "why_chain": ["a", "b", "c", "d", "e"],
            "root_cause": "root",
            "capability_gap": "gap",
            "counterfactual": "cf",
            "confidence": 0.85
        });
        let model = CommandModel::new(format!("cat >/dev/null; echo '{reply}'"), 10);
        let analysis = model.analyze(&pattern()).await.unwrap();
        assert_eq!(analysis.root_cause, "root");
        assert_eq!(analysis.why_chain.len(), 5);
        assert!((analysis.confidence - 0.85).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let model = CommandModel::new("cat >/dev/null; exit 3", 10);
        assert!(matches!(
            model.analyze(&pattern()).await,
            Err(DomainError::ModelFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_error() {
        let model = CommandModel::new("cat >/dev/null; sleep 5", 1);
        assert!(matches!(
            model.analyze(&pattern()).await,
            Err(DomainError::ModelTimeout(1))
        ));
    }

    #[tokio::test]
    async fn test_wrong_why_count_is_error() {
        let reply = serde_json::json!({
            "why_chain": ["only", "three", "whys"],
            "root_cause": "r",
            "capability_gap": "g",
            "counterfactual": "c"
        });
        let model = CommandModel::new(format!("cat >/dev/null; echo '{reply}'"), 10);
        assert!(model.analyze(&pattern()).await.is_err());
    }
}
