//! Root cause analysis models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recurring failure pattern clustered out of the execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePattern {
    /// Normalized signature, also the cache key input.
    pub pattern_id: String,
    pub error_type: String,
    /// Message with digits, paths, and quoted payloads stripped.
    pub normalized_message: String,
    pub occurrences: usize,
    /// Up to two concrete examples kept for the model prompt.
    #[serde(default)]
    pub examples: Vec<FailureExample>,
    #[serde(default)]
    pub domains: Vec<String>,
}

/// One concrete failure kept as evidence for a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureExample {
    pub story_id: String,
    pub error_message: String,
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
}

/// How an analysis was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    Llm,
    Heuristic,
    /// The model path failed and the heuristic answered instead. Recorded,
    /// never hidden.
    HeuristicFallback,
}

impl AnalysisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Heuristic => "heuristic",
            Self::HeuristicFallback => "heuristic_fallback",
        }
    }
}

/// A prior pattern with a known fix, similar to the one analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPattern {
    pub pattern_id: String,
    pub resolution: String,
    pub similarity: f64,
}

/// A five-whys analysis of one failure pattern.
///
/// Immutable once cached, barring explicit cache invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseAnalysis {
    pub pattern_id: String,
    /// Exactly five ordered "why" statements.
    pub why_chain: Vec<String>,
    pub root_cause: String,
    pub capability_gap: String,
    pub counterfactual: String,
    pub confidence: f64,
    /// At most three prior similar patterns with known fixes.
    #[serde(default)]
    pub similar_patterns: Vec<SimilarPattern>,
    pub analysis_method: AnalysisMethod,
    pub analyzed_at: DateTime<Utc>,
}

impl RootCauseAnalysis {
    /// Cap similar patterns at three, highest similarity first.
    pub fn with_similar_patterns(mut self, mut patterns: Vec<SimilarPattern>) -> Self {
        patterns.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        patterns.truncate(3);
        self.similar_patterns = patterns;
        self
    }
}

/// An entry in the resolved-patterns ledger: a pattern someone fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPattern {
    pub pattern_id: String,
    pub description: String,
    pub resolution: String,
    pub resolved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similar_patterns_capped_and_sorted() {
        let analysis = RootCauseAnalysis {
            pattern_id: "p".into(),
            why_chain: vec!["w1".into(); 5],
            root_cause: "r".into(),
            capability_gap: "g".into(),
            counterfactual: "c".into(),
            confidence: 0.6,
            similar_patterns: vec![],
            analysis_method: AnalysisMethod::Heuristic,
            analyzed_at: Utc::now(),
        };
        let patterns = (0..5)
            .map(|i| SimilarPattern {
                pattern_id: format!("p{i}"),
                resolution: "fix".into(),
                similarity: 0.7 + f64::from(i) * 0.01,
            })
            .collect();
        let analysis = analysis.with_similar_patterns(patterns);
        assert_eq!(analysis.similar_patterns.len(), 3);
        assert_eq!(analysis.similar_patterns[0].pattern_id, "p4");
    }
}
