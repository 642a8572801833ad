//! Root cause analysis: cache-first, model-assisted when configured, always
//! able to fall back to the heuristic category table.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AnalysisMethod, FailurePattern, ResolvedPattern, RootCauseAnalysis, RootCauseConfig,
    SimilarPattern,
};
use crate::domain::ports::{AnalysisCache, CacheStats, ExecutionLog, RootCauseModel};

use super::failure_patterns::FailurePatternClusterer;

/// One entry in the fixed heuristic category table.
struct Category {
    name: &'static str,
    keywords: &'static [&'static str],
    whys: [&'static str; 5],
    root_cause: &'static str,
    capability_gap: &'static str,
    counterfactual: &'static str,
}

/// The fixed category table. Declaration order is the tie-break: when two
/// categories score the same keyword-hit count, the earlier one wins.
const CATEGORIES: &[Category] = &[
    Category {
        name: "missing_tool",
        keywords: &[
            "no handler",
            "missing tool",
            "unknown tool",
            "no such tool",
            "not implemented",
            "unsupported operation",
        ],
        whys: [
            "The operation failed because no tool or handler accepted it",
            "No handler accepted it because the required capability is not registered",
            "It is not registered because the toolset was assembled before this need existed",
            "The toolset predates the need because capability coverage is not reviewed against incoming work",
            "Coverage is not reviewed because there is no feedback loop from failures to toolset curation",
        ],
        root_cause: "Missing tool or handler for required operation",
        capability_gap: "Tool registry lacks a handler for this operation class",
        counterfactual: "With a registered handler for this operation, the task would have executed instead of failing",
    },
    Category {
        name: "ui_automation",
        keywords: &["element not found", "selector", "click", "screenshot", "viewport", "xpath"],
        whys: [
            "The UI interaction failed to locate or act on its target",
            "The target was missed because selectors assume a fixed page structure",
            "Structure is assumed because the agent does not verify state before acting",
            "State goes unverified because no wait-and-observe step exists in the flow",
            "No such step exists because UI flows were modeled as deterministic sequences",
        ],
        root_cause: "UI automation assumes page state instead of observing it",
        capability_gap: "No state verification before UI actions",
        counterfactual: "With an observe-before-act step, the interaction would have waited for or re-located its target",
    },
    Category {
        name: "permission",
        keywords: &["permission denied", "access denied", "forbidden", "unauthorized", "eacces"],
        whys: [
            "The operation was refused by an authorization check",
            "It was refused because the agent ran without the needed privilege",
            "The privilege was absent because required access is not declared up front",
            "Access is not declared because tasks carry no permission manifest",
            "No manifest exists because permission needs were assumed uniform across tasks",
        ],
        root_cause: "Task executed without the privileges it requires",
        capability_gap: "No pre-flight permission check or privilege declaration",
        counterfactual: "With declared permissions checked before execution, the task would have been routed or escalated instead of failing",
    },
    Category {
        name: "network",
        keywords: &["connection refused", "timeout", "timed out", "dns", "unreachable", "socket"],
        whys: [
            "A remote call failed to complete",
            "It failed because the network path or peer was unavailable within limits",
            "Limits were exceeded because the call had no adaptive retry or budget",
            "No budget exists because transient network failure was treated as exceptional",
            "It was treated as exceptional because failure statistics are not fed back into call policy",
        ],
        root_cause: "Network calls lack adaptive retry and timeout budgets",
        capability_gap: "No resilient remote-call policy tuned from observed failure rates",
        counterfactual: "With retry and budget policy, the transient failure would have been absorbed",
    },
    Category {
        name: "parsing",
        keywords: &["parse", "unexpected token", "invalid json", "malformed", "decode", "syntax"],
        whys: [
            "Structured data failed to parse",
            "It failed because the input deviated from the expected shape",
            "Deviation surprises the parser because inputs are trusted rather than validated",
            "Inputs are trusted because producers and consumers share no schema contract",
            "No contract exists because data shapes evolved informally",
        ],
        root_cause: "Input data shape is assumed rather than validated against a contract",
        capability_gap: "No tolerant parsing or schema validation at data boundaries",
        counterfactual: "With boundary validation, the malformed input would have been repaired or rejected early with a clear error",
    },
    Category {
        name: "file_handling",
        keywords: &["no such file", "file not found", "enoent", "directory", "is a directory", "broken pipe"],
        whys: [
            "A filesystem operation failed on its target path",
            "It failed because the expected file or directory was not in the assumed location",
            "Location was assumed because paths are constructed without existence checks",
            "Existence is unchecked because file layout was stable when the flow was written",
            "Layout assumptions persist because filesystem errors are not analyzed for drift",
        ],
        root_cause: "File paths are assumed valid instead of verified",
        capability_gap: "No existence or layout verification before filesystem operations",
        counterfactual: "With path verification, the operation would have created, located, or reported the missing target explicitly",
    },
    Category {
        name: "state_management",
        keywords: &["stale", "already exists", "conflict", "locked", "out of sync", "dirty"],
        whys: [
            "The operation found state different from what it expected",
            "State diverged because another actor or earlier step changed it",
            "Divergence goes unnoticed because state is read once and assumed stable",
            "It is assumed stable because operations do not re-validate before mutating",
            "No re-validation exists because concurrent mutation was not a design consideration",
        ],
        root_cause: "Shared state is assumed stable between read and mutation",
        capability_gap: "No state re-validation or conflict handling around mutations",
        counterfactual: "With re-validation before mutating, the stale state would have been refreshed or the operation retried",
    },
    Category {
        name: "api_interaction",
        keywords: &["rate limit", "429", "quota", "bad request", "api error", "invalid response"],
        whys: [
            "An API interaction was rejected by the remote service",
            "It was rejected because the request violated the service's current contract or limits",
            "The contract was violated because client behavior is static while the service's rules are not",
            "Behavior is static because responses are not used to adapt request patterns",
            "No adaptation exists because API interactions lack a feedback-driven policy layer",
        ],
        root_cause: "API client behavior does not adapt to service contracts and limits",
        capability_gap: "No adaptive request policy for external APIs",
        counterfactual: "With response-aware pacing and request validation, the call would have been reshaped or deferred instead of rejected",
    },
];

const GENERIC_WHYS: [&str; 5] = [
    "The task failed in a way no known category explains",
    "It is unexplained because the failure signature matches no curated pattern",
    "No pattern matches because this failure mode has not recurred enough to be studied",
    "It has not been studied because analysis effort follows frequency",
    "Frequency-driven analysis leaves novel failures without a playbook",
];

/// Confidence assigned when a category matched.
const MATCHED_CONFIDENCE: f64 = 0.6;
/// Confidence assigned by the generic fallback.
const GENERIC_CONFIDENCE: f64 = 0.3;

/// Pure heuristic classification of a failure pattern.
pub fn heuristic_analysis(pattern: &FailurePattern, method: AnalysisMethod) -> RootCauseAnalysis {
    let haystack = classification_text(pattern);

    let best = CATEGORIES
        .iter()
        .map(|c| {
            let hits = c.keywords.iter().filter(|k| haystack.contains(*k)).count();
            (c, hits)
        })
        // max_by_key returns the last maximum; reverse to keep table order
        // as the tie-break (first category with the top score wins)
        .rev()
        .max_by_key(|(_, hits)| *hits)
        .filter(|(_, hits)| *hits > 0);

    let (why_chain, root_cause, capability_gap, counterfactual, confidence) = match best {
        Some((category, _)) => {
            debug!(pattern_id = %pattern.pattern_id, category = category.name, "heuristic match");
            let mut whys: Vec<String> = category.whys.iter().map(|w| (*w).to_string()).collect();
            whys[0] = format!("{} ({})", category.whys[0], pattern.normalized_message);
            (
                whys,
                category.root_cause.to_string(),
                category.capability_gap.to_string(),
                category.counterfactual.to_string(),
                MATCHED_CONFIDENCE,
            )
        }
        None => {
            let mut whys: Vec<String> = GENERIC_WHYS.iter().map(|w| (*w).to_string()).collect();
            whys[0] = format!("{} ({})", GENERIC_WHYS[0], pattern.normalized_message);
            (
                whys,
                format!("Unclassified failure: {}", pattern.error_type),
                "No curated analysis for this failure mode".to_string(),
                "With a curated category for this failure mode, a concrete fix could be proposed".to_string(),
                GENERIC_CONFIDENCE,
            )
        }
    };

    RootCauseAnalysis {
        pattern_id: pattern.pattern_id.clone(),
        why_chain,
        root_cause,
        capability_gap,
        counterfactual,
        confidence,
        similar_patterns: Vec::new(),
        analysis_method: method,
        analyzed_at: Utc::now(),
    }
}

fn classification_text(pattern: &FailurePattern) -> String {
    let mut text = format!("{} {}", pattern.error_type, pattern.normalized_message);
    for example in &pattern.examples {
        text.push(' ');
        text.push_str(&example.error_message.to_lowercase());
        for value in example.context.values() {
            if let Some(s) = value.as_str() {
                text.push(' ');
                text.push_str(&s.to_lowercase());
            }
        }
    }
    text
}

/// Word-overlap similarity (overlap coefficient) between two descriptions.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let tokens = |text: &str| -> BTreeSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= 3)
            .map(ToString::to_string)
            .collect()
    };
    let set_a = tokens(a);
    let set_b = tokens(b);
    let smaller = set_a.len().min(set_b.len());
    if smaller == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        set_a.intersection(&set_b).count() as f64 / smaller as f64
    }
}

pub struct RootCauseAnalyzer<X, A, M>
where
    X: ExecutionLog,
    A: AnalysisCache,
    M: RootCauseModel + ?Sized,
{
    clusterer: FailurePatternClusterer<X>,
    cache: Arc<A>,
    model: Arc<M>,
    config: RootCauseConfig,
}

impl<X, A, M> RootCauseAnalyzer<X, A, M>
where
    X: ExecutionLog,
    A: AnalysisCache,
    M: RootCauseModel + ?Sized,
{
    pub fn new(log: Arc<X>, cache: Arc<A>, model: Arc<M>, config: RootCauseConfig) -> Self {
        Self {
            clusterer: FailurePatternClusterer::new(log),
            cache,
            model,
            config,
        }
    }

    /// Analyze one failure pattern. Cache hits return immediately; misses
    /// run the model when configured and fall back to heuristics on any
    /// model failure, caching the result unconditionally either way.
    pub async fn analyze_root_cause(
        &self,
        pattern: &FailurePattern,
        use_cache: bool,
    ) -> DomainResult<RootCauseAnalysis> {
        if use_cache {
            if let Some(cached) = self.cache.get(&pattern.pattern_id).await? {
                debug!(pattern_id = %pattern.pattern_id, "analysis cache hit");
                return Ok(cached);
            }
        }

        let mut analysis = match self.model.analyze(pattern).await {
            Ok(model_analysis) => RootCauseAnalysis {
                pattern_id: pattern.pattern_id.clone(),
                why_chain: model_analysis.why_chain,
                root_cause: model_analysis.root_cause,
                capability_gap: model_analysis.capability_gap,
                counterfactual: model_analysis.counterfactual,
                confidence: model_analysis.confidence.clamp(0.0, 1.0),
                similar_patterns: Vec::new(),
                analysis_method: AnalysisMethod::Llm,
                analyzed_at: Utc::now(),
            },
            Err(DomainError::ModelUnavailable(_)) => {
                heuristic_analysis(pattern, AnalysisMethod::Heuristic)
            }
            Err(err) => {
                warn!(pattern_id = %pattern.pattern_id, %err, "model path failed, falling back to heuristic");
                heuristic_analysis(pattern, AnalysisMethod::HeuristicFallback)
            }
        };

        analysis = analysis.with_similar_patterns(self.similar_resolved(pattern).await?);
        self.cache.put(&analysis).await?;
        info!(
            pattern_id = %pattern.pattern_id,
            method = analysis.analysis_method.as_str(),
            confidence = analysis.confidence,
            "root cause analyzed"
        );
        Ok(analysis)
    }

    /// Resolved patterns similar enough to point the reader at prior fixes.
    async fn similar_resolved(&self, pattern: &FailurePattern) -> DomainResult<Vec<SimilarPattern>> {
        let description = format!("{} {}", pattern.error_type, pattern.normalized_message);
        Ok(self
            .cache
            .resolved_patterns()
            .await?
            .into_iter()
            .filter(|r| r.pattern_id != pattern.pattern_id)
            .filter_map(|r| {
                let similarity = word_overlap(&description, &r.description);
                (similarity > self.config.similar_pattern_threshold).then(|| SimilarPattern {
                    pattern_id: r.pattern_id,
                    resolution: r.resolution,
                    similarity,
                })
            })
            .collect())
    }

    /// Analyze a pattern by its ID, clustering the log to find it.
    pub async fn analyze_by_id(
        &self,
        pattern_id: &str,
        use_cache: bool,
    ) -> DomainResult<Option<RootCauseAnalysis>> {
        let Some(pattern) = self.clusterer.find_pattern(pattern_id).await? else {
            return Ok(None);
        };
        Ok(Some(self.analyze_root_cause(&pattern, use_cache).await?))
    }

    /// Cluster the execution log and analyze every frequent pattern.
    pub async fn batch_analyze(
        &self,
        min_occurrences: Option<usize>,
    ) -> DomainResult<Vec<RootCauseAnalysis>> {
        let min = min_occurrences.unwrap_or(self.config.min_occurrences);
        let patterns = self.clusterer.cluster_failures(min).await?;
        let mut analyses = Vec::with_capacity(patterns.len());
        for pattern in &patterns {
            analyses.push(self.analyze_root_cause(pattern, true).await?);
        }
        Ok(analyses)
    }

    pub async fn list_analyses(&self) -> DomainResult<Vec<RootCauseAnalysis>> {
        self.cache.list().await
    }

    pub async fn cache_stats(&self) -> DomainResult<CacheStats> {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) -> DomainResult<usize> {
        self.cache.clear().await
    }

    pub async fn record_resolved(&self, pattern: &ResolvedPattern) -> DomainResult<()> {
        self.cache.record_resolved(pattern).await
    }
}
