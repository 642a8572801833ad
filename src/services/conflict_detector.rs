//! Conflict detection and promotion gating.
//!
//! Pairwise checks across four independent dimensions decide whether two
//! improvement proposals can coexist. Any subset of checks may fire for a
//! pair; only unresolved blocking conflicts gate promotion.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::scope::normalize;
use crate::domain::models::{
    Conflict, ConflictReport, ConflictSeverity, ConflictType, ImprovementScope, Proposal,
};
use crate::domain::ports::{
    ConflictFilter, ConflictRepository, ProposalRepository, ScopeRepository,
};

/// Fixed behavior vocabulary used for scope inference: canonical behavior
/// name, then the keywords that imply it.
const BEHAVIOR_VOCABULARY: &[(&str, &[&str])] = &[
    ("retry", &["retry", "retries", "retrying", "backoff", "reattempt"]),
    ("error handling", &["error", "errors", "exception", "failure", "fail"]),
    ("logging", &["log", "logging", "logs", "trace", "tracing"]),
    ("caching", &["cache", "caching", "cached", "memoize"]),
    ("validation", &["validate", "validation", "schema", "sanitize"]),
    ("timeout handling", &["timeout", "timeouts", "deadline", "expiry"]),
    ("rate limiting", &["rate limit", "throttle", "throttling"]),
    ("prompting", &["prompt", "prompts", "prompting", "instruction"]),
    ("tool selection", &["tool", "handler", "dispatch"]),
    ("file handling", &["file", "files", "directory", "filesystem"]),
];

/// Fixed domain vocabulary used for scope inference.
const DOMAIN_VOCABULARY: &[(&str, &[&str])] = &[
    ("api", &["api", "endpoint", "rest", "http"]),
    ("web", &["web", "browser", "frontend", "page"]),
    ("cli", &["cli", "command line", "terminal"]),
    ("data", &["database", "sql", "query", "migration"]),
    ("testing", &["test", "tests", "testing", "assertion"]),
    ("auth", &["auth", "login", "token", "credential", "permission"]),
    ("network", &["network", "connection", "socket", "dns"]),
    ("config", &["config", "configuration", "settings", "yaml"]),
];

/// Modifier pairs that read as opposing prescriptions when anchored on a
/// shared behavior noun.
const OPPOSING_PAIRS: &[(&str, &str)] = &[
    ("always", "never"),
    ("enable", "disable"),
    ("add", "remove"),
    ("increase", "decrease"),
    ("more", "fewer"),
    ("retry", "fail fast"),
    ("allow", "forbid"),
    ("include", "exclude"),
    ("synchronous", "asynchronous"),
    ("expand", "reduce"),
];

const STOPWORDS: &[&str] = &[
    "the", "and", "with", "that", "this", "from", "for", "into", "when", "then", "than",
    "should", "would", "could", "will", "have", "has", "are", "was", "were", "been", "being",
    "all", "any", "each", "every", "some", "such", "not", "but", "its", "also", "use", "using",
];

/// Advisory resolution suggestions per conflict type.
pub fn suggest_resolution(conflict_type: ConflictType) -> &'static str {
    match conflict_type {
        ConflictType::BehavioralContradiction => {
            "The two solutions prescribe opposing behavior. Keep the one with stronger \
             evidence, or scope each to a disjoint domain so both can hold."
        }
        ConflictType::ScopeOverlap => {
            "Overlapping blast radius. Consider merging the proposals, or narrowing the \
             declared behaviors/domains until the overlap disappears."
        }
        ConflictType::DependencyConflict => {
            "One proposal's effects invalidate the other's preconditions. Order the \
             rollouts explicitly, or restate the dependent proposal without the \
             invalidated precondition."
        }
        ConflictType::ResourceContention => {
            "Both proposals touch the same resource. Promote them in separate batches and \
             verify the shared resource after each."
        }
    }
}

pub struct ConflictDetector<P, S, C>
where
    P: ProposalRepository,
    S: ScopeRepository,
    C: ConflictRepository,
{
    proposals: Arc<P>,
    scopes: Arc<S>,
    conflicts: Arc<C>,
}

impl<P, S, C> ConflictDetector<P, S, C>
where
    P: ProposalRepository,
    S: ScopeRepository,
    C: ConflictRepository,
{
    pub fn new(proposals: Arc<P>, scopes: Arc<S>, conflicts: Arc<C>) -> Self {
        Self {
            proposals,
            scopes,
            conflicts,
        }
    }

    /// Persist a declared scope, overwriting any previous one.
    pub async fn set_scope(&self, scope: &ImprovementScope) -> DomainResult<()> {
        self.scopes.set(scope).await
    }

    pub async fn get_scope(&self, improvement_id: &str) -> DomainResult<Option<ImprovementScope>> {
        self.scopes.get(improvement_id).await
    }

    /// True when a scope exists and declares at least one behavior, domain,
    /// or effect.
    pub async fn has_scope(&self, improvement_id: &str) -> DomainResult<bool> {
        Ok(self
            .scopes
            .get(improvement_id)
            .await?
            .is_some_and(|s| s.is_complete()))
    }

    async fn scope_for(&self, proposal: &Proposal) -> DomainResult<ImprovementScope> {
        match self.scopes.get(&proposal.id).await? {
            Some(scope) if scope.is_complete() => Ok(scope),
            _ => Ok(infer_scope(proposal)),
        }
    }

    /// Run all four pairwise checks for two proposals. Conflicts are
    /// returned, not persisted. Missing IDs yield no conflicts.
    pub async fn detect_conflicts(&self, a: &str, b: &str) -> DomainResult<Vec<Conflict>> {
        if a == b {
            return Ok(Vec::new());
        }
        let (Some(prop_a), Some(prop_b)) =
            (self.proposals.get(a).await?, self.proposals.get(b).await?)
        else {
            return Ok(Vec::new());
        };
        let scope_a = self.scope_for(&prop_a).await?;
        let scope_b = self.scope_for(&prop_b).await?;

        let mut found = Vec::new();
        if let Some(c) = check_behavioral_contradiction(&prop_a, &prop_b) {
            found.push(c);
        }
        if let Some(c) = check_scope_overlap(&prop_a, &prop_b, &scope_a, &scope_b) {
            found.push(c);
        }
        if let Some(c) = check_dependency_conflict(&prop_a, &prop_b, &scope_a, &scope_b) {
            found.push(c);
        }
        if let Some(c) = check_resource_contention(&prop_a, &prop_b, &scope_a, &scope_b) {
            found.push(c);
        }
        debug!(a, b, count = found.len(), "pairwise conflict check");
        Ok(found)
    }

    /// Detect conflicts between one improvement and every other active
    /// proposal, persist anything new, and aggregate a report.
    pub async fn analyze_improvement(&self, id: &str) -> DomainResult<ConflictReport> {
        let Some(_target) = self.proposals.get(id).await? else {
            // Unknown improvements simply have nothing blocking them.
            return Ok(ConflictReport::from_conflicts(id, Vec::new()));
        };

        let others = self.proposals.list_active().await?;
        let existing = self
            .conflicts
            .list(ConflictFilter {
                improvement_id: Some(id.to_string()),
                ..Default::default()
            })
            .await?;

        for other in others.iter().filter(|p| p.id != id) {
            for conflict in self.detect_conflicts(id, &other.id).await? {
                // resolved conflicts count too: resolution is a recorded
                // decision for that pair and type, not an invitation to
                // re-detect the same finding
                let duplicate = existing.iter().any(|e| {
                    e.conflict_type == conflict.conflict_type
                        && e.involves_pair(&conflict.improvement_a, &conflict.improvement_b)
                });
                if !duplicate {
                    info!(
                        improvement = id,
                        other = %other.id,
                        conflict_type = conflict.conflict_type.as_str(),
                        "recording conflict"
                    );
                    self.conflicts.insert(&conflict).await?;
                }
            }
        }

        let mut all = self
            .conflicts
            .list(ConflictFilter {
                improvement_id: Some(id.to_string()),
                ..Default::default()
            })
            .await?;

        // a conflict against a rejected or merged proposal cannot gate
        // promotion; close it out rather than waiting on a human
        let active_ids: BTreeSet<&str> = others.iter().map(|p| p.id.as_str()).collect();
        for conflict in &mut all {
            let counterpart = if conflict.improvement_a == id {
                &conflict.improvement_b
            } else {
                &conflict.improvement_a
            };
            if !conflict.resolved && !active_ids.contains(counterpart.as_str()) {
                info!(
                    improvement = id,
                    counterpart = %counterpart,
                    "auto-resolving conflict against inactive proposal"
                );
                conflict.resolve("counterpart proposal is no longer active");
                self.conflicts.update(conflict).await?;
            }
        }

        Ok(ConflictReport::from_conflicts(id, all))
    }

    /// A proposal may be promoted iff it has zero unresolved blocking
    /// conflicts. Warnings never block.
    pub async fn can_promote(&self, id: &str) -> DomainResult<ConflictReport> {
        self.analyze_improvement(id).await
    }

    /// Mark a conflict resolved with notes. Returns false for unknown IDs.
    pub async fn resolve_conflict(&self, conflict_id: Uuid, notes: &str) -> DomainResult<bool> {
        let Some(mut conflict) = self.conflicts.get(conflict_id).await? else {
            return Ok(false);
        };
        conflict.resolve(notes);
        self.conflicts.update(&conflict).await?;
        Ok(true)
    }

    pub async fn list_conflicts(&self, filter: ConflictFilter) -> DomainResult<Vec<Conflict>> {
        self.conflicts.list(filter).await
    }
}

/// Best-effort scope inference from a proposal's problem and solution text
/// against the fixed vocabularies. Never auto-persisted; callers decide
/// whether an inferred scope is worth keeping.
pub fn infer_scope(proposal: &Proposal) -> ImprovementScope {
    let text = normalize(&proposal.combined_text());

    let behaviors: Vec<String> = BEHAVIOR_VOCABULARY
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(name, _)| (*name).to_string())
        .collect();

    let mut domains: Vec<String> = DOMAIN_VOCABULARY
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(name, _)| (*name).to_string())
        .collect();
    for declared in &proposal.affected_domains {
        let declared = normalize(declared);
        if !declared.is_empty() && !domains.contains(&declared) {
            domains.push(declared);
        }
    }

    ImprovementScope::new(proposal.id.clone())
        .with_behaviors(behaviors)
        .with_domains(domains)
}

/// Content words shared by both texts, used to anchor contradictions.
fn shared_nouns(a: &str, b: &str) -> BTreeSet<String> {
    let words = |text: &str| -> BTreeSet<String> {
        normalize(text)
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 4 && !STOPWORDS.contains(w))
            .map(ToString::to_string)
            .collect()
    };
    words(a).intersection(&words(b)).cloned().collect()
}

/// Opposing modifier pair anchored on a shared behavior noun. Blocking.
fn check_behavioral_contradiction(a: &Proposal, b: &Proposal) -> Option<Conflict> {
    let text_a = normalize(&a.proposed_solution);
    let text_b = normalize(&b.proposed_solution);

    let anchors = shared_nouns(&text_a, &text_b);
    if anchors.is_empty() {
        return None;
    }

    let opposing = OPPOSING_PAIRS.iter().find(|(x, y)| {
        (text_a.contains(x) && text_b.contains(y)) || (text_a.contains(y) && text_b.contains(x))
    })?;

    let anchor = anchors.iter().next().cloned().unwrap_or_default();
    Some(Conflict::new(
        ConflictType::BehavioralContradiction,
        ConflictSeverity::Blocking,
        &a.id,
        &b.id,
        format!(
            "solutions prescribe opposing behavior ('{}' vs '{}') for '{}'",
            opposing.0, opposing.1, anchor
        ),
    ))
}

/// Behavior/domain set intersection. Warning, or blocking when one side's
/// entire scope is subsumed by the other's.
fn check_scope_overlap(
    a: &Proposal,
    b: &Proposal,
    scope_a: &ImprovementScope,
    scope_b: &ImprovementScope,
) -> Option<Conflict> {
    let behaviors_a = scope_a.behavior_set();
    let behaviors_b = scope_b.behavior_set();
    let domains_a = scope_a.domain_set();
    let domains_b = scope_b.domain_set();

    let behavior_overlap: Vec<&String> = behaviors_a.intersection(&behaviors_b).collect();
    let domain_overlap: Vec<&String> = domains_a.intersection(&domains_b).collect();
    if behavior_overlap.is_empty() && domain_overlap.is_empty() {
        return None;
    }

    let full_a: BTreeSet<&String> = behaviors_a.iter().chain(&domains_a).collect();
    let full_b: BTreeSet<&String> = behaviors_b.iter().chain(&domains_b).collect();
    let subsumed = (!full_a.is_empty() && full_a.is_subset(&full_b))
        || (!full_b.is_empty() && full_b.is_subset(&full_a));

    let severity = if subsumed {
        ConflictSeverity::Blocking
    } else {
        ConflictSeverity::Warning
    };
    let overlap: Vec<String> = behavior_overlap
        .into_iter()
        .chain(domain_overlap)
        .cloned()
        .collect();
    Some(Conflict::new(
        ConflictType::ScopeOverlap,
        severity,
        &a.id,
        &b.id,
        if subsumed {
            format!("one proposal's scope fully contains the other's ({})", overlap.join(", "))
        } else {
            format!("scopes overlap on: {}", overlap.join(", "))
        },
    ))
}

/// True when `effect` negates `precondition` (or vice versa): either a
/// negation prefix on an otherwise identical statement, or an opposing
/// modifier pair substituted on the same remainder.
fn negates(effect: &str, precondition: &str) -> bool {
    let effect = normalize(effect);
    let precondition = normalize(precondition);
    if effect.is_empty() || precondition.is_empty() {
        return false;
    }

    let strip = |s: &str| -> (String, bool) {
        for prefix in ["no ", "not ", "without ", "never "] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return (rest.to_string(), true);
            }
        }
        (s.to_string(), false)
    };
    let (core_e, neg_e) = strip(&effect);
    let (core_p, neg_p) = strip(&precondition);
    if core_e == core_p && neg_e != neg_p {
        return true;
    }

    OPPOSING_PAIRS.iter().any(|(x, y)| {
        effect.replace(x, y) == precondition || effect.replace(y, x) == precondition
    })
}

/// One side's effects negate the other's preconditions. Blocking.
fn check_dependency_conflict(
    a: &Proposal,
    b: &Proposal,
    scope_a: &ImprovementScope,
    scope_b: &ImprovementScope,
) -> Option<Conflict> {
    let pair = |effects: &[String], preconditions: &[String]| -> Option<(String, String)> {
        for effect in effects {
            for precondition in preconditions {
                if negates(effect, precondition) {
                    return Some((effect.clone(), precondition.clone()));
                }
            }
        }
        None
    };

    let hit = pair(&scope_a.effects, &scope_b.preconditions)
        .or_else(|| pair(&scope_b.effects, &scope_a.preconditions))?;
    Some(Conflict::new(
        ConflictType::DependencyConflict,
        ConflictSeverity::Blocking,
        &a.id,
        &b.id,
        format!("effect '{}' negates precondition '{}'", hit.0, hit.1),
    ))
}

/// Identical normalized {kind, name} in both resource lists. Warning.
fn check_resource_contention(
    a: &Proposal,
    b: &Proposal,
    scope_a: &ImprovementScope,
    scope_b: &ImprovementScope,
) -> Option<Conflict> {
    let set_b: BTreeSet<(String, String)> = scope_b
        .resources_used
        .iter()
        .map(crate::domain::models::ResourceRef::normalized)
        .collect();
    let shared = scope_a
        .resources_used
        .iter()
        .find(|r| set_b.contains(&r.normalized()))?;
    Some(Conflict::new(
        ConflictType::ResourceContention,
        ConflictSeverity::Warning,
        &a.id,
        &b.id,
        format!("both touch {} '{}'", shared.kind, shared.name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ResourceRef;

    fn proposal(id: &str, solution: &str) -> Proposal {
        Proposal::new(id, "recurring failures", solution)
    }

    #[test]
    fn test_contradiction_always_vs_never() {
        let a = proposal("a", "Always retry on failure with exponential backoff");
        let b = proposal("b", "Never retry to fail fast and surface errors immediately");
        let conflict = check_behavioral_contradiction(&a, &b).unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::BehavioralContradiction);
        assert_eq!(conflict.severity, ConflictSeverity::Blocking);
    }

    #[test]
    fn test_contradiction_needs_shared_anchor() {
        let a = proposal("a", "always compress artifacts");
        let b = proposal("b", "never page humans overnight");
        assert!(check_behavioral_contradiction(&a, &b).is_none());
    }

    #[test]
    fn test_contradiction_symmetric_type() {
        let a = proposal("a", "enable caching for tool lookups");
        let b = proposal("b", "disable caching for tool lookups");
        assert!(check_behavioral_contradiction(&a, &b).is_some());
        assert!(check_behavioral_contradiction(&b, &a).is_some());
    }

    #[test]
    fn test_scope_overlap_warning_and_subsumption() {
        let a = proposal("a", "x");
        let b = proposal("b", "y");
        let scope_a = ImprovementScope::new("a")
            .with_behaviors(vec!["retry".into(), "logging".into()])
            .with_domains(vec!["api".into()]);
        let scope_b = ImprovementScope::new("b")
            .with_behaviors(vec!["retry".into()])
            .with_domains(vec!["web".into()]);
        let c = check_scope_overlap(&a, &b, &scope_a, &scope_b).unwrap();
        assert_eq!(c.severity, ConflictSeverity::Warning);

        // b entirely inside a
        let scope_b = ImprovementScope::new("b").with_behaviors(vec!["retry".into()]);
        let c = check_scope_overlap(&a, &b, &scope_a, &scope_b).unwrap();
        assert_eq!(c.severity, ConflictSeverity::Blocking);
    }

    #[test]
    fn test_disjoint_scopes_no_overlap() {
        let a = proposal("a", "x");
        let b = proposal("b", "y");
        let scope_a = ImprovementScope::new("a").with_behaviors(vec!["retry".into()]);
        let scope_b = ImprovementScope::new("b").with_behaviors(vec!["logging".into()]);
        assert!(check_scope_overlap(&a, &b, &scope_a, &scope_b).is_none());
    }

    #[test]
    fn test_negation_detection() {
        assert!(negates("no network access", "network access"));
        assert!(negates("caching enabled", "caching disabled"));
        assert!(!negates("faster builds", "network access"));
        assert!(!negates("", "network access"));
    }

    #[test]
    fn test_dependency_conflict_both_directions() {
        let a = proposal("a", "x");
        let b = proposal("b", "y");
        let scope_a = ImprovementScope::new("a").with_effects(vec!["no network access".into()]);
        let scope_b =
            ImprovementScope::new("b").with_preconditions(vec!["network access".into()]);
        assert!(check_dependency_conflict(&a, &b, &scope_a, &scope_b).is_some());
        assert!(check_dependency_conflict(&b, &a, &scope_b, &scope_a).is_some());
    }

    #[test]
    fn test_resource_contention_normalized() {
        let a = proposal("a", "x");
        let b = proposal("b", "y");
        let scope_a = ImprovementScope::new("a")
            .with_resources(vec![ResourceRef::new("File", "Config.yaml")]);
        let scope_b = ImprovementScope::new("b")
            .with_resources(vec![ResourceRef::new("file", "config.yaml")]);
        let c = check_resource_contention(&a, &b, &scope_a, &scope_b).unwrap();
        assert_eq!(c.conflict_type, ConflictType::ResourceContention);
        assert_eq!(c.severity, ConflictSeverity::Warning);
    }

    #[test]
    fn test_infer_scope_keywords() {
        let p = Proposal::new(
            "p",
            "api calls keep timing out",
            "add retry with backoff to every endpoint call",
        );
        let scope = infer_scope(&p);
        assert!(scope.affected_behaviors.contains(&"retry".to_string()));
        assert!(scope.domain_applicability.contains(&"api".to_string()));
        assert!(scope.is_complete());
    }

    #[test]
    fn test_suggestion_catalog_covers_all_types() {
        for t in [
            ConflictType::BehavioralContradiction,
            ConflictType::ScopeOverlap,
            ConflictType::DependencyConflict,
            ConflictType::ResourceContention,
        ] {
            assert!(!suggest_resolution(t).is_empty());
        }
    }
}
