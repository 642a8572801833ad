//! Pattern clustering: groups near-duplicate proposals, gates low-confidence
//! groupings behind human review, and tracks decision calibration.

use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AccuracyMetrics, ClusterDecision, ClusterMember, ClusterProposal, ClusterStatus,
    ClusteringConfig, DecisionType, Proposal,
};
use crate::domain::ports::{
    cosine_similarity, ClusterFilter, ClusterRepository, DecisionLedger, EmbeddingProvider,
    ProposalRepository,
};

/// Aggregate statistics over the cluster store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterStatistics {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub awaiting_validation: usize,
    pub average_confidence: f64,
}

pub struct ClusteringManager<P, C, L, E>
where
    P: ProposalRepository,
    C: ClusterRepository,
    L: DecisionLedger,
    E: EmbeddingProvider,
{
    proposals: Arc<P>,
    clusters: Arc<C>,
    ledger: Arc<L>,
    embeddings: Arc<E>,
    config: ClusteringConfig,
}

impl<P, C, L, E> ClusteringManager<P, C, L, E>
where
    P: ProposalRepository,
    C: ClusterRepository,
    L: DecisionLedger,
    E: EmbeddingProvider,
{
    pub fn new(
        proposals: Arc<P>,
        clusters: Arc<C>,
        ledger: Arc<L>,
        embeddings: Arc<E>,
        config: ClusteringConfig,
    ) -> Self {
        Self {
            proposals,
            clusters,
            ledger,
            embeddings,
            config,
        }
    }

    pub fn high_confidence_threshold(&self) -> f64 {
        self.config.high_confidence_threshold
    }

    /// Cluster active proposals by similarity and persist any new groups.
    ///
    /// Proposals already absorbed into a non-rejected cluster are skipped so
    /// repeated runs do not re-propose the same merge.
    pub async fn analyze_and_cluster(
        &self,
        min_cluster_size: usize,
        similarity_threshold: f64,
    ) -> DomainResult<Vec<ClusterProposal>> {
        let min_cluster_size = min_cluster_size.max(2);
        let already_clustered = self.clustered_proposal_ids().await?;
        let candidates: Vec<Proposal> = self
            .proposals
            .list_active()
            .await?
            .into_iter()
            .filter(|p| !already_clustered.contains(&p.id))
            .collect();

        if candidates.len() < min_cluster_size {
            debug!(
                candidates = candidates.len(),
                min_cluster_size, "not enough proposals to cluster"
            );
            return Ok(Vec::new());
        }

        let similarity = self.similarity_matrix(&candidates).await?;
        let groups = single_link_merge(candidates.len(), &similarity, similarity_threshold);

        let mut created = Vec::new();
        for group in groups {
            if group.len() < min_cluster_size {
                continue;
            }
            let cluster = synthesize_cluster(&candidates, &group, &similarity);
            info!(
                cluster_id = %cluster.cluster_id,
                members = cluster.members.len(),
                confidence = cluster.confidence,
                "proposing cluster"
            );
            self.clusters.insert(&cluster).await?;
            created.push(cluster);
        }
        Ok(created)
    }

    async fn clustered_proposal_ids(&self) -> DomainResult<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        for cluster in self.clusters.list(ClusterFilter::default()).await? {
            if cluster.status != ClusterStatus::Rejected {
                for member in &cluster.members {
                    ids.insert(member.proposal_id.clone());
                }
            }
        }
        Ok(ids)
    }

    /// Pairwise similarity, preferring embedding cosine and degrading to
    /// token-set overlap when no embedding backend is available.
    async fn similarity_matrix(&self, proposals: &[Proposal]) -> DomainResult<Vec<Vec<f64>>> {
        let texts: Vec<String> = proposals.iter().map(Proposal::combined_text).collect();
        let n = texts.len();
        let mut matrix = vec![vec![0.0; n]; n];

        match self.embeddings.embed(&texts).await {
            Ok(vectors) if vectors.len() == n => {
                for i in 0..n {
                    for j in (i + 1)..n {
                        let s = cosine_similarity(&vectors[i], &vectors[j]);
                        matrix[i][j] = s;
                        matrix[j][i] = s;
                    }
                }
            }
            Ok(_) | Err(_) => {
                debug!("embedding provider unavailable, using token overlap");
                for i in 0..n {
                    for j in (i + 1)..n {
                        let s = token_jaccard(&texts[i], &texts[j]);
                        matrix[i][j] = s;
                        matrix[j][i] = s;
                    }
                }
            }
        }
        Ok(matrix)
    }

    /// Approve a cluster with its final generalization. No-op when the
    /// cluster is not in the proposed state; the decision is logged for
    /// calibration either way only on an actual transition.
    pub async fn approve(
        &self,
        cluster_id: &str,
        generalization: &str,
        notes: Option<String>,
    ) -> DomainResult<Option<ClusterProposal>> {
        if generalization.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "approval requires a non-empty generalization".to_string(),
            ));
        }
        let Some(mut cluster) = self.clusters.get(cluster_id).await? else {
            return Ok(None);
        };
        if !cluster.status.can_transition_to(ClusterStatus::Approved) {
            warn!(cluster_id, status = cluster.status.as_str(), "approve is a no-op");
            return Ok(Some(cluster));
        }

        cluster.status = ClusterStatus::Approved;
        cluster.proposed_generalization = generalization.to_string();
        cluster.review_notes = notes;
        cluster.decided_at = Some(Utc::now());
        self.clusters.update(&cluster).await?;
        self.log_decision(&cluster, DecisionType::Approve).await?;
        Ok(Some(cluster))
    }

    /// Reject a cluster with a required reason. No-op outside proposed.
    pub async fn reject(
        &self,
        cluster_id: &str,
        reason: &str,
    ) -> DomainResult<Option<ClusterProposal>> {
        if reason.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "rejection requires a non-empty reason".to_string(),
            ));
        }
        let Some(mut cluster) = self.clusters.get(cluster_id).await? else {
            return Ok(None);
        };
        if !cluster.status.can_transition_to(ClusterStatus::Rejected) {
            warn!(cluster_id, status = cluster.status.as_str(), "reject is a no-op");
            return Ok(Some(cluster));
        }

        cluster.status = ClusterStatus::Rejected;
        cluster.review_notes = Some(reason.to_string());
        cluster.decided_at = Some(Utc::now());
        self.clusters.update(&cluster).await?;
        self.log_decision(&cluster, DecisionType::Reject).await?;
        Ok(Some(cluster))
    }

    /// Mark an approved cluster as merged into the queue. No-op elsewhere.
    pub async fn mark_merged(&self, cluster_id: &str) -> DomainResult<Option<ClusterProposal>> {
        let Some(mut cluster) = self.clusters.get(cluster_id).await? else {
            return Ok(None);
        };
        if !cluster.status.can_transition_to(ClusterStatus::Merged) {
            warn!(cluster_id, status = cluster.status.as_str(), "mark-merged is a no-op");
            return Ok(Some(cluster));
        }
        cluster.status = ClusterStatus::Merged;
        self.clusters.update(&cluster).await?;
        Ok(Some(cluster))
    }

    async fn log_decision(
        &self,
        cluster: &ClusterProposal,
        decision: DecisionType,
    ) -> DomainResult<()> {
        let record = ClusterDecision {
            cluster_id: cluster.cluster_id.clone(),
            decision,
            system_confidence: cluster.confidence,
            high_confidence: cluster.confidence >= self.config.high_confidence_threshold,
            decided_at: Utc::now(),
        };
        self.ledger.append(&record).await
    }

    /// Calibration signal over every logged decision.
    pub async fn get_accuracy_metrics(&self) -> DomainResult<AccuracyMetrics> {
        Ok(AccuracyMetrics::from_decisions(&self.ledger.all().await?))
    }

    pub async fn get_cluster(&self, cluster_id: &str) -> DomainResult<Option<ClusterProposal>> {
        self.clusters.get(cluster_id).await
    }

    pub async fn list_by_status(
        &self,
        status: Option<ClusterStatus>,
    ) -> DomainResult<Vec<ClusterProposal>> {
        self.clusters.list(ClusterFilter { status }).await
    }

    /// Proposed clusters whose confidence falls below the review threshold.
    pub async fn list_requiring_validation(&self) -> DomainResult<Vec<ClusterProposal>> {
        Ok(self
            .list_by_status(Some(ClusterStatus::Proposed))
            .await?
            .into_iter()
            .filter(|c| c.requires_human_validation(self.config.high_confidence_threshold))
            .collect())
    }

    /// Low-confidence proposed clusters old enough that nobody is coming.
    pub async fn list_stale(&self) -> DomainResult<Vec<ClusterProposal>> {
        let now = Utc::now();
        Ok(self
            .list_by_status(Some(ClusterStatus::Proposed))
            .await?
            .into_iter()
            .filter(|c| {
                c.confidence < self.config.high_confidence_threshold
                    && c.age_days(now) >= self.config.stale_age_days
            })
            .collect())
    }

    pub async fn statistics(&self) -> DomainResult<ClusterStatistics> {
        let clusters = self.clusters.list(ClusterFilter::default()).await?;
        let mut stats = ClusterStatistics {
            total: clusters.len(),
            ..Default::default()
        };
        let mut confidence_sum = 0.0;
        for cluster in &clusters {
            *stats
                .by_status
                .entry(cluster.status.as_str().to_string())
                .or_default() += 1;
            confidence_sum += cluster.confidence;
            if cluster.status == ClusterStatus::Proposed
                && cluster.requires_human_validation(self.config.high_confidence_threshold)
            {
                stats.awaiting_validation += 1;
            }
        }
        if !clusters.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            {
                stats.average_confidence = confidence_sum / clusters.len() as f64;
            }
        }
        Ok(stats)
    }
}

/// Token-set Jaccard overlap; the zero-dependency similarity fallback.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let tokens = |text: &str| -> BTreeSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= 3)
            .map(ToString::to_string)
            .collect()
    };
    let set_a = tokens(a);
    let set_b = tokens(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    #[allow(clippy::cast_precision_loss)]
    {
        intersection as f64 / union as f64
    }
}

/// Greedy single-link agglomeration: repeatedly merge the pair of groups
/// with the highest inter-group similarity at or above the threshold.
fn single_link_merge(n: usize, similarity: &[Vec<f64>], threshold: f64) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                // single link: the closest pair of members decides
                let link = groups[i]
                    .iter()
                    .flat_map(|&a| groups[j].iter().map(move |&b| similarity[a][b]))
                    .fold(0.0_f64, f64::max);
                if link >= threshold && best.is_none_or(|(_, _, s)| link > s) {
                    best = Some((i, j, link));
                }
            }
        }
        let Some((i, j, _)) = best else { break };
        let merged = groups.remove(j);
        groups[i].extend(merged);
    }
    groups
}

/// Build a cluster proposal out of one merged group.
fn synthesize_cluster(
    proposals: &[Proposal],
    group: &[usize],
    similarity: &[Vec<f64>],
) -> ClusterProposal {
    let avg_to_others = |idx: usize| -> f64 {
        let others: Vec<f64> = group
            .iter()
            .filter(|&&o| o != idx)
            .map(|&o| similarity[idx][o])
            .collect();
        if others.is_empty() {
            1.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                others.iter().sum::<f64>() / others.len() as f64
            }
        }
    };

    let members: Vec<ClusterMember> = group
        .iter()
        .map(|&idx| ClusterMember {
            proposal_id: proposals[idx].id.clone(),
            problem_pattern: proposals[idx].problem_pattern.clone(),
            proposed_solution: proposals[idx].proposed_solution.clone(),
            similarity_to_centroid: avg_to_others(idx),
            domains: proposals[idx].affected_domains.clone(),
        })
        .collect();

    let mut domain_coverage: Vec<String> = members
        .iter()
        .flat_map(|m| m.domains.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    domain_coverage.sort();

    let pairs: Vec<f64> = group
        .iter()
        .enumerate()
        .flat_map(|(pos, &a)| group[pos + 1..].iter().map(move |&b| similarity[a][b]))
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let avg_similarity = if pairs.is_empty() {
        0.0
    } else {
        pairs.iter().sum::<f64>() / pairs.len() as f64
    };

    ClusterProposal {
        cluster_id: format!("cluster-{}", Uuid::new_v4()),
        proposed_generalization: generalize(&members, &domain_coverage),
        confidence: confidence_for(avg_similarity, members.len()),
        domain_coverage,
        members,
        status: ClusterStatus::Proposed,
        created_at: Utc::now(),
        decided_at: None,
        review_notes: None,
    }
}

/// Confidence grows with both cohesion and group size, clamped to [0, 1].
fn confidence_for(avg_similarity: f64, size: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let size_signal = (size.min(10) as f64) / 10.0;
    (avg_similarity * 0.8 + size_signal * 0.2).clamp(0.0, 1.0)
}

/// Draft generalization text from the tokens most members share.
fn generalize(members: &[ClusterMember], domains: &[String]) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for member in members {
        let tokens: BTreeSet<String> =
            format!("{} {}", member.problem_pattern, member.proposed_solution)
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| t.len() >= 4)
                .map(ToString::to_string)
                .collect();
        for token in tokens {
            *counts.entry(token).or_default() += 1;
        }
    }
    let majority = members.len().div_ceil(2);
    let mut shared: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= majority)
        .collect();
    shared.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let themes: Vec<String> = shared.into_iter().take(6).map(|(t, _)| t).collect();

    let mut text = format!(
        "Generalize {} similar proposals around: {}",
        members.len(),
        themes.join(", ")
    );
    if !domains.is_empty() {
        text.push_str(&format!(" (domains: {})", domains.join(", ")));
    }
    text
}
