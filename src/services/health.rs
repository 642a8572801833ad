//! Health indicators: four leading indicators over the proposal queue and
//! telemetry logs, traffic-light thresholds, and a stateful alert lifecycle.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::scope::normalize;
use crate::domain::models::{
    HealthAlert, HealthConfig, HealthSnapshot, IndicatorKind, IndicatorStatus, IndicatorValue,
    RetrievalOutcome, ThresholdTable, Trend,
};
use crate::domain::ports::{ExecutionLog, HealthStore, ProposalRepository, RetrievalLog};

pub struct HealthIndicatorsManager<P, X, R, H>
where
    P: ProposalRepository,
    X: ExecutionLog,
    R: RetrievalLog,
    H: HealthStore,
{
    proposals: Arc<P>,
    executions: Arc<X>,
    retrievals: Arc<R>,
    store: Arc<H>,
    config: HealthConfig,
}

impl<P, X, R, H> HealthIndicatorsManager<P, X, R, H>
where
    P: ProposalRepository,
    X: ExecutionLog,
    R: RetrievalLog,
    H: HealthStore,
{
    pub fn new(
        proposals: Arc<P>,
        executions: Arc<X>,
        retrievals: Arc<R>,
        store: Arc<H>,
        config: HealthConfig,
    ) -> Self {
        Self {
            proposals,
            executions,
            retrievals,
            store,
            config,
        }
    }

    /// Compute all four indicators, append the snapshot to history, and run
    /// the alert lifecycle step.
    pub async fn get_health_snapshot(&self) -> DomainResult<HealthSnapshot> {
        let now = Utc::now();
        let thresholds = self.store.load_thresholds().await?;
        let previous = self.store.recent_snapshots(1).await?.pop();

        let indicators = vec![
            self.proposal_rate_change(now, &thresholds, previous.as_ref()).await?,
            self.cluster_concentration(now, &thresholds, previous.as_ref()).await?,
            self.retrieval_miss_rate(now, &thresholds, previous.as_ref()).await?,
            self.domain_drift(now, &thresholds, previous.as_ref()).await?,
        ];

        let snapshot = HealthSnapshot {
            taken_at: now,
            overall_status: IndicatorStatus::worst(indicators.iter().map(|i| i.status)),
            indicators,
        };
        self.store.append_snapshot(&snapshot).await?;
        self.run_alert_step(&snapshot, &thresholds).await?;
        Ok(snapshot)
    }

    /// Alert lifecycle: raise for newly amber/red indicators (deduped per
    /// indicator among unresolved alerts), escalate an open alert when the
    /// indicator worsens, auto-resolve for green ones.
    async fn run_alert_step(
        &self,
        snapshot: &HealthSnapshot,
        thresholds: &ThresholdTable,
    ) -> DomainResult<()> {
        let mut alerts = self.store.load_alerts().await?;
        let mut changed = false;

        for indicator in &snapshot.indicators {
            match indicator.status {
                IndicatorStatus::Amber | IndicatorStatus::Red => {
                    let limits = thresholds.for_indicator(indicator.kind);
                    let crossed = if indicator.status == IndicatorStatus::Red {
                        limits.amber_max
                    } else {
                        limits.green_max
                    };
                    if let Some(open) = alerts
                        .iter_mut()
                        .find(|a| a.indicator == indicator.kind && !a.is_resolved())
                    {
                        // an open amber alert escalates in place when the
                        // indicator crosses into red; it never de-escalates
                        if indicator.status.severity_rank() > open.severity.severity_rank() {
                            warn!(
                                indicator = indicator.kind.as_str(),
                                status = indicator.status.as_str(),
                                "escalating open health alert"
                            );
                            open.severity = indicator.status;
                            open.message = indicator.message.clone();
                            open.value = indicator.value;
                            open.threshold = crossed;
                            changed = true;
                        }
                    } else {
                        warn!(
                            indicator = indicator.kind.as_str(),
                            status = indicator.status.as_str(),
                            "raising health alert"
                        );
                        alerts.push(HealthAlert {
                            id: Uuid::new_v4(),
                            indicator: indicator.kind,
                            severity: indicator.status,
                            message: indicator.message.clone(),
                            value: indicator.value,
                            threshold: crossed,
                            acknowledged: false,
                            created_at: snapshot.taken_at,
                            resolved_at: None,
                        });
                        changed = true;
                    }
                }
                IndicatorStatus::Green => {
                    for alert in alerts
                        .iter_mut()
                        .filter(|a| a.indicator == indicator.kind && !a.is_resolved())
                    {
                        info!(indicator = alert.indicator.as_str(), "auto-resolving alert");
                        alert.resolved_at = Some(snapshot.taken_at);
                        changed = true;
                    }
                }
                IndicatorStatus::Unknown => {}
            }
        }

        if changed {
            self.store.save_alerts(&alerts).await?;
        }
        Ok(())
    }

    /// Trailing-rate over baseline-rate ratio; 1.0 means no change.
    async fn proposal_rate_change(
        &self,
        now: DateTime<Utc>,
        thresholds: &ThresholdTable,
        previous: Option<&HealthSnapshot>,
    ) -> DomainResult<IndicatorValue> {
        let kind = IndicatorKind::ProposalRateChange;
        let timestamps: Vec<DateTime<Utc>> = self
            .proposals
            .list()
            .await?
            .into_iter()
            .filter_map(|p| p.created_at)
            .collect();
        if timestamps.is_empty() {
            return Ok(self.unknown(kind, "no timestamped proposals", now));
        }

        let window_start = now - Duration::days(self.config.window_days);
        let baseline_start = window_start - Duration::days(self.config.baseline_days);
        let recent = timestamps.iter().filter(|t| **t >= window_start).count();
        let baseline = timestamps
            .iter()
            .filter(|t| **t >= baseline_start && **t < window_start)
            .count();

        #[allow(clippy::cast_precision_loss)]
        let recent_rate = recent as f64 / self.config.window_days as f64;
        #[allow(clippy::cast_precision_loss)]
        let baseline_rate = baseline as f64 / self.config.baseline_days as f64;

        // an empty baseline is normalized to one proposal per day so a
        // brand-new pipeline reads as its own rate rather than infinity
        let ratio = if baseline == 0 {
            recent_rate
        } else {
            recent_rate / baseline_rate
        };

        Ok(self.value(
            kind,
            ratio,
            format!("{recent} proposals in window vs {baseline} in baseline"),
            thresholds,
            now,
            previous,
        ))
    }

    /// Max share of windowed failures attributable to one error type.
    async fn cluster_concentration(
        &self,
        now: DateTime<Utc>,
        thresholds: &ThresholdTable,
        previous: Option<&HealthSnapshot>,
    ) -> DomainResult<IndicatorValue> {
        let kind = IndicatorKind::ClusterConcentration;
        let window_start = now - Duration::days(self.config.window_days);
        let records = self.executions.records_since(window_start).await?;
        if records.is_empty() {
            return Ok(self.unknown(kind, "no executions in window", now));
        }

        let failures: Vec<String> = records
            .iter()
            .filter(|r| r.is_failure())
            .filter_map(crate::domain::models::ExecutionRecord::normalized_error_type)
            .collect();
        if failures.is_empty() {
            return Ok(self.value(
                kind,
                0.0,
                "no failures in window".to_string(),
                thresholds,
                now,
                previous,
            ));
        }

        let mut counts = std::collections::BTreeMap::new();
        for error_type in &failures {
            *counts.entry(error_type.clone()).or_insert(0usize) += 1;
        }
        let (top_type, top_count) = counts
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(t, c)| (t.clone(), *c))
            .unwrap_or_default();
        #[allow(clippy::cast_precision_loss)]
        let share = top_count as f64 / failures.len() as f64;

        Ok(self.value(
            kind,
            share,
            format!("'{top_type}' accounts for {top_count}/{} failures", failures.len()),
            thresholds,
            now,
            previous,
        ))
    }

    /// Fraction of windowed retrievals whose outcome was "ignored".
    async fn retrieval_miss_rate(
        &self,
        now: DateTime<Utc>,
        thresholds: &ThresholdTable,
        previous: Option<&HealthSnapshot>,
    ) -> DomainResult<IndicatorValue> {
        let kind = IndicatorKind::RetrievalMissRate;
        let window_start = now - Duration::days(self.config.window_days);
        let outcomes = self.retrievals.outcomes_since(window_start).await?;
        if outcomes.is_empty() {
            return Ok(self.unknown(kind, "no retrievals in window", now));
        }

        let ignored = outcomes
            .iter()
            .filter(|o| o.outcome == RetrievalOutcome::Ignored)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let rate = ignored as f64 / outcomes.len() as f64;
        Ok(self.value(
            kind,
            rate,
            format!("{ignored}/{} retrievals ignored", outcomes.len()),
            thresholds,
            now,
            previous,
        ))
    }

    /// Fraction of windowed executions tagged with an unrecognized domain.
    async fn domain_drift(
        &self,
        now: DateTime<Utc>,
        thresholds: &ThresholdTable,
        previous: Option<&HealthSnapshot>,
    ) -> DomainResult<IndicatorValue> {
        let kind = IndicatorKind::DomainDrift;
        let window_start = now - Duration::days(self.config.window_days);
        let records = self.executions.records_since(window_start).await?;
        if records.is_empty() {
            return Ok(self.unknown(kind, "no executions in window", now));
        }

        let mut recognized: BTreeSet<String> = self
            .config
            .known_domains
            .iter()
            .map(|d| normalize(d))
            .collect();
        for proposal in self.proposals.list().await? {
            for domain in &proposal.affected_domains {
                recognized.insert(normalize(domain));
            }
        }

        let drifted = records
            .iter()
            .filter_map(crate::domain::models::ExecutionRecord::domain)
            .filter(|d| !recognized.contains(&normalize(d)))
            .count();
        #[allow(clippy::cast_precision_loss)]
        let fraction = drifted as f64 / records.len() as f64;
        Ok(self.value(
            kind,
            fraction,
            format!("{drifted}/{} executions in unrecognized domains", records.len()),
            thresholds,
            now,
            previous,
        ))
    }

    fn value(
        &self,
        kind: IndicatorKind,
        value: f64,
        message: String,
        thresholds: &ThresholdTable,
        now: DateTime<Utc>,
        previous: Option<&HealthSnapshot>,
    ) -> IndicatorValue {
        IndicatorValue {
            kind,
            value: Some(value),
            status: thresholds.for_indicator(kind).classify(value),
            trend: trend_against(previous, kind, value),
            message,
            computed_at: now,
        }
    }

    fn unknown(&self, kind: IndicatorKind, message: &str, now: DateTime<Utc>) -> IndicatorValue {
        IndicatorValue {
            kind,
            value: None,
            status: IndicatorStatus::Unknown,
            trend: Trend::Unknown,
            message: message.to_string(),
            computed_at: now,
        }
    }

    pub async fn get_history(&self, limit: usize) -> DomainResult<Vec<HealthSnapshot>> {
        self.store.recent_snapshots(limit).await
    }

    pub async fn get_thresholds(&self) -> DomainResult<ThresholdTable> {
        self.store.load_thresholds().await
    }

    /// Mutate one threshold level and persist immediately. Unknown
    /// indicator or level names raise a validation error.
    pub async fn set_threshold(
        &self,
        indicator: &str,
        level: &str,
        value: f64,
    ) -> DomainResult<ThresholdTable> {
        let kind = IndicatorKind::from_str(indicator).ok_or_else(|| {
            DomainError::ValidationFailed(format!("unknown indicator '{indicator}'"))
        })?;
        let mut table = self.store.load_thresholds().await?;
        table.set(kind, level, value)?;
        self.store.save_thresholds(&table).await?;
        Ok(table)
    }

    pub async fn list_alerts(&self, include_resolved: bool) -> DomainResult<Vec<HealthAlert>> {
        Ok(self
            .store
            .load_alerts()
            .await?
            .into_iter()
            .filter(|a| include_resolved || !a.is_resolved())
            .collect())
    }

    /// Flag an alert acknowledged. Independent of resolution. Returns
    /// false for unknown IDs.
    pub async fn acknowledge_alert(&self, id: Uuid) -> DomainResult<bool> {
        let mut alerts = self.store.load_alerts().await?;
        let Some(alert) = alerts.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };
        alert.acknowledged = true;
        self.store.save_alerts(&alerts).await?;
        Ok(true)
    }
}

/// Trend of the current value against the previous snapshot's reading.
fn trend_against(previous: Option<&HealthSnapshot>, kind: IndicatorKind, value: f64) -> Trend {
    let Some(prev_value) = previous
        .and_then(|s| s.indicator(kind))
        .and_then(|i| i.value)
    else {
        return Trend::Unknown;
    };
    let delta = value - prev_value;
    if delta.abs() < 0.01 {
        Trend::Flat
    } else if delta > 0.0 {
        Trend::Rising
    } else {
        Trend::Falling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_comparisons() {
        let snapshot = HealthSnapshot {
            taken_at: Utc::now(),
            indicators: vec![IndicatorValue {
                kind: IndicatorKind::DomainDrift,
                value: Some(0.2),
                status: IndicatorStatus::Green,
                trend: Trend::Unknown,
                message: String::new(),
                computed_at: Utc::now(),
            }],
            overall_status: IndicatorStatus::Green,
        };
        assert_eq!(trend_against(Some(&snapshot), IndicatorKind::DomainDrift, 0.5), Trend::Rising);
        assert_eq!(trend_against(Some(&snapshot), IndicatorKind::DomainDrift, 0.1), Trend::Falling);
        assert_eq!(trend_against(Some(&snapshot), IndicatorKind::DomainDrift, 0.205), Trend::Flat);
        assert_eq!(trend_against(None, IndicatorKind::DomainDrift, 0.5), Trend::Unknown);
        // other indicators have no previous value
        assert_eq!(
            trend_against(Some(&snapshot), IndicatorKind::RetrievalMissRate, 0.5),
            Trend::Unknown
        );
    }
}
