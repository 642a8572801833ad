//! Model seam for LLM-assisted root cause analysis.
//!
//! Any implementation may fail or time out; the analyzer wraps every
//! implementation with the heuristic fallback, so failure here degrades
//! rather than propagates.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::FailurePattern;

/// The structured answer a model is expected to produce.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelAnalysis {
    pub why_chain: Vec<String>,
    pub root_cause: String,
    pub capability_gap: String,
    pub counterfactual: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.7
}

/// An external model that can analyze a failure pattern.
#[async_trait]
pub trait RootCauseModel: Send + Sync {
    async fn analyze(&self, pattern: &FailurePattern) -> DomainResult<ModelAnalysis>;
}

/// Model backend for configurations without one. Always unavailable, which
/// routes every analysis through the heuristic path.
pub struct NullRootCauseModel;

#[async_trait]
impl RootCauseModel for NullRootCauseModel {
    async fn analyze(&self, _pattern: &FailurePattern) -> DomainResult<ModelAnalysis> {
        Err(DomainError::ModelUnavailable("no model configured".to_string()))
    }
}
