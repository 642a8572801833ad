//! Configuration model.
//!
//! Defaults here are the lowest layer of the figment stack; project yaml and
//! `PROCTOR_*` environment variables override them.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding every persisted store and log.
    pub state_dir: String,
    pub clustering: ClusteringConfig,
    pub health: HealthConfig,
    pub root_cause: RootCauseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: ".proctor/state".to_string(),
            clustering: ClusteringConfig::default(),
            health: HealthConfig::default(),
            root_cause: RootCauseConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Clusters at or above this confidence skip human review.
    pub high_confidence_threshold: f64,
    /// Minimum proposals per cluster.
    pub min_cluster_size: usize,
    /// Minimum pairwise similarity for merging.
    pub similarity_threshold: f64,
    /// Low-confidence clusters older than this are reported stale.
    pub stale_age_days: i64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            high_confidence_threshold: 0.8,
            min_cluster_size: 2,
            similarity_threshold: 0.55,
            stale_age_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Trailing window for current-rate indicators, in days.
    pub window_days: i64,
    /// Baseline window reaches back this many days past the trailing window.
    pub baseline_days: i64,
    /// Domains the pipeline recognizes, beyond those declared on proposals.
    pub known_domains: Vec<String>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            baseline_days: 14,
            known_domains: vec![
                "api".to_string(),
                "web".to_string(),
                "cli".to_string(),
                "data".to_string(),
                "testing".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootCauseConfig {
    /// Command invoked for model-assisted analysis; None means pure
    /// heuristics. The prompt is written to the command's stdin.
    pub model_command: Option<String>,
    pub model_timeout_secs: u64,
    /// Word-overlap similarity above which a resolved pattern is attached.
    pub similar_pattern_threshold: f64,
    /// Patterns below this occurrence count are skipped by batch analysis.
    pub min_occurrences: usize,
}

impl Default for RootCauseConfig {
    fn default() -> Self {
        Self {
            model_command: None,
            model_timeout_secs: 60,
            similar_pattern_threshold: 0.7,
            min_occurrences: 3,
        }
    }
}
