use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("State directory cannot be empty")]
    EmptyStateDir,

    #[error("Invalid {0}: {1}. Must be between 0.0 and 1.0")]
    InvalidFraction(&'static str, f64),

    #[error("Invalid {0}: {1}. Must be positive")]
    InvalidDays(&'static str, i64),

    #[error("Invalid model_timeout_secs: {0}. Cannot be 0")]
    InvalidModelTimeout(u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .proctor/config.yaml (project config, created by init)
    /// 3. .proctor/local.yaml (project local overrides, optional)
    /// 4. Environment variables (PROCTOR_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.proctor/) so several
    /// supervised agent checkouts on one machine stay independent.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".proctor/config.yaml"))
            .merge(Yaml::file(".proctor/local.yaml"))
            .merge(Env::prefixed("PROCTOR_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.state_dir.is_empty() {
            return Err(ConfigError::EmptyStateDir);
        }

        let fractions = [
            (
                "clustering.high_confidence_threshold",
                config.clustering.high_confidence_threshold,
            ),
            (
                "clustering.similarity_threshold",
                config.clustering.similarity_threshold,
            ),
            (
                "root_cause.similar_pattern_threshold",
                config.root_cause.similar_pattern_threshold,
            ),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidFraction(name, value));
            }
        }

        if config.clustering.stale_age_days <= 0 {
            return Err(ConfigError::InvalidDays(
                "clustering.stale_age_days",
                config.clustering.stale_age_days,
            ));
        }
        if config.health.window_days <= 0 {
            return Err(ConfigError::InvalidDays(
                "health.window_days",
                config.health.window_days,
            ));
        }
        if config.health.baseline_days <= 0 {
            return Err(ConfigError::InvalidDays(
                "health.baseline_days",
                config.health.baseline_days,
            ));
        }

        if config.root_cause.model_timeout_secs == 0 {
            return Err(ConfigError::InvalidModelTimeout(
                config.root_cause.model_timeout_secs,
            ));
        }

        Ok(())
    }
}
