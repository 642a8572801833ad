//! Shared wiring from configuration to stores and services.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::jsonstore::{
    FileAnalysisCache, JsonClusterStore, JsonConflictStore, JsonHealthStore, JsonProposalStore,
    JsonScopeStore, JsonlDecisionLedger, JsonlExecutionLog, JsonlRetrievalLog, StateLayout,
};
use crate::adapters::model::CommandModel;
use crate::domain::models::Config;
use crate::domain::ports::{NullEmbeddingProvider, NullRootCauseModel, RootCauseModel};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{
    ClusteringManager, ConflictDetector, FailurePatternClusterer, HealthIndicatorsManager,
    RootCauseAnalyzer,
};

/// Everything a command needs: the merged config and the state layout.
pub struct CliContext {
    pub config: Config,
    pub layout: StateLayout,
}

impl CliContext {
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::load().context("Failed to load configuration")?;
        let layout = StateLayout::new(config.state_dir.clone());
        Ok(Self { config, layout })
    }

    pub fn proposals(&self) -> Arc<JsonProposalStore> {
        Arc::new(JsonProposalStore::new(self.layout.improvement_queue()))
    }

    pub fn conflict_detector(
        &self,
    ) -> ConflictDetector<JsonProposalStore, JsonScopeStore, JsonConflictStore> {
        ConflictDetector::new(
            self.proposals(),
            Arc::new(JsonScopeStore::new(self.layout.scope_registry())),
            Arc::new(JsonConflictStore::new(self.layout.conflicts())),
        )
    }

    pub fn clustering_manager(
        &self,
    ) -> ClusteringManager<JsonProposalStore, JsonClusterStore, JsonlDecisionLedger, NullEmbeddingProvider>
    {
        ClusteringManager::new(
            self.proposals(),
            Arc::new(JsonClusterStore::new(self.layout.clusters())),
            Arc::new(JsonlDecisionLedger::new(self.layout.cluster_decisions())),
            Arc::new(NullEmbeddingProvider),
            self.config.clustering.clone(),
        )
    }

    pub fn health_manager(
        &self,
    ) -> HealthIndicatorsManager<JsonProposalStore, JsonlExecutionLog, JsonlRetrievalLog, JsonHealthStore>
    {
        HealthIndicatorsManager::new(
            self.proposals(),
            Arc::new(JsonlExecutionLog::new(self.layout.execution_log())),
            Arc::new(JsonlRetrievalLog::new(self.layout.retrieval_outcomes())),
            Arc::new(JsonHealthStore::new(self.layout.health_dir())),
            self.config.health.clone(),
        )
    }

    pub fn failure_clusterer(&self) -> FailurePatternClusterer<JsonlExecutionLog> {
        FailurePatternClusterer::new(Arc::new(JsonlExecutionLog::new(self.layout.execution_log())))
    }

    pub fn root_cause_analyzer(
        &self,
    ) -> RootCauseAnalyzer<JsonlExecutionLog, FileAnalysisCache, dyn RootCauseModel> {
        let model: Arc<dyn RootCauseModel> = match &self.config.root_cause.model_command {
            Some(command) => Arc::new(CommandModel::new(
                command.clone(),
                self.config.root_cause.model_timeout_secs,
            )),
            None => Arc::new(NullRootCauseModel),
        };
        RootCauseAnalyzer::new(
            Arc::new(JsonlExecutionLog::new(self.layout.execution_log())),
            Arc::new(FileAnalysisCache::new(self.layout.analysis_cache())),
            model,
            self.config.root_cause.clone(),
        )
    }
}
