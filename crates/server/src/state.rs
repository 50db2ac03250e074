use std::sync::Arc;
use pdfword_core::{
    ArtifactGateway, Config, ConversionOrchestrator, Housekeeper, InMemoryJobStore,
    IntakeLimits, JobStore, OrchestratorConfig, ProgressHub, SanitizedConfig, StagingArea,
    Transcoder,
};

/// Shared application state
pub struct AppState {
    config: Config,
    job_store: Arc<dyn JobStore>,
    staging: Arc<StagingArea>,
    progress: Arc<ProgressHub>,
    orchestrator: Arc<ConversionOrchestrator>,
    artifacts: ArtifactGateway,
    housekeeper: Arc<Housekeeper>,
}

impl AppState {
    /// Wire the core components around `transcoder`.
    pub fn new(config: Config, transcoder: Arc<dyn Transcoder>) -> Self {
        let job_store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new(
            config.storage.output_dir.clone(),
            config.limits.max_batch_size,
        ));
        let staging = Arc::new(StagingArea::new(
            config.storage.upload_dir.clone(),
            IntakeLimits::from(&config),
        ));
        let progress = Arc::new(ProgressHub::new(config.progress.channel_capacity));
        let orchestrator = Arc::new(ConversionOrchestrator::new(
            OrchestratorConfig::from(&config),
            Arc::clone(&job_store),
            transcoder,
            progress.clone(),
        ));
        let artifacts = ArtifactGateway::new(Arc::clone(&job_store));
        let housekeeper = Arc::new(Housekeeper::from_config(
            &config,
            Arc::clone(&job_store),
            staging.clone(),
            progress.clone(),
        ));

        Self {
            config,
            job_store,
            staging,
            progress,
            orchestrator,
            artifacts,
            housekeeper,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn job_store(&self) -> &dyn JobStore {
        self.job_store.as_ref()
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn progress(&self) -> &ProgressHub {
        &self.progress
    }

    pub fn orchestrator(&self) -> Arc<ConversionOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn artifacts(&self) -> &ArtifactGateway {
        &self.artifacts
    }

    pub fn housekeeper(&self) -> Arc<Housekeeper> {
        Arc::clone(&self.housekeeper)
    }
}
