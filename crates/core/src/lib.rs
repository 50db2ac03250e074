pub mod artifacts;
pub mod config;
pub mod housekeeping;
pub mod intake;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod sanitize;
pub mod testing;
pub mod transcoder;

pub use artifacts::{Artifact, ArtifactError, ArtifactGateway};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, LimitsConfig, SanitizedConfig, StorageConfig,
};
pub use housekeeping::{Housekeeper, HousekeepingError, SweepReport};
pub use intake::{IntakeError, IntakeLimits, StagedFile, StagingArea, UploadedFile};
pub use job::{
    FileDescriptor, FileOutcome, FileTask, InMemoryJobStore, Job, JobError, JobStatus, JobStore,
};
pub use orchestrator::{ConversionOrchestrator, OrchestratorConfig, OrchestratorError};
pub use progress::{ConvertedFile, ProgressEvent, ProgressHub, ProgressPublisher, Subscription};
pub use transcoder::{SofficeTranscoder, Transcoder, TranscoderConfig, TranscoderError};
